//! Overlay repository for database operations

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::models::{Overlay, OverlayId, OverlayKind, OverlayUpdate, Position, Size};
use crate::Result;

/// Storage operations on the `overlays` collection
#[async_trait]
pub trait OverlayRepository: Send + Sync {
    /// Insert a new overlay
    async fn create(&self, overlay: &Overlay) -> Result<()>;

    /// Fetch one overlay, `None` if absent
    async fn get(&self, id: &OverlayId) -> Result<Option<Overlay>>;

    /// All overlays, oldest first
    async fn list(&self) -> Result<Vec<Overlay>>;

    /// Merge `update` into the stored overlay and stamp `updated_at`.
    /// Returns `false` when no overlay matched.
    async fn update(&self, id: &OverlayId, update: OverlayUpdate) -> Result<bool>;

    /// Returns `false` when no overlay matched
    async fn delete(&self, id: &OverlayId) -> Result<bool>;
}

/// PostgreSQL overlay repository
#[derive(Clone)]
pub struct PgOverlayRepository {
    pool: PgPool,
}

impl PgOverlayRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_overlay(row: &PgRow) -> Result<Overlay> {
        let kind: String = row.try_get("kind")?;
        let position: Json<Position> = row.try_get("position")?;
        let size: Json<Size> = row.try_get("size")?;

        Ok(Overlay {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            kind: kind.parse::<OverlayKind>()?,
            content: row.try_get("content")?,
            position: position.0,
            size: size.0,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl OverlayRepository for PgOverlayRepository {
    async fn create(&self, overlay: &Overlay) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO overlays (id, name, kind, content, position, size, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(&overlay.id)
        .bind(&overlay.name)
        .bind(overlay.kind.as_str())
        .bind(&overlay.content)
        .bind(Json(overlay.position))
        .bind(Json(overlay.size))
        .bind(overlay.created_at)
        .execute(&self.pool)
        .await?;

        debug!(overlay_id = %overlay.id, "Inserted overlay");
        Ok(())
    }

    async fn get(&self, id: &OverlayId) -> Result<Option<Overlay>> {
        let row = sqlx::query(
            r"
            SELECT id, name, kind, content, position, size, created_at, updated_at
            FROM overlays
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_overlay).transpose()
    }

    async fn list(&self) -> Result<Vec<Overlay>> {
        let rows = sqlx::query(
            r"
            SELECT id, name, kind, content, position, size, created_at, updated_at
            FROM overlays
            ORDER BY created_at, id
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let overlays: Result<Vec<_>> = rows.iter().map(Self::row_to_overlay).collect();
        debug!("Retrieved {} overlays", overlays.as_ref().map(Vec::len).unwrap_or(0));
        overlays
    }

    async fn update(&self, id: &OverlayId, update: OverlayUpdate) -> Result<bool> {
        let result = sqlx::query(
            r"
            UPDATE overlays
            SET name = COALESCE($2, name),
                kind = COALESCE($3, kind),
                content = COALESCE($4, content),
                position = COALESCE($5, position),
                size = COALESCE($6, size),
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(update.name)
        .bind(update.kind.map(|k| k.as_str()))
        .bind(update.content)
        .bind(update.position.map(Json))
        .bind(update.size.map(Json))
        .execute(&self.pool)
        .await?;

        debug!(overlay_id = %id, matched = result.rows_affected(), "Updated overlay");
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &OverlayId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM overlays WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(overlay_id = %id, deleted = result.rows_affected(), "Deleted overlay");
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewOverlay;

    async fn test_pool() -> PgPool {
        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let pool = PgPool::connect(&database_url).await.unwrap();
        sqlx::migrate!("../migrations").run(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    #[ignore = "Requires database"]
    async fn test_jsonb_round_trip_and_partial_update() {
        let repo = PgOverlayRepository::new(test_pool().await);
        let overlay = Overlay::from_new(NewOverlay {
            name: "Score".to_string(),
            kind: OverlayKind::Image,
            content: "https://cdn/score.png".to_string(),
            position: Position { x: 12.5, y: 40.0 },
            size: Size { width: 320.0, height: 90.0 },
        });
        repo.create(&overlay).await.unwrap();

        let fetched = repo.get(&overlay.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, overlay.id);
        assert_eq!(fetched.kind, OverlayKind::Image);
        assert_eq!(fetched.position, overlay.position);
        assert_eq!(fetched.size, overlay.size);
        assert_eq!(
            fetched.created_at.timestamp_micros(),
            overlay.created_at.timestamp_micros()
        );
        assert!(fetched.updated_at.is_none());

        let update = OverlayUpdate {
            position: Some(Position { x: 0.0, y: 0.0 }),
            ..OverlayUpdate::default()
        };
        assert!(repo.update(&overlay.id, update).await.unwrap());

        let updated = repo.get(&overlay.id).await.unwrap().unwrap();
        assert_eq!(updated.position, Position { x: 0.0, y: 0.0 });
        assert_eq!(updated.name, "Score");
        assert_eq!(updated.size, overlay.size);
        assert!(updated.updated_at.is_some());

        assert!(repo.delete(&overlay.id).await.unwrap());
        assert!(!repo.update(&overlay.id, OverlayUpdate::default()).await.unwrap());
    }
}
