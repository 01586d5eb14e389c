//! Settings repository for the singleton stream settings document

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::models::{StreamSettings, STREAM_SETTINGS_TYPE};
use crate::Result;

/// Storage operations on the `settings` collection
#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Stored stream settings, `None` if never saved
    async fn get_stream_settings(&self) -> Result<Option<StreamSettings>>;

    /// Upsert the stream settings document
    async fn save_stream_settings(&self, settings: &StreamSettings) -> Result<()>;
}

/// PostgreSQL settings repository
#[derive(Clone)]
pub struct PgSettingsRepository {
    pool: PgPool,
}

impl PgSettingsRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettingsRepository for PgSettingsRepository {
    async fn get_stream_settings(&self) -> Result<Option<StreamSettings>> {
        let row = sqlx::query(
            r#"
            SELECT rtsp_url
            FROM settings
            WHERE "type" = $1
            "#,
        )
        .bind(STREAM_SETTINGS_TYPE)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(StreamSettings {
                rtsp_url: row.try_get("rtsp_url")?,
            })),
            None => Ok(None),
        }
    }

    async fn save_stream_settings(&self, settings: &StreamSettings) -> Result<()> {
        // "type" is the primary key, so the document can never be duplicated
        sqlx::query(
            r#"
            INSERT INTO settings ("type", rtsp_url, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT ("type") DO UPDATE
            SET rtsp_url = EXCLUDED.rtsp_url, updated_at = NOW()
            "#,
        )
        .bind(STREAM_SETTINGS_TYPE)
        .bind(&settings.rtsp_url)
        .execute(&self.pool)
        .await?;

        debug!("Saved stream settings");
        Ok(())
    }
}
