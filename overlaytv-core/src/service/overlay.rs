//! Overlay management service
//!
//! Validates requests and maps store outcomes onto the error taxonomy.

use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{NewOverlay, Overlay, OverlayId, OverlayUpdate, Position, Size};
use crate::repository::OverlayRepository;
use crate::{Error, Result};

/// Overlay CRUD with input validation
#[derive(Clone)]
pub struct OverlayService {
    repository: Arc<dyn OverlayRepository>,
}

impl std::fmt::Debug for OverlayService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayService").finish_non_exhaustive()
    }
}

impl OverlayService {
    #[must_use]
    pub fn new(repository: Arc<dyn OverlayRepository>) -> Self {
        Self { repository }
    }

    pub async fn create(&self, new: NewOverlay) -> Result<Overlay> {
        validate_name(&new.name)?;
        validate_position(new.position)?;
        validate_size(new.size)?;

        let overlay = Overlay::from_new(new);
        self.repository.create(&overlay).await?;

        info!(overlay_id = %overlay.id, kind = %overlay.kind, "Overlay created");
        Ok(overlay)
    }

    /// Fetch by raw id; malformed ids are `InvalidInput`, absent ones `NotFound`
    pub async fn get(&self, id: &str) -> Result<Overlay> {
        let id = OverlayId::parse(id)?;
        self.repository
            .get(&id)
            .await?
            .ok_or_else(|| not_found(&id))
    }

    pub async fn list(&self) -> Result<Vec<Overlay>> {
        let overlays = self.repository.list().await?;
        debug!(count = overlays.len(), "Listed overlays");
        Ok(overlays)
    }

    pub async fn update(&self, id: &str, update: OverlayUpdate) -> Result<()> {
        let id = OverlayId::parse(id)?;

        if update.is_empty() {
            return Err(Error::InvalidInput("No fields to update".to_string()));
        }
        if let Some(name) = &update.name {
            validate_name(name)?;
        }
        if let Some(position) = update.position {
            validate_position(position)?;
        }
        if let Some(size) = update.size {
            validate_size(size)?;
        }

        if !self.repository.update(&id, update).await? {
            return Err(not_found(&id));
        }

        info!(overlay_id = %id, "Overlay updated");
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = OverlayId::parse(id)?;

        if !self.repository.delete(&id).await? {
            return Err(not_found(&id));
        }

        info!(overlay_id = %id, "Overlay deleted");
        Ok(())
    }
}

fn not_found(id: &OverlayId) -> Error {
    Error::NotFound(format!("Overlay {id} not found"))
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidInput("Overlay name is required".to_string()));
    }
    Ok(())
}

fn validate_position(position: Position) -> Result<()> {
    if !position.x.is_finite() || !position.y.is_finite() {
        return Err(Error::InvalidInput("Position must be finite numbers".to_string()));
    }
    Ok(())
}

fn validate_size(size: Size) -> Result<()> {
    if !size.width.is_finite() || !size.height.is_finite() {
        return Err(Error::InvalidInput("Size must be finite numbers".to_string()));
    }
    if size.width < 0.0 || size.height < 0.0 {
        return Err(Error::InvalidInput("Size must not be negative".to_string()));
    }
    Ok(())
}
