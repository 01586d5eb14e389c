//! In-memory stores
//!
//! Used when no database URL is configured, and by tests.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{OverlayRepository, SettingsRepository};
use crate::models::{Overlay, OverlayId, OverlayUpdate, StreamSettings, STREAM_SETTINGS_TYPE};
use crate::{Error, Result};

/// In-memory overlay repository
#[derive(Debug, Default)]
pub struct MemoryOverlayRepository {
    overlays: RwLock<HashMap<OverlayId, Overlay>>,
}

impl MemoryOverlayRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OverlayRepository for MemoryOverlayRepository {
    async fn create(&self, overlay: &Overlay) -> Result<()> {
        let mut overlays = self.overlays.write();
        if overlays.contains_key(&overlay.id) {
            return Err(Error::Internal(format!("Duplicate overlay id {}", overlay.id)));
        }
        overlays.insert(overlay.id.clone(), overlay.clone());
        Ok(())
    }

    async fn get(&self, id: &OverlayId) -> Result<Option<Overlay>> {
        Ok(self.overlays.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Overlay>> {
        let mut overlays: Vec<_> = self.overlays.read().values().cloned().collect();
        overlays.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        Ok(overlays)
    }

    async fn update(&self, id: &OverlayId, update: OverlayUpdate) -> Result<bool> {
        match self.overlays.write().get_mut(id) {
            Some(overlay) => {
                overlay.apply(update);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &OverlayId) -> Result<bool> {
        Ok(self.overlays.write().remove(id).is_some())
    }
}

/// In-memory settings repository, keyed by document type
#[derive(Debug, Default)]
pub struct MemorySettingsRepository {
    documents: RwLock<HashMap<&'static str, StreamSettings>>,
}

impl MemorySettingsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored settings documents
    #[must_use]
    pub fn document_count(&self) -> usize {
        self.documents.read().len()
    }
}

#[async_trait]
impl SettingsRepository for MemorySettingsRepository {
    async fn get_stream_settings(&self) -> Result<Option<StreamSettings>> {
        Ok(self.documents.read().get(STREAM_SETTINGS_TYPE).cloned())
    }

    async fn save_stream_settings(&self, settings: &StreamSettings) -> Result<()> {
        self.documents
            .write()
            .insert(STREAM_SETTINGS_TYPE, settings.clone());
        Ok(())
    }
}
