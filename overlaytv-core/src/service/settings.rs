//! Stream settings service

use std::sync::Arc;
use tracing::info;

use crate::models::StreamSettings;
use crate::repository::SettingsRepository;
use crate::Result;

/// Reads and saves the persisted stream settings
#[derive(Clone)]
pub struct SettingsService {
    repository: Arc<dyn SettingsRepository>,
}

impl std::fmt::Debug for SettingsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsService").finish_non_exhaustive()
    }
}

impl SettingsService {
    #[must_use]
    pub fn new(repository: Arc<dyn SettingsRepository>) -> Self {
        Self { repository }
    }

    /// Stored settings, or empty defaults when nothing was saved yet
    pub async fn get_stream_settings(&self) -> Result<StreamSettings> {
        Ok(self
            .repository
            .get_stream_settings()
            .await?
            .unwrap_or_default())
    }

    pub async fn save_stream_settings(&self, settings: StreamSettings) -> Result<StreamSettings> {
        let settings = StreamSettings {
            rtsp_url: settings.rtsp_url.trim().to_string(),
        };
        self.repository.save_stream_settings(&settings).await?;
        info!(rtsp_url = %settings.rtsp_url, "Stream settings saved");
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemorySettingsRepository;

    #[tokio::test]
    async fn test_defaults_until_saved() {
        let repo = Arc::new(MemorySettingsRepository::new());
        let service = SettingsService::new(repo.clone());

        assert_eq!(service.get_stream_settings().await.unwrap().rtsp_url, "");

        service
            .save_stream_settings(StreamSettings {
                rtsp_url: " rtsp://cam/live ".to_string(),
            })
            .await
            .unwrap();
        service
            .save_stream_settings(StreamSettings {
                rtsp_url: "rtsp://cam/other".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(
            service.get_stream_settings().await.unwrap().rtsp_url,
            "rtsp://cam/other"
        );
        assert_eq!(repo.document_count(), 1);
    }
}
