//! Service initialization and dependency injection

use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};

use crate::{
    repository::{
        MemoryOverlayRepository, MemorySettingsRepository, OverlayRepository,
        PgOverlayRepository, PgSettingsRepository, SettingsRepository,
    },
    service::{
        HlsFiles, OverlayService, ProcessLauncher, SettingsService, StreamSessionManager,
        SystemLauncher,
    },
    Config,
};

/// Container for all initialized services
#[derive(Clone, Debug)]
pub struct Services {
    /// Overlay CRUD
    pub overlay_service: OverlayService,
    /// Persisted stream settings
    pub settings_service: SettingsService,
    /// The single transcoding session of this instance
    pub stream_manager: Arc<StreamSessionManager>,
    /// Read access to the transcoder output
    pub hls_files: HlsFiles,
}

/// Initialize all core services
///
/// `pool` selects the PostgreSQL stores; `None` uses the in-memory ones.
#[must_use]
pub fn init_services(pool: Option<PgPool>, config: &Config) -> Services {
    init_services_with_launcher(pool, config, Arc::new(SystemLauncher::new()))
}

/// Same as [`init_services`] with a custom transcoder launcher
#[must_use]
pub fn init_services_with_launcher(
    pool: Option<PgPool>,
    config: &Config,
    launcher: Arc<dyn ProcessLauncher>,
) -> Services {
    info!("Initializing services...");

    let (overlays, settings): (Arc<dyn OverlayRepository>, Arc<dyn SettingsRepository>) =
        match pool {
            Some(pool) => (
                Arc::new(PgOverlayRepository::new(pool.clone())),
                Arc::new(PgSettingsRepository::new(pool)),
            ),
            None => {
                warn!("No database configured, overlays and settings are kept in memory only");
                (
                    Arc::new(MemoryOverlayRepository::new()),
                    Arc::new(MemorySettingsRepository::new()),
                )
            }
        };

    let stream_manager = Arc::new(StreamSessionManager::new(config.stream.clone(), launcher));
    info!(
        output_dir = %config.stream.output_dir.display(),
        program = %config.stream.transcoder.program,
        "Stream session manager initialized"
    );

    let services = Services {
        overlay_service: OverlayService::new(overlays),
        settings_service: SettingsService::new(settings),
        stream_manager,
        hls_files: HlsFiles::from_config(&config.stream),
    };

    info!("All services initialized");
    services
}
