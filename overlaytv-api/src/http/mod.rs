// Module: http
// HTTP/JSON REST API

pub mod error;
pub mod health;
pub mod hls;
pub mod overlay;
pub mod stream;

use axum::{
    routing::{get, post},
    Router,
};
use overlaytv_core::bootstrap::Services;
use overlaytv_core::service::{HlsFiles, OverlayService, SettingsService, StreamSessionManager};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult, JsonBody};

/// Shared application state
#[derive(Clone, Debug)]
pub struct AppState {
    pub overlay_service: OverlayService,
    pub settings_service: SettingsService,
    pub stream_manager: Arc<StreamSessionManager>,
    pub hls_files: HlsFiles,
}

impl From<Services> for AppState {
    fn from(services: Services) -> Self {
        Self {
            overlay_service: services.overlay_service,
            settings_service: services.settings_service,
            stream_manager: services.stream_manager,
            hls_files: services.hls_files,
        }
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        // Overlays
        .route(
            "/api/overlays",
            get(overlay::list_overlays).post(overlay::create_overlay),
        )
        .route(
            "/api/overlays/{id}",
            get(overlay::get_overlay)
                .put(overlay::update_overlay)
                .delete(overlay::delete_overlay),
        )
        // Stream session
        .route("/api/stream/start", post(stream::start_stream))
        .route("/api/stream/stop", post(stream::stop_stream))
        .route("/api/stream/status", get(stream::stream_status))
        .route(
            "/api/stream/settings",
            get(stream::get_stream_settings).post(stream::save_stream_settings),
        )
        // Transcoder output
        .route("/static/hls/{filename}", get(hls::serve_hls_file))
        .route("/api/health", get(health::health_check));

    // Apply layers before state
    let router = router
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    router.with_state(state)
}
