// OverlayTV API Library
//
// Provides the HTTP/JSON API for overlays and the live stream session

pub mod http;

// Re-export commonly used types
pub use http::{create_router, AppState};
