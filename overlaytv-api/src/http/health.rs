//! Health check endpoint
//!
//! Provides simple health check for monitoring probes.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub message: &'static str,
}

/// Basic health check (always returns healthy if server is running)
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        message: "Server is running",
    })
}
