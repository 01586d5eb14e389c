// Overlay HTTP handlers

use axum::{
    extract::{Path, State},
    Json,
};
use overlaytv_core::models::{NewOverlay, Overlay, OverlayUpdate};
use serde::Serialize;

use super::{AppResult, AppState, JsonBody};

/// Create response
#[derive(Debug, Serialize)]
pub struct CreatedResponse {
    pub id: String,
    pub message: &'static str,
}

/// Acknowledgement with a message only
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

/// List all overlays
pub async fn list_overlays(State(state): State<AppState>) -> AppResult<Json<Vec<Overlay>>> {
    let overlays = state.overlay_service.list().await?;
    Ok(Json(overlays))
}

/// Create an overlay
pub async fn create_overlay(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NewOverlay>,
) -> AppResult<Json<CreatedResponse>> {
    let overlay = state.overlay_service.create(req).await?;

    Ok(Json(CreatedResponse {
        id: overlay.id.to_string(),
        message: "Overlay created successfully",
    }))
}

/// Get one overlay
pub async fn get_overlay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Overlay>> {
    let overlay = state.overlay_service.get(&id).await?;
    Ok(Json(overlay))
}

/// Partially update an overlay
pub async fn update_overlay(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(req): JsonBody<OverlayUpdate>,
) -> AppResult<Json<MessageResponse>> {
    state.overlay_service.update(&id, req).await?;
    Ok(Json(MessageResponse {
        message: "Overlay updated successfully",
    }))
}

/// Delete an overlay
pub async fn delete_overlay(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.overlay_service.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: "Overlay deleted successfully",
    }))
}
