// Stream session HTTP handlers

use axum::{extract::State, Json};
use overlaytv_core::models::StreamSettings;
use serde::{Deserialize, Serialize};

use super::{AppResult, AppState, JsonBody};

/// Start request
#[derive(Debug, Deserialize)]
pub struct StartStreamRequest {
    #[serde(default)]
    pub rtsp_url: String,
}

#[derive(Debug, Serialize)]
pub struct StartStreamResponse {
    pub message: &'static str,
    pub hls_url: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct StreamStatusResponse {
    pub is_running: bool,
    pub current_url: String,
    pub hls_url: Option<String>,
}

/// Start transcoding the given RTSP URL, replacing any running stream
pub async fn start_stream(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<StartStreamRequest>,
) -> AppResult<Json<StartStreamResponse>> {
    let hls_url = state.stream_manager.start(&req.rtsp_url).await?;

    Ok(Json(StartStreamResponse {
        message: "Stream started successfully",
        hls_url,
    }))
}

/// Stop the running stream; succeeds when nothing is running
pub async fn stop_stream(State(state): State<AppState>) -> AppResult<Json<MessageResponse>> {
    state.stream_manager.stop().await?;

    Ok(Json(MessageResponse {
        message: "Stream stopped successfully",
    }))
}

pub async fn stream_status(State(state): State<AppState>) -> Json<StreamStatusResponse> {
    let status = state.stream_manager.status();

    Json(StreamStatusResponse {
        is_running: status.is_running(),
        current_url: status.current_url,
        hls_url: status.hls_url,
    })
}

pub async fn get_stream_settings(
    State(state): State<AppState>,
) -> AppResult<Json<StreamSettings>> {
    let settings = state.settings_service.get_stream_settings().await?;
    Ok(Json(settings))
}

pub async fn save_stream_settings(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<StreamSettings>,
) -> AppResult<Json<MessageResponse>> {
    state.settings_service.save_stream_settings(req).await?;

    Ok(Json(MessageResponse {
        message: "Stream settings saved successfully",
    }))
}
