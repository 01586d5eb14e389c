// HLS playlist and segment serving

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use super::{AppResult, AppState};

/// Serve one file from the transcoder output directory
pub async fn serve_hls_file(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<Response> {
    let file = state.hls_files.read(&filename).await?;

    let mut response = ([(header::CONTENT_TYPE, file.content_type)], file.bytes).into_response();
    if let Some(cache_control) = file.cache_control {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static(cache_control),
        );
    }

    Ok(response)
}
