//! End-to-end tests of the HTTP API against in-memory stores and a fake transcoder

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use overlaytv_api::{create_router, AppState};
use overlaytv_core::bootstrap::init_services_with_launcher;
use overlaytv_core::test_helpers::FakeLauncher;
use overlaytv_core::Config;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    launcher: FakeLauncher,
    output_dir: TempDir,
}

impl TestApp {
    fn new() -> Self {
        Self::with_launcher(FakeLauncher::new())
    }

    fn with_launcher(launcher: FakeLauncher) -> Self {
        let output_dir = tempfile::tempdir().unwrap();

        let mut config = Config::default();
        config.database.url = String::new();
        config.stream.output_dir = output_dir.path().to_path_buf();
        config.stream.readiness_attempts = 3;
        config.stream.readiness_interval_ms = 10;
        config.stream.stop_timeout_ms = 50;

        let services = init_services_with_launcher(None, &config, Arc::new(launcher.clone()));
        Self {
            router: create_router(AppState::from(services)),
            launcher,
            output_dir,
        }
    }

    async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, _, bytes) = self.raw_request(method, uri, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn raw_request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, headers, bytes)
    }
}

fn sample_overlay() -> Value {
    json!({
        "name": "A",
        "type": "text",
        "content": "hi",
        "position": {"x": 0, "y": 0},
        "size": {"width": 10, "height": 5}
    })
}

#[tokio::test]
async fn health_reports_running() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::GET, "/api/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "healthy", "message": "Server is running"}));
}

#[tokio::test]
async fn overlay_round_trip() {
    let app = TestApp::new();

    let (status, created) = app
        .request(Method::POST, "/api/overlays", Some(sample_overlay()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(created["message"], "Overlay created successfully");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, fetched) = app.request(Method::GET, &format!("/api/overlays/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id.as_str());
    assert_eq!(fetched["name"], "A");
    assert_eq!(fetched["type"], "text");
    assert_eq!(fetched["content"], "hi");
    assert_eq!(fetched["position"], json!({"x": 0.0, "y": 0.0}));
    assert_eq!(fetched["size"], json!({"width": 10.0, "height": 5.0}));
    assert!(fetched["created_at"].is_string());
    assert!(fetched.get("updated_at").is_none());

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/overlays/{id}"),
            Some(json!({"content": "bye"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["message"], "Overlay updated successfully");

    let (_, fetched) = app.request(Method::GET, &format!("/api/overlays/{id}"), None).await;
    assert_eq!(fetched["content"], "bye");
    assert_eq!(fetched["name"], "A");
    assert!(fetched["updated_at"].is_string());

    let (status, list) = app.request(Method::GET, "/api/overlays", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, deleted) = app
        .request(Method::DELETE, &format!("/api/overlays/{id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["message"], "Overlay deleted successfully");

    let (status, body) = app.request(Method::GET, &format!("/api/overlays/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_overlay_id_is_bad_request() {
    let app = TestApp::new();

    for method in [Method::GET, Method::DELETE] {
        let (status, body) = app.request(method, "/api/overlays/not-an-id", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid overlay ID");
    }

    let (status, body) = app
        .request(
            Method::PUT,
            "/api/overlays/not-an-id",
            Some(json!({"content": "bye"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid overlay ID");
}

#[tokio::test]
async fn invalid_overlay_bodies_are_bad_request() {
    let app = TestApp::new();

    let mut unknown_type = sample_overlay();
    unknown_type["type"] = json!("video");
    let mut missing_name = sample_overlay();
    missing_name.as_object_mut().unwrap().remove("name");
    let mut negative_size = sample_overlay();
    negative_size["size"]["width"] = json!(-1);

    for body in [unknown_type, missing_name, negative_size] {
        let (status, response) = app.request(Method::POST, "/api/overlays", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(response["error"].is_string());
    }

    let (status, _) = app.request(Method::GET, "/api/overlays", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn stream_start_status_stop() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/stream/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({"is_running": false, "current_url": "", "hls_url": null})
    );

    let (status, body) = app
        .request(
            Method::POST,
            "/api/stream/start",
            Some(json!({"rtsp_url": "rtsp://camera/live"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stream started successfully");
    assert_eq!(body["hls_url"], "/static/hls/stream.m3u8");

    let (_, body) = app.request(Method::GET, "/api/stream/status", None).await;
    assert_eq!(
        body,
        json!({
            "is_running": true,
            "current_url": "rtsp://camera/live",
            "hls_url": "/static/hls/stream.m3u8"
        })
    );

    // The playlist written by the transcoder is served back
    let (status, headers, bytes) = app
        .raw_request(Method::GET, "/static/hls/stream.m3u8", None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "application/vnd.apple.mpegurl");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert!(bytes.starts_with(b"#EXTM3U"));

    let (status, body) = app.request(Method::POST, "/api/stream/stop", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stream stopped successfully");

    let (_, body) = app.request(Method::GET, "/api/stream/status", None).await;
    assert_eq!(body["is_running"], false);
    assert_eq!(body["hls_url"], Value::Null);
    assert_eq!(app.launcher.alive(), 0);
}

#[tokio::test]
async fn restarting_stream_keeps_one_process() {
    let app = TestApp::new();

    for url in ["rtsp://camera/one", "rtsp://camera/two"] {
        let (status, _) = app
            .request(Method::POST, "/api/stream/start", Some(json!({"rtsp_url": url})))
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    assert_eq!(app.launcher.spawned(), 2);
    assert_eq!(app.launcher.alive(), 1);
}

#[tokio::test]
async fn stop_without_stream_succeeds() {
    let app = TestApp::new();
    let (status, body) = app.request(Method::POST, "/api/stream/stop", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stream stopped successfully");
    assert_eq!(app.launcher.spawned(), 0);
}

#[tokio::test]
async fn stream_start_failures_are_reported() {
    let app = TestApp::with_launcher(FakeLauncher::new().without_playlist());

    let (status, body) = app
        .request(
            Method::POST,
            "/api/stream/start",
            Some(json!({"rtsp_url": "rtsp://camera/live"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "HLS file not created");

    let (_, body) = app.request(Method::GET, "/api/stream/status", None).await;
    assert_eq!(body["is_running"], false);
    assert_eq!(app.launcher.alive(), 0);

    let (status, _) = app
        .request(Method::POST, "/api/stream/start", Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stream_settings_round_trip() {
    let app = TestApp::new();

    let (status, body) = app.request(Method::GET, "/api/stream/settings", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"rtsp_url": ""}));

    let (status, body) = app
        .request(
            Method::POST,
            "/api/stream/settings",
            Some(json!({"rtsp_url": "rtsp://camera/live"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Stream settings saved successfully");

    let (_, body) = app.request(Method::GET, "/api/stream/settings", None).await;
    assert_eq!(body, json!({"rtsp_url": "rtsp://camera/live"}));
}

#[tokio::test]
async fn hls_files_outside_output_dir_are_never_served() {
    let app = TestApp::new();
    std::fs::write(app.output_dir.path().join("stream.m3u8"), b"#EXTM3U\n").unwrap();

    for uri in [
        "/static/hls/../../etc/passwd",
        "/static/hls/..%2F..%2Fetc%2Fpasswd",
        "/static/hls/..%2Fstream.m3u8",
        "/static/hls/%2Fetc%2Fpasswd",
        "/static/hls/..",
    ] {
        let (status, _, bytes) = app.raw_request(Method::GET, uri, None).await;
        assert!(
            status == StatusCode::BAD_REQUEST || status == StatusCode::NOT_FOUND,
            "{uri} returned {status}"
        );
        assert!(!bytes.windows(5).any(|w| w == b"root:"), "{uri} leaked a file");
    }

    // Plain names inside the directory still work
    let (status, _, _) = app.raw_request(Method::GET, "/static/hls/stream.m3u8", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn missing_hls_file_is_not_found() {
    let app = TestApp::new();
    let (status, _, bytes) = app
        .raw_request(Method::GET, "/static/hls/stream42.ts", None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn malformed_json_uses_error_shape() {
    let app = TestApp::new();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/overlays")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["error"].is_string());
}
