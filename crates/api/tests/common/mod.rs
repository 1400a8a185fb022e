use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use tempfile::TempDir;
use tower::ServiceExt;

use benthos_api::background::queue::JobQueue;
use benthos_api::config::{DetectorMode, ServerConfig};
use benthos_api::router::build_app_router;
use benthos_api::state::AppState;
use benthos_core::store::DetectionStore;
use benthos_detect::MockDetector;
use benthos_events::ProgressChannel;

/// Build a test `ServerConfig` with safe defaults.
///
/// Mock detector, numeric `Time` annotation column, uploads under the given
/// directory, and a 30-second request timeout.
pub fn test_config(upload_dir: PathBuf) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        upload_dir,
        max_upload_bytes: 16 * 1024 * 1024,
        detector: DetectorMode::Mock,
        score_threshold: 0.3,
        show_labels: true,
        tolerance_secs: 1.0,
        annotation_column: "Time".to_string(),
        annotation_format: benthos_core::annotation::TimecodeFormat::Seconds,
        demo_delay_ms: 0,
    }
}

/// Build an isolated `AppState` (mock detector, empty store and queue).
///
/// The returned `TempDir` owns the upload directory; keep it alive for the
/// duration of the test.
pub fn test_state() -> (AppState, TempDir) {
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(upload_dir.path().to_path_buf());
    let state = AppState {
        config: Arc::new(config),
        store: Arc::new(DetectionStore::new()),
        queue: Arc::new(JobQueue::new()),
        progress: Arc::new(ProgressChannel::new()),
        detector: Arc::new(MockDetector::fixed_default()),
    };
    (state, upload_dir)
}

/// Build the full application router for a state, using the same middleware
/// stack as `main.rs`.
pub fn build_test_app(state: AppState) -> Router {
    let config = (*state.config).clone();
    build_app_router(state, &config)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("response")
}

/// Issue a POST with a JSON body.
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
    )
    .await
    .expect("response")
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    use http_body_util::BodyExt;
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("json body")
}

/// Collect a response body as a string.
pub async fn body_string(response: Response<Body>) -> String {
    use http_body_util::BodyExt;
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf8 body")
}

/// Assert a JSON error envelope: `{ "error": ..., "code": ... }`.
pub async fn assert_error_body(response: Response<Body>, status: StatusCode, code: &str) {
    assert_eq!(response.status(), status);
    let json = body_json(response).await;
    assert_eq!(json["code"], code);
    assert!(json["error"].is_string());
}

/// Encode multipart form parts with a fixed boundary; returns
/// `(content_type, body)`.
pub fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "test-boundary-7d93b";
    let mut body = Vec::new();
    for (name, filename, bytes) in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match filename {
            Some(filename) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\n\r\n"
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            ),
        }
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Issue a POST with a multipart body.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    parts: &[(&str, Option<&str>, &[u8])],
) -> Response<Body> {
    let (content_type, body) = multipart_body(parts);
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", content_type)
            .body(Body::from(body))
            .expect("request"),
    )
    .await
    .expect("response")
}
