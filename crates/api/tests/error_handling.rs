//! Tests for `AppError` → HTTP response mapping.
//!
//! These tests verify that each `AppError` variant produces the correct HTTP
//! status code, error code, and message. They do NOT need an HTTP server --
//! they call `IntoResponse` directly on `AppError` values.

use axum::response::IntoResponse;
use benthos_api::error::AppError;
use benthos_core::CoreError;
use http_body_util::BodyExt;

/// Helper: convert an `AppError` into its status code and parsed JSON body.
async fn error_to_response(err: AppError) -> (axum::http::StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

// ---------------------------------------------------------------------------
// Test: CoreError::NotFound maps to 404 with NOT_FOUND code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn not_found_error_returns_404() {
    let err = AppError::Core(CoreError::NotFound {
        entity: "Detection",
        id: 42,
    });

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
    assert_eq!(json["error"], "Detection with id 42 not found");
}

// ---------------------------------------------------------------------------
// Test: CoreError::MalformedInput maps to 400 with its message intact
// ---------------------------------------------------------------------------

#[tokio::test]
async fn malformed_input_returns_400_with_message() {
    let err = AppError::Core(CoreError::MalformedInput(
        "annotation CSV has no 'Start Date' column".into(),
    ));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "MALFORMED_INPUT");
    assert_eq!(json["error"], "annotation CSV has no 'Start Date' column");
}

// ---------------------------------------------------------------------------
// Test: pipeline failures map to 500 and keep the engine message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn pipeline_failure_returns_500_with_message() {
    let err = AppError::Core(CoreError::DetectionFailure("engine exited with 9".into()));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "PIPELINE_FAILURE");
    assert_eq!(json["error"], "engine exited with 9");
}

// ---------------------------------------------------------------------------
// Test: I/O errors map to 500 and sanitize the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn io_error_returns_500_and_sanitizes_message() {
    let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "/etc/shadow");
    let err = AppError::Core(CoreError::Io(io));

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: AppError::Internal maps to 500 and sanitizes the message
// ---------------------------------------------------------------------------

#[tokio::test]
async fn internal_error_returns_500_and_sanitizes_message() {
    let err = AppError::Internal("upload dir unwritable: /srv/benthos".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["code"], "INTERNAL_ERROR");
    assert_eq!(json["error"], "An internal error occurred");
}

// ---------------------------------------------------------------------------
// Test: AppError::BadRequest maps to 400 with BAD_REQUEST code
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bad_request_error_returns_400() {
    let err = AppError::BadRequest("No selected file".into());

    let (status, json) = error_to_response(err).await;

    assert_eq!(status, axum::http::StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert_eq!(json["error"], "No selected file");
}
