use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::config::DetectorMode;
use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Configured detection backend.
    pub detector: &'static str,
    /// Whether the queue drain worker is currently active.
    pub queue_running: bool,
}

/// GET /health -- returns service status and the active backend.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let detector = match state.config.detector {
        DetectorMode::Mock => "mock",
        DetectorMode::Owl => "owl",
    };

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        detector,
        queue_running: state.queue.is_running(),
    })
}

/// Mount health check routes at the root level.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
