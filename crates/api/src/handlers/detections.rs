//! Handlers for mutating and re-querying the live detection batch.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use benthos_core::detection::{BatchCounts, Detection};
use benthos_core::CoreError;
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub id: i64,
    pub new_description: String,
}

/// `{ success, message }` ack for the mutation endpoints, kept in the same
/// shape on success and failure.
#[derive(Debug, Serialize)]
pub struct MutationAck {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct DetectionViews {
    pub detections: Vec<Detection>,
    pub annotated: Vec<Detection>,
    pub unannotated: Vec<Detection>,
    pub counts: BatchCounts,
}

/// Map a store mutation result onto the ack shape.
///
/// Unknown ids come back as 404 with `success: false` — the stricter
/// contract; the store is untouched in that case.
fn ack(result: Result<(), CoreError>, done: &str) -> (StatusCode, Json<MutationAck>) {
    match result {
        Ok(()) => (
            StatusCode::OK,
            Json(MutationAck {
                success: true,
                message: done.to_string(),
            }),
        ),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(MutationAck {
                success: false,
                message: e.to_string(),
            }),
        ),
    }
}

/// POST /reject_annotation -- soft-delete one detection by id.
pub async fn reject_annotation(
    State(state): State<AppState>,
    Json(request): Json<RejectRequest>,
) -> (StatusCode, Json<MutationAck>) {
    let result = state.store.reject(request.id).await;
    if result.is_ok() {
        tracing::info!(id = request.id, "Detection rejected");
    }
    ack(result, "Detection rejected")
}

/// POST /edit_description -- relabel one detection by id.
pub async fn edit_description(
    State(state): State<AppState>,
    Json(request): Json<EditRequest>,
) -> (StatusCode, Json<MutationAck>) {
    let result = state.store.edit(request.id, &request.new_description).await;
    if result.is_ok() {
        tracing::info!(id = request.id, "Detection description edited");
    }
    ack(result, "Description updated")
}

/// GET /get_updated_detections -- re-derive all views from current state.
pub async fn get_updated_detections(
    State(state): State<AppState>,
) -> AppResult<Json<DetectionViews>> {
    Ok(Json(DetectionViews {
        detections: state.store.active_view().await,
        annotated: state.store.annotated_view().await,
        unannotated: state.store.unannotated_view().await,
        counts: state.store.counts().await,
    }))
}
