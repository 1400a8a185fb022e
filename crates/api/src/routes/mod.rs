pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the application route tree.
///
/// Route hierarchy:
///
/// ```text
/// /upload                  process a video + optional annotations (POST)
/// /demo                    load the canned demo batch (GET)
///
/// /queue_file              store an upload for deferred processing (POST)
/// /process_queue           start the queue drain worker (POST)
/// /get_results             results produced by the worker so far (GET)
///
/// /progress                SSE progress frames for the active job (GET)
///
/// /reject_annotation       soft-delete one detection by id (POST)
/// /edit_description        relabel one detection by id (POST)
/// /get_updated_detections  re-derive all views after mutations (GET)
///
/// /download/{kind}         CSV export: detections|annotated|unannotated (GET)
/// /uploads/{*path}         serve a stored video back to the UI (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handlers::upload::upload))
        .route("/demo", get(handlers::demo::demo))
        .route("/queue_file", post(handlers::queue::queue_file))
        .route("/process_queue", post(handlers::queue::process_queue))
        .route("/get_results", get(handlers::queue::get_results))
        .route("/progress", get(handlers::progress::progress_stream))
        .route(
            "/reject_annotation",
            post(handlers::detections::reject_annotation),
        )
        .route(
            "/edit_description",
            post(handlers::detections::edit_description),
        )
        .route(
            "/get_updated_detections",
            get(handlers::detections::get_updated_detections),
        )
        .route("/download/{kind}", get(handlers::downloads::download))
        .route("/uploads/{*path}", get(handlers::artifacts::serve_upload))
}
