//! Handlers for the deferred-processing queue.
//!
//! `POST /queue_file` stores an upload and enqueues it, `POST /process_queue`
//! starts the drain worker, `GET /get_results` lists what the worker has
//! produced so far.

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::background::queue::{start_worker, ProcessingOptions, QueueItem, QueueResult};
use crate::error::AppResult;
use crate::handlers::upload::{read_upload_form, store_annotations, store_video};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct QueueAck {
    pub queued: String,
    /// 1-based position in the backlog at enqueue time.
    pub position: usize,
}

#[derive(Debug, Serialize)]
pub struct ProcessAck {
    pub started: bool,
    pub backlog: usize,
}

#[derive(Debug, Serialize)]
pub struct ResultsResponse {
    pub results: Vec<QueueResult>,
    pub pending: usize,
    pub running: bool,
}

/// POST /queue_file -- store an upload and defer its processing.
///
/// Same form shape as `/upload`; responds 202 with the queue position
/// instead of running the pipeline.
pub async fn queue_file(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<QueueAck>)> {
    let form = read_upload_form(multipart).await?;
    let show_labels = form.show_labels.unwrap_or(state.config.show_labels);

    let (video_path, original_name) = store_video(&state.config.upload_dir, form.video).await?;
    // If the annotation part turns out invalid, the already-stored video
    // must not linger; once both are stored the worker owns them.
    let mut video_cleanup = crate::pipeline::RemoveOnDrop::new(video_path.clone());
    let annotation_path = store_annotations(&state.config.upload_dir, form.annotations).await?;
    video_cleanup.disarm();

    let position = state.queue.enqueue(QueueItem {
        video_path,
        options: ProcessingOptions {
            annotation_path,
            show_labels,
        },
    });
    tracing::info!(video = %original_name, position, "File queued");

    Ok((
        StatusCode::ACCEPTED,
        Json(QueueAck {
            queued: original_name,
            position,
        }),
    ))
}

/// POST /process_queue -- start draining the backlog in the background.
///
/// Idempotent: when a worker is already active the call reports
/// `started: false` and changes nothing.
pub async fn process_queue(State(state): State<AppState>) -> Json<ProcessAck> {
    let backlog = state.queue.len();
    let started = start_worker(state);
    Json(ProcessAck { started, backlog })
}

/// GET /get_results -- everything the worker has finished so far.
pub async fn get_results(State(state): State<AppState>) -> Json<ResultsResponse> {
    Json(ResultsResponse {
        results: state.queue.results(),
        pending: state.queue.len(),
        running: state.queue.is_running(),
    })
}
