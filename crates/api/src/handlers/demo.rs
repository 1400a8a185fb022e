//! Handler for `GET /demo`: load a canned detection run.
//!
//! Serves the UI-demo fixture without touching ffmpeg or the detection
//! engine. The fixture replaces the live batch exactly like a real upload,
//! so edit/reject/download flows work against it.

use axum::extract::State;
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use benthos_core::detection::{Batch, BatchCounts, Detection, VideoInfo};
use benthos_core::timeline;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::upload::UploadResponse;
use crate::state::AppState;

/// A simulated completed run, checked in as JSON.
#[derive(Debug, Deserialize)]
struct DemoFixture {
    detections: Vec<Detection>,
    annotation_times: Vec<f64>,
    video_info: VideoInfo,
}

const FIXTURE: &str = include_str!("../../fixtures/demo_batch.json");

/// GET /demo -- replace the live batch with the canned fixture.
pub async fn demo(State(state): State<AppState>) -> AppResult<Json<UploadResponse>> {
    if state.config.demo_delay_ms > 0 {
        // Simulates processing time so the UI's progress states are visible.
        tokio::time::sleep(std::time::Duration::from_millis(state.config.demo_delay_ms)).await;
    }

    let fixture: DemoFixture = serde_json::from_str(FIXTURE)
        .map_err(|e| AppError::Internal(format!("demo fixture: {e}")))?;

    let annotated_count = fixture.detections.iter().filter(|d| d.is_annotated).count();
    let counts = BatchCounts {
        total_annotations: fixture.annotation_times.len(),
        total_annotated: annotated_count,
        total_unannotated: fixture.detections.len() - annotated_count,
    };

    let batch = Batch {
        detections: fixture.detections,
        annotation_times: fixture.annotation_times,
        counts,
    };

    let timeline_png = timeline::render_timeline(
        &batch.detections,
        &batch.annotation_times,
        fixture.video_info.duration,
    )?;

    state.store.replace(batch.clone()).await;
    state.progress.publish(benthos_events::COMPLETE);

    let annotated: Vec<Detection> = batch
        .detections
        .iter()
        .filter(|d| d.is_annotated)
        .cloned()
        .collect();
    let unannotated: Vec<Detection> = batch
        .detections
        .iter()
        .filter(|d| !d.is_annotated)
        .cloned()
        .collect();

    Ok(Json(UploadResponse {
        detections: batch.detections,
        annotated,
        unannotated,
        counts,
        video_info: fixture.video_info,
        timeline: BASE64.encode(&timeline_png),
    }))
}
