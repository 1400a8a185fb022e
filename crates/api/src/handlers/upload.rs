//! Handler for `POST /upload`: the synchronous processing path.
//!
//! Accepts a multipart form with a required `video` part, an optional
//! `csv` part of human annotations, and an optional `show_labels` text
//! field. Runs the full pipeline inline and replaces the live batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use benthos_core::detection::{BatchCounts, Detection, VideoInfo};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::pipeline;
use crate::state::AppState;

/// Accepted video container extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

/// Response payload for `/upload` and `/demo`.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub detections: Vec<Detection>,
    pub annotated: Vec<Detection>,
    pub unannotated: Vec<Detection>,
    pub counts: BatchCounts,
    pub video_info: VideoInfo,
    /// Timeline chart, Base64-encoded PNG.
    pub timeline: String,
}

/// The parts pulled out of the multipart form.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub video: Option<(String, Vec<u8>)>,
    pub annotations: Option<(String, Vec<u8>)>,
    pub show_labels: Option<bool>,
}

/// Strip an untrusted client filename down to a safe basename.
///
/// Keeps ASCII alphanumerics, `.`, `-`, and `_`; everything else becomes
/// `_`. Path separators never survive, so the result cannot escape the
/// upload directory.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Collect the known fields out of a multipart body.
pub async fn read_upload_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("unreadable multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "video" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable video part: {e}")))?;
                form.video = Some((filename, bytes.to_vec()));
            }
            "csv" | "annotations" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("unreadable csv part: {e}")))?;
                form.annotations = Some((filename, bytes.to_vec()));
            }
            "show_labels" => {
                let value = field.text().await.unwrap_or_default();
                form.show_labels = Some(value != "false" && value != "0");
            }
            other => {
                tracing::debug!(field = other, "Ignoring unknown multipart field");
            }
        }
    }

    Ok(form)
}

/// Validate the video part and write it into the upload directory.
///
/// Returns `(stored_path, original_name)`. Stored names carry a UUID
/// prefix so concurrent uploads of `dive.mp4` never collide.
pub async fn store_video(
    upload_dir: &Path,
    video: Option<(String, Vec<u8>)>,
) -> AppResult<(PathBuf, String)> {
    let (filename, bytes) = video.ok_or_else(|| AppError::BadRequest("No file part".into()))?;

    if filename.is_empty() {
        return Err(AppError::BadRequest("No selected file".into()));
    }
    if bytes.is_empty() {
        return Err(AppError::BadRequest("Empty video file".into()));
    }

    let safe = sanitize_filename(&filename);
    let extension = extension_of(&safe);
    if !VIDEO_EXTENSIONS.contains(&extension.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Unsupported video extension '{extension}'. Expected one of: {}",
            VIDEO_EXTENSIONS.join(", ")
        )));
    }

    tokio::fs::create_dir_all(upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("upload dir: {e}")))?;

    let stored = upload_dir.join(format!("{}_{safe}", Uuid::new_v4().simple()));
    tokio::fs::write(&stored, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("storing upload: {e}")))?;

    Ok((stored, safe))
}

/// Validate and store the optional annotation CSV.
pub async fn store_annotations(
    upload_dir: &Path,
    annotations: Option<(String, Vec<u8>)>,
) -> AppResult<Option<PathBuf>> {
    let Some((filename, bytes)) = annotations else {
        return Ok(None);
    };
    if filename.is_empty() || bytes.is_empty() {
        return Ok(None);
    }

    let safe = sanitize_filename(&filename);
    if extension_of(&safe) != "csv" {
        return Err(AppError::BadRequest(
            "Annotations must be a .csv file".into(),
        ));
    }

    let stored = upload_dir.join(format!("{}_{safe}", Uuid::new_v4().simple()));
    tokio::fs::write(&stored, &bytes)
        .await
        .map_err(|e| AppError::Internal(format!("storing annotations: {e}")))?;
    Ok(Some(stored))
}

/// POST /upload -- process a video (+ optional annotations) synchronously.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
    let form = read_upload_form(multipart).await?;
    let show_labels = form.show_labels.unwrap_or(state.config.show_labels);

    let (video_path, original_name) = store_video(&state.config.upload_dir, form.video).await?;
    // Any failure from here on removes the stored inputs; the annotation
    // CSV is read into memory during the run and never needed again.
    let mut video_cleanup = pipeline::RemoveOnDrop::new(video_path.clone());
    let annotation_path = store_annotations(&state.config.upload_dir, form.annotations).await?;
    let _annotation_cleanup = annotation_path.clone().map(pipeline::RemoveOnDrop::new);

    // Stale values from a previous run must not leak into this stream.
    state.progress.clear().await;
    let channel = Arc::clone(&state.progress);
    let observer: benthos_detect::ProgressObserver = Arc::new(move |value| channel.publish(value));

    let output = pipeline::run(
        &state.config,
        &state.detector,
        &video_path,
        annotation_path.as_deref(),
        show_labels,
        Some(observer),
    )
    .await?;

    // The canonical MP4 survives a successful run; `/uploads` serves it.
    video_cleanup.disarm();

    state.store.replace(output.batch.clone()).await;

    let mut video_info = output.video_info;
    video_info.name = original_name;

    let annotated: Vec<Detection> = output
        .batch
        .detections
        .iter()
        .filter(|d| d.is_annotated)
        .cloned()
        .collect();
    let unannotated: Vec<Detection> = output
        .batch
        .detections
        .iter()
        .filter(|d| !d.is_annotated)
        .cloned()
        .collect();

    Ok(Json(UploadResponse {
        detections: output.batch.detections,
        annotated,
        unannotated,
        counts: output.batch.counts,
        video_info,
        timeline: BASE64.encode(&output.timeline_png),
    }))
}
