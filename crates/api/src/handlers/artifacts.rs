//! Handler for `GET /uploads/{*path}`: serve stored videos back to the UI.
//!
//! Only files inside the configured upload directory are reachable; any
//! path component that is not a plain name is rejected before touching
//! the filesystem.

use std::path::{Component, PathBuf};

use axum::body::Body;
use axum::extract::{Path as UrlPath, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio_util::io::ReaderStream;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("avi") => "video/x-msvideo",
        Some("mov") => "video/quicktime",
        Some("mkv") => "video/x-matroska",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

/// GET /uploads/{*path} -- stream one stored artifact.
pub async fn serve_upload(
    State(state): State<AppState>,
    UrlPath(path): UrlPath<String>,
) -> AppResult<Response> {
    let relative = PathBuf::from(&path);
    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(AppError::BadRequest("Invalid artifact path".into()));
    }

    let full = state.config.upload_dir.join(&relative);
    let file = match tokio::fs::File::open(&full).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("no stored file '{path}'")));
        }
        Err(e) => return Err(AppError::Internal(format!("opening artifact: {e}"))),
    };

    let stream = ReaderStream::new(file);
    let response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(&full))],
        Body::from_stream(stream),
    )
        .into_response();
    Ok(response)
}
