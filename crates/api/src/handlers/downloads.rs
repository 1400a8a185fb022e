//! Handler for `GET /download/{kind}`: CSV export of a detection view.

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use benthos_core::store::ExportKind;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /download/{kind} -- stream one view as a CSV attachment.
///
/// `kind` is one of `detections`, `annotated`, `unannotated`; anything
/// else is a 404.
pub async fn download(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> AppResult<Response> {
    let kind = ExportKind::from_str(&kind)
        .ok_or_else(|| AppError::NotFound(format!("unknown download kind '{kind}'")))?;

    let csv = state.store.export(kind).await?;

    let response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", kind.as_str()),
            ),
        ],
        csv,
    )
        .into_response();

    Ok(response)
}
