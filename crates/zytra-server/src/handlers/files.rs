//! Upload, list, select and preview handlers

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use tracing::error;

use super::auth::dispatch;
use super::session::unknown_session;
use crate::{get_session_id, AppError, AppState};
use zytra_core::app::{FileSummary, PREVIEW_ROWS};
use zytra_core::{Event, Outcome, Table, UploadedFile};

/// Largest preview a client may ask for
const MAX_PREVIEW_ROWS: usize = 100;

/// POST /api/files - Upload one or more CSV files
///
/// Expects multipart form with one or more `file` fields. Each field must
/// carry a file name; the total size is capped by `max_upload_mb`. Files are
/// parsed on the blocking pool before the session is locked.
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<Outcome>, AppError> {
    let session_id = get_session_id(&headers)?;
    state
        .sessions
        .update(&session_id, |ctx| ctx.check_upload().map_err(|e| ctx.reject(e)))
        .await
        .ok_or_else(unknown_session)??;

    let limit = state.config.max_upload_size;
    let mut files = Vec::new();
    let mut total_size: usize = 0;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let name = field
            .file_name()
            .map(|n| n.to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::bad_request("File field is missing a file name"))?;
        let bytes = field.bytes().await.map_err(|e| multipart_error(e, limit))?;

        total_size += bytes.len();
        if total_size > limit {
            return Err(too_large(limit));
        }
        files.push((name, bytes.to_vec()));
    }

    if files.is_empty() {
        return Err(AppError::bad_request("Missing file field"));
    }

    let parsed = tokio::task::spawn_blocking(move || UploadedFile::parse_batch(&files))
        .await
        .map_err(|e| {
            error!(error = %e, "Upload parsing task failed");
            AppError::internal("Upload parsing failed")
        })?;

    match parsed {
        Ok(parsed) => dispatch(&state, &headers, Event::AddFiles(parsed)).await,
        Err(e) => {
            let err = state
                .sessions
                .update(&session_id, |ctx| ctx.reject(e))
                .await
                .ok_or_else(unknown_session)?;
            Err(err.into())
        }
    }
}

fn too_large(limit: usize) -> AppError {
    AppError::payload_too_large(&format!(
        "Upload too large. Maximum size is {} MB",
        limit / 1024 / 1024
    ))
}

/// Body limit breaches become 413; anything else is a malformed form
fn multipart_error(err: MultipartError, limit: usize) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_large(limit)
    } else {
        AppError::bad_request(&format!("Failed to read form field: {}", err))
    }
}

/// GET /api/files - Uploaded files
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<FileSummary>>, AppError> {
    let session_id = get_session_id(&headers)?;
    let files = state
        .sessions
        .read(&session_id, |ctx| ctx.file_summaries())
        .await
        .ok_or_else(unknown_session)??;
    Ok(Json(files))
}

#[derive(Deserialize)]
pub struct SelectFileRequest {
    pub name: String,
}

/// POST /api/files/select
pub async fn select_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SelectFileRequest>,
) -> Result<Json<Outcome>, AppError> {
    dispatch(&state, &headers, Event::SelectFile { name: body.name }).await
}

#[derive(Deserialize)]
pub struct PreviewQuery {
    pub rows: Option<usize>,
}

/// GET /api/files/preview - First rows of the selected file
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<Table>, AppError> {
    let session_id = get_session_id(&headers)?;
    let rows = query.rows.unwrap_or(PREVIEW_ROWS).clamp(1, MAX_PREVIEW_ROWS);
    let preview = state
        .sessions
        .read(&session_id, |ctx| ctx.preview(rows))
        .await
        .ok_or_else(unknown_session)??;
    Ok(Json(preview))
}
