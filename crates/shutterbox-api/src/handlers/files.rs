//! Binary serving and deletion.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncSeekExt, SeekFrom};
use tokio_util::io::ReaderStream;

use shutterbox_core::AppError;

use crate::auth::CurrentUser;
use crate::error::{storage_to_app, ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::range::{parse_range, ByteRange};

#[utoipa::path(
    get,
    path = "/file/{filekey}",
    tag = "files",
    params(
        ("filekey" = String, Path, description = "Storage key of the media file"),
        ("Range" = Option<String>, Header, description = "Single byte range")
    ),
    responses(
        (status = 200, description = "Full file content"),
        (status = 206, description = "Partial content"),
        (status = 416, description = "Range not satisfiable"),
        (status = 404, description = "No such file", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, headers),
    fields(user_id = user.0.id, filekey = %filekey, operation = "serve_file")
)]
pub async fn serve_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(filekey): Path<String>,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let record = state
        .media
        .find_by_filekey(user.0.id, &filekey)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File {filekey} not found")))?;

    let path = state
        .vault
        .file_path(user.0.id, &filekey)
        .map_err(storage_to_app)?;
    let total = state
        .vault
        .media_len(user.0.id, &filekey)
        .await
        .map_err(storage_to_app)?;

    let range_header = headers
        .get(header::RANGE)
        .and_then(|value| value.to_str().ok());

    match parse_range(range_header, total) {
        ByteRange::Full => {
            let file = tokio::fs::File::open(&path).await?;
            let body = Body::from_stream(ReaderStream::new(file));
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, &record.mime_type)
                .header(header::CONTENT_LENGTH, total)
                .header(header::ACCEPT_RANGES, "bytes")
                .body(body)
                .map_err(|e| AppError::Internal(e.to_string()))?)
        }
        ByteRange::Partial { start, end } => {
            let mut file = tokio::fs::File::open(&path).await?;
            file.seek(SeekFrom::Start(start)).await?;
            let len = end - start + 1;
            let body = Body::from_stream(ReaderStream::new(file.take(len)));
            Ok(Response::builder()
                .status(StatusCode::PARTIAL_CONTENT)
                .header(header::CONTENT_TYPE, &record.mime_type)
                .header(header::CONTENT_LENGTH, len)
                .header(header::ACCEPT_RANGES, "bytes")
                .header(
                    header::CONTENT_RANGE,
                    format!("bytes {start}-{end}/{total}"),
                )
                .body(body)
                .map_err(|e| AppError::Internal(e.to_string()))?)
        }
        ByteRange::Unsatisfiable => Ok(Response::builder()
            .status(StatusCode::RANGE_NOT_SATISFIABLE)
            .header(header::CONTENT_RANGE, format!("bytes */{total}"))
            .body(Body::empty())
            .map_err(|e| AppError::Internal(e.to_string()))?),
    }
}

#[utoipa::path(
    get,
    path = "/thumbnail/{filekey}",
    tag = "files",
    params(
        ("filekey" = String, Path, description = "Storage key of the media file")
    ),
    responses(
        (status = 200, description = "Preview JPEG", content_type = "image/jpeg"),
        (status = 404, description = "No thumbnail for this file", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, filekey = %filekey, operation = "serve_thumbnail")
)]
pub async fn serve_thumbnail(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(filekey): Path<String>,
) -> Result<Response, HttpAppError> {
    let path = state
        .vault
        .thumbnail_path(user.0.id, &filekey)
        .map_err(storage_to_app)?;

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("No thumbnail for {filekey}")).into());
        }
        Err(e) => return Err(AppError::from(e).into()),
    };
    let len = file.metadata().await?.len();

    let body = Body::from_stream(ReaderStream::new(file));
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "image/jpeg")
        .header(header::CONTENT_LENGTH, len)
        .body(body)
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

#[utoipa::path(
    delete,
    path = "/file/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "Media record id")
    ),
    responses(
        (status = 204, description = "Record, file, and thumbnail removed"),
        (status = 404, description = "No such record", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, media_id = id, operation = "delete_file")
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .media
        .delete(user.0.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Media {id} not found")))?;

    // The row is gone; a stranded file is recoverable disk, not a failed
    // delete.
    if let Err(err) = state.vault.delete_media(user.0.id, &record.filekey).await {
        tracing::warn!(error = %err, filekey = %record.filekey, "Failed to remove files for deleted media");
    }

    tracing::info!(media_id = id, filekey = %record.filekey, "Media deleted");
    Ok(StatusCode::NO_CONTENT)
}
