//! Resumable upload endpoints (tus-flavored).

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use shutterbox_core::AppError;

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::handlers::upload::IngestResponse;
use crate::services::transfer::{parse_upload_metadata, AppendOutcome};
use crate::state::AppState;

pub const TUS_VERSION: &str = "1.0.0";
const OFFSET_CONTENT_TYPE: &str = "application/offset+octet-stream";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn parse_numeric_header(headers: &HeaderMap, name: &str) -> Result<i64, AppError> {
    header_str(headers, name)
        .ok_or_else(|| AppError::Validation(format!("{name} header is required")))?
        .parse::<i64>()
        .map_err(|_| AppError::Validation(format!("{name} must be a non-negative integer")))
}

#[utoipa::path(
    post,
    path = "/tus",
    tag = "resumable",
    params(
        ("Upload-Length" = i64, Header, description = "Total size of the upload in bytes"),
        ("Upload-Metadata" = Option<String>, Header, description = "Comma-separated `key base64value` pairs; itemId and filetype are required")
    ),
    responses(
        (status = 201, description = "Transfer opened; Location points at the upload"),
        (status = 400, description = "Missing itemId, bad metadata, or invalid length", body = ErrorResponse),
        (status = 409, description = "itemId is already used", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
        (status = 413, description = "Declared length exceeds the size limit", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, headers),
    fields(user_id = user.0.id, operation = "tus_create")
)]
pub async fn create_upload(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    headers: HeaderMap,
) -> Result<Response, HttpAppError> {
    let length = parse_numeric_header(&headers, "Upload-Length")?;
    let metadata = parse_upload_metadata(header_str(&headers, "Upload-Metadata").unwrap_or(""))?;

    let session = state.transfers.create(user.0.id, length, &metadata).await?;

    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header(header::LOCATION, format!("/tus/{}", session.id))
        .header("Tus-Resumable", TUS_VERSION)
        .header("Upload-Offset", "0")
        .body(Body::empty())
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

#[utoipa::path(
    patch,
    path = "/tus/{id}",
    tag = "resumable",
    params(
        ("id" = String, Path, description = "Upload id"),
        ("Upload-Offset" = i64, Header, description = "Byte offset of this chunk; must equal the committed offset")
    ),
    request_body(content_type = "application/offset+octet-stream"),
    responses(
        (status = 204, description = "Chunk committed; Upload-Offset carries the new offset"),
        (status = 200, description = "Upload complete and ingested", body = IngestResponse),
        (status = 409, description = "Offset mismatch or duplicate itemId", body = ErrorResponse),
        (status = 404, description = "No such upload", body = ErrorResponse),
        (status = 415, description = "Wrong content type", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, headers, body),
    fields(user_id = user.0.id, upload_id = %id, operation = "tus_append")
)]
pub async fn append_upload(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, HttpAppError> {
    match header_str(&headers, header::CONTENT_TYPE.as_str()) {
        Some(value) if value == OFFSET_CONTENT_TYPE => {}
        _ => {
            return Ok((
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                Json(serde_json::json!({
                    "error": format!("Content-Type must be {OFFSET_CONTENT_TYPE}")
                })),
            )
                .into_response());
        }
    }
    let offset = parse_numeric_header(&headers, "Upload-Offset")?;

    let outcome = state
        .transfers
        .append(user.0.id, &id, offset, body.into_data_stream())
        .await?;

    match outcome {
        AppendOutcome::Received { offset } => Ok(Response::builder()
            .status(StatusCode::NO_CONTENT)
            .header("Tus-Resumable", TUS_VERSION)
            .header("Upload-Offset", offset)
            .body(Body::empty())
            .map_err(|e| AppError::Internal(e.to_string()))?),
        AppendOutcome::Completed(outcome) => {
            let (status, json) = IngestResponse::from_outcome(outcome);
            Ok((status, [("Tus-Resumable", TUS_VERSION)], json).into_response())
        }
    }
}

#[utoipa::path(
    head,
    path = "/tus/{id}",
    tag = "resumable",
    params(
        ("id" = String, Path, description = "Upload id")
    ),
    responses(
        (status = 200, description = "Upload-Offset and Upload-Length report progress"),
        (status = 404, description = "No such upload", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, upload_id = %id, operation = "tus_offset")
)]
pub async fn upload_offset(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<Response, HttpAppError> {
    let session = state.transfers.offset(user.0.id, &id).await?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header("Tus-Resumable", TUS_VERSION)
        .header("Upload-Offset", session.bytes_received)
        .header("Upload-Length", session.length)
        .header(header::CACHE_CONTROL, "no-store")
        .body(Body::empty())
        .map_err(|e| AppError::Internal(e.to_string()))?)
}

#[utoipa::path(
    delete,
    path = "/tus/{id}",
    tag = "resumable",
    params(
        ("id" = String, Path, description = "Upload id")
    ),
    responses(
        (status = 204, description = "Transfer terminated"),
        (status = 404, description = "No such upload", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, upload_id = %id, operation = "tus_terminate")
)]
pub async fn terminate_upload(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.transfers.terminate(user.0.id, &id).await?;
    Ok((StatusCode::NO_CONTENT, [("Tus-Resumable", TUS_VERSION)]))
}
