//! One-shot multipart upload.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use shutterbox_core::MediaRecord;

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::services::intake::{IngestOutcome, SKIPPED_MESSAGE};
use crate::state::AppState;
use crate::utils::multipart::stage_multipart_file;

/// Body returned by both upload paths once a record exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub media: MediaRecord,
}

impl IngestResponse {
    pub fn from_outcome(outcome: IngestOutcome) -> (StatusCode, Json<Self>) {
        let status = if outcome.skipped {
            StatusCode::OK
        } else {
            StatusCode::CREATED
        };
        let body = Self {
            skipped: outcome.skipped,
            message: outcome.skipped.then(|| SKIPPED_MESSAGE.to_string()),
            media: outcome.record,
        };
        (status, Json(body))
    }
}

#[utoipa::path(
    post,
    path = "/file/{item_id}",
    tag = "upload",
    params(
        ("item_id" = String, Path, description = "Client-chosen idempotency key")
    ),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Media ingested", body = IngestResponse),
        (status = 200, description = "Item already uploaded, skipped", body = IngestResponse),
        (status = 400, description = "Invalid file type or malformed body", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse),
        (status = 413, description = "File exceeds the size limit", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(user_id = user.0.id, item_id = %item_id, operation = "upload_file")
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(item_id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let staged =
        stage_multipart_file(&state.vault, multipart, state.config.max_upload_bytes).await?;

    tracing::debug!(
        filename = %staged.filename,
        size = staged.size,
        "Upload staged, starting ingestion"
    );

    let outcome = state
        .intake
        .ingest(
            user.0.id,
            &staged.temp_name,
            &staged.filename,
            &staged.mime_type,
            Some(&item_id),
        )
        .await?;

    Ok(IngestResponse::from_outcome(outcome))
}
