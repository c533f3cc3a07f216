//! Label attachment and aggregation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use shutterbox_core::{AppError, Label, LabelCount};

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/labels/{media_id}",
    tag = "labels",
    params(
        ("media_id" = i64, Path, description = "Media record id")
    ),
    responses(
        (status = 200, description = "Labels for the record", body = Vec<Label>),
        (status = 204, description = "Record has no labels"),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, media_id, operation = "get_labels")
)]
pub async fn get_labels(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(media_id): Path<i64>,
) -> Result<Response, HttpAppError> {
    let labels = state.labels.labels_for(user.0.id, media_id).await?;
    if labels.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    Ok(Json(labels).into_response())
}

#[utoipa::path(
    post,
    path = "/labels/{item_id}",
    tag = "labels",
    params(
        ("item_id" = String, Path, description = "Client idempotency key of the media")
    ),
    request_body = Vec<String>,
    responses(
        (status = 204, description = "Labels replaced"),
        (status = 404, description = "No media with that itemId", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, names),
    fields(user_id = user.0.id, item_id = %item_id, count = names.len(), operation = "set_labels")
)]
pub async fn set_labels(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(item_id): Path<String>,
    Json(names): Json<Vec<String>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .media
        .find_by_item_id(user.0.id, &item_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No media with itemId {item_id}")))?;

    state.labels.replace(user.0.id, record.id, &names).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/metadata-count-by-label",
    tag = "labels",
    responses(
        (status = 200, description = "Record count per label name", body = Vec<LabelCount>),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = user.0.id, operation = "count_by_label"))]
pub async fn count_by_label(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.labels.counts(user.0.id).await?))
}
