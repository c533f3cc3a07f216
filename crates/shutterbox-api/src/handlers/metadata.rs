//! Metadata listing and lookup.

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

use shutterbox_core::{AppError, MediaRecord};
use shutterbox_db::MediaFilter;

use crate::auth::CurrentUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Lift query-string values into JSON so the typed filter can classify
/// them. Integers and reals become numbers, `null` an explicit null,
/// everything else stays text.
fn coerce_query_value(raw: &str) -> Value {
    if raw == "null" {
        return Value::Null;
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::from(int);
    }
    if let Ok(real) = raw.parse::<f64>() {
        return Value::from(real);
    }
    Value::String(raw.to_string())
}

#[utoipa::path(
    get,
    path = "/metadata",
    tag = "metadata",
    params(
        ("filename" = Option<String>, Query, description = "Substring match on filename"),
        ("created_from" = Option<String>, Query, description = "RFC 3339 lower bound on capture time"),
        ("created_to" = Option<String>, Query, description = "RFC 3339 upper bound on capture time")
    ),
    responses(
        (status = 200, description = "Matching records", body = Vec<MediaRecord>),
        (status = 400, description = "Unknown filter field or malformed value", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state, params),
    fields(user_id = user.0.id, operation = "list_metadata")
)]
pub async fn list_metadata(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Query(mut params): Query<BTreeMap<String, String>>,
) -> Result<impl IntoResponse, HttpAppError> {
    params.remove("api_key");

    // The capture-time range has its own accessor with explicit ordering.
    let created_from = params.remove("created_from");
    let created_to = params.remove("created_to");
    if created_from.is_some() || created_to.is_some() {
        let parse = |bound: Option<String>| -> Result<_, AppError> {
            bound
                .map(|text| {
                    chrono::DateTime::parse_from_rfc3339(&text)
                        .map(|dt| dt.with_timezone(&chrono::Utc))
                        .map_err(|_| {
                            AppError::InvalidQuery(format!("Invalid timestamp: {text}"))
                        })
                })
                .transpose()
        };
        let records = state
            .media
            .by_created_range(user.0.id, parse(created_from)?, parse(created_to)?)
            .await?;
        return Ok(Json(records));
    }

    if let Some(fragment) = params.remove("filename") {
        if !params.is_empty() {
            return Err(AppError::InvalidQuery(
                "filename cannot be combined with other filters".to_string(),
            )
            .into());
        }
        let records = state.media.find_filename_like(user.0.id, &fragment).await?;
        return Ok(Json(records));
    }

    let map: Map<String, Value> = params
        .into_iter()
        .map(|(key, raw)| (key, coerce_query_value(&raw)))
        .collect();
    let filter = MediaFilter::from_map(&map)?;
    let records = state.media.find(user.0.id, &filter).await?;
    Ok(Json(records))
}

#[utoipa::path(
    get,
    path = "/metadata/{id}",
    tag = "metadata",
    params(
        ("id" = i64, Path, description = "Media record id")
    ),
    responses(
        (status = 200, description = "Record found", body = MediaRecord),
        (status = 404, description = "No such record", body = ErrorResponse),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(
    skip(state),
    fields(user_id = user.0.id, media_id = id, operation = "get_metadata")
)]
pub async fn get_metadata(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, HttpAppError> {
    let record = state
        .media
        .get(user.0.id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Media {id} not found")))?;
    Ok(Json(record))
}

#[utoipa::path(
    get,
    path = "/photos",
    tag = "metadata",
    responses(
        (status = 200, description = "All photo records", body = Vec<MediaRecord>),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = user.0.id, operation = "list_photos"))]
pub async fn list_photos(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.media.photos(user.0.id).await?))
}

#[utoipa::path(
    get,
    path = "/videos",
    tag = "metadata",
    responses(
        (status = 200, description = "All video records", body = Vec<MediaRecord>),
        (status = 401, description = "Invalid API key", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = user.0.id, operation = "list_videos"))]
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.media.videos(user.0.id).await?))
}
