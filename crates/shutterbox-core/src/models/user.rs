use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// An account owning media rows and on-disk files.
///
/// `api_key` is the opaque bearer credential; it is issued once by the
/// `create-user` CLI and only ever compared by indexed lookup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub created: DateTime<Utc>,
}
