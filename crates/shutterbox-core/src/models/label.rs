use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// A tag attached to a media row. `user_id` is denormalized so per-owner
/// label counting never joins through `media`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Label {
    pub id: i64,
    pub media_id: i64,
    pub user_id: i64,
    pub labelname: String,
}

/// One row of the per-owner label histogram.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LabelCount {
    pub labelname: String,
    pub count: i64,
}
