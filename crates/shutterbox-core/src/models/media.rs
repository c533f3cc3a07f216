use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// Coarse media classification derived from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    /// Classify a MIME type, ignoring any `;charset=...` style parameters.
    /// Returns `None` for anything that is not a photo or a video.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim();
        if essence.starts_with("image/") {
            Some(MediaKind::Photo)
        } else if essence.starts_with("video/") {
            Some(MediaKind::Video)
        } else {
            None
        }
    }
}

/// One stored file and everything extracted from it.
///
/// `filekey` is the opaque on-disk name; `filename` is the user-facing
/// display name after deduplication. `created` is the best-effort capture
/// time from embedded tags, `uploaded` the server-assigned ingestion time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct MediaRecord {
    pub id: i64,
    pub user_id: i64,
    pub filekey: String,
    pub filename: String,
    pub filesize: i64,
    pub mime_type: String,
    pub item_id: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub altitude: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created: Option<DateTime<Utc>>,
    pub uploaded: DateTime<Utc>,
}

impl MediaRecord {
    pub fn kind(&self) -> Option<MediaKind> {
        MediaKind::from_mime(&self.mime_type)
    }
}

/// Insert payload for a media row; the store assigns `id`.
#[derive(Debug, Clone)]
pub struct NewMedia {
    pub user_id: i64,
    pub filekey: String,
    pub filename: String,
    pub filesize: i64,
    pub mime_type: String,
    pub item_id: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub altitude: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created: Option<DateTime<Utc>>,
    pub uploaded: DateTime<Utc>,
}

impl NewMedia {
    /// Minimal record: identity fields set, everything extracted left empty.
    pub fn new(user_id: i64, filekey: String, filename: String, mime_type: String) -> Self {
        NewMedia {
            user_id,
            filekey,
            filename,
            filesize: 0,
            mime_type,
            item_id: None,
            width: None,
            height: None,
            duration: None,
            altitude: None,
            latitude: None,
            longitude: None,
            created: None,
            uploaded: Utc::now(),
        }
    }
}
