use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Bookkeeping row for one resumable transfer.
///
/// The binary prefix lives in the temp area under `id`; `bytes_received`
/// tracks how much of the declared `length` has arrived. Rows disappear on
/// finalize, explicit termination, or reaping.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadSession {
    pub id: String,
    pub user_id: i64,
    pub item_id: String,
    pub filename: Option<String>,
    pub mime_type: Option<String>,
    pub length: i64,
    pub bytes_received: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadSession {
    /// Fresh session with no bytes received. `filename` and `mime_type` are
    /// the client's metadata claims and may be absent.
    pub fn new(
        id: String,
        user_id: i64,
        item_id: String,
        length: i64,
        filename: Option<String>,
        mime_type: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            item_id,
            filename,
            mime_type,
            length,
            bytes_received: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// All declared bytes have arrived and the upload is ready to finalize.
    pub fn is_complete(&self) -> bool {
        self.bytes_received >= self.length
    }

    /// Age of this session relative to `now`, in whole seconds. A session
    /// whose clock-skewed creation time lies in the future has age zero.
    pub fn age_secs(&self, now: DateTime<Utc>) -> u64 {
        now.signed_duration_since(self.created_at)
            .num_seconds()
            .max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(length: i64, bytes_received: i64) -> UploadSession {
        let now = Utc::now();
        UploadSession {
            id: "u1".to_string(),
            user_id: 1,
            item_id: "item-1".to_string(),
            filename: Some("clip.mp4".to_string()),
            mime_type: Some("video/mp4".to_string()),
            length,
            bytes_received,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_is_complete() {
        assert!(!session(100, 0).is_complete());
        assert!(!session(100, 99).is_complete());
        assert!(session(100, 100).is_complete());
    }

    #[test]
    fn test_age_secs() {
        let mut s = session(10, 0);
        let now = Utc::now();
        s.created_at = now - Duration::seconds(90);
        assert_eq!(s.age_secs(now), 90);

        // Future creation times clamp to zero rather than underflowing.
        s.created_at = now + Duration::seconds(30);
        assert_eq!(s.age_secs(now), 0);
    }
}
