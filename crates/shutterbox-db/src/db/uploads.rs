//! Resumable upload session repository.

use sqlx::SqlitePool;

use shutterbox_core::{AppError, UploadSession};

/// Repository for in-flight resumable uploads.
///
/// A session row tracks declared length and bytes received for one transfer.
/// Rows are deleted on completion and termination; the expiration sweep
/// removes the ones that never finish.
#[derive(Clone)]
pub struct UploadSessionRepository {
    pool: SqlitePool,
}

impl UploadSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "insert", db.record_id = %session.id))]
    pub async fn create(&self, session: &UploadSession) -> Result<UploadSession, AppError> {
        let stored = sqlx::query_as::<_, UploadSession>(
            r#"
            INSERT INTO upload_sessions (
                id, user_id, item_id, filename, mime_type, length,
                bytes_received, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(&session.id)
        .bind(session.user_id)
        .bind(&session.item_id)
        .bind(&session.filename)
        .bind(&session.mime_type)
        .bind(session.length)
        .bind(session.bytes_received)
        .bind(session.created_at)
        .bind(session.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, user_id: i64, id: &str) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Record progress after a successful append. The update only lands when
    /// the stored offset still equals `from_offset`; `None` means the session
    /// is gone or another append committed first.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "update", db.record_id = %id))]
    pub async fn advance(
        &self,
        user_id: i64,
        id: &str,
        from_offset: i64,
        bytes_received: i64,
    ) -> Result<Option<UploadSession>, AppError> {
        let session = sqlx::query_as::<_, UploadSession>(
            r#"
            UPDATE upload_sessions
            SET bytes_received = $1, updated_at = $2
            WHERE user_id = $3 AND id = $4 AND bytes_received = $5
            RETURNING *
            "#,
        )
        .bind(bytes_received)
        .bind(chrono::Utc::now())
        .bind(user_id)
        .bind(id)
        .bind(from_offset)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, user_id: i64, id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM upload_sessions WHERE user_id = $1 AND id = $2")
            .bind(user_id)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// All sessions across users, oldest first. Feeds the expiration sweep.
    #[tracing::instrument(skip(self), fields(db.table = "upload_sessions", db.operation = "select"))]
    pub async fn list(&self) -> Result<Vec<UploadSession>, AppError> {
        let sessions = sqlx::query_as::<_, UploadSession>(
            "SELECT * FROM upload_sessions ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}
