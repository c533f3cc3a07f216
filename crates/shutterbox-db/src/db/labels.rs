//! Label repository.

use sqlx::SqlitePool;

use shutterbox_core::{AppError, Label, LabelCount};

/// Repository for labels attached to media records.
///
/// Labels have no partial-update path. Writes replace the full set for a
/// media record inside one transaction, so readers never observe a mix of
/// old and new labels.
#[derive(Clone)]
pub struct LabelRepository {
    pool: SqlitePool,
}

impl LabelRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "labels", db.operation = "select", db.record_id = %media_id))]
    pub async fn labels_for(&self, user_id: i64, media_id: i64) -> Result<Vec<Label>, AppError> {
        let labels = sqlx::query_as::<_, Label>(
            "SELECT * FROM labels WHERE user_id = $1 AND media_id = $2 ORDER BY labelname",
        )
        .bind(user_id)
        .bind(media_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(labels)
    }

    /// Replace the label set for a media record.
    #[tracing::instrument(skip(self, names), fields(db.table = "labels", db.operation = "replace", db.record_id = %media_id))]
    pub async fn replace(
        &self,
        user_id: i64,
        media_id: i64,
        names: &[String],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM labels WHERE user_id = $1 AND media_id = $2")
            .bind(user_id)
            .bind(media_id)
            .execute(&mut *tx)
            .await?;

        for name in names {
            sqlx::query("INSERT INTO labels (media_id, user_id, labelname) VALUES ($1, $2, $3)")
                .bind(media_id)
                .bind(user_id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "labels", db.operation = "select"))]
    pub async fn counts(&self, user_id: i64) -> Result<Vec<LabelCount>, AppError> {
        let counts = sqlx::query_as::<_, LabelCount>(
            r#"
            SELECT labelname, COUNT(*) AS count FROM labels
            WHERE user_id = $1
            GROUP BY labelname
            ORDER BY labelname
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(counts)
    }
}
