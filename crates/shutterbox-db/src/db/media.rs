//! Media record repository.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use shutterbox_core::{AppError, MediaRecord, NewMedia};

use super::filter::MediaFilter;

/// Repository for stored media rows.
///
/// Every query is scoped to an owning user. Uniqueness conflicts on
/// `(user_id, item_id)`, `(user_id, filename)`, and `(user_id, filekey)`
/// surface as `AppError::ConstraintViolation` with the colliding key, which
/// the ingestion pipeline branches on.
#[derive(Clone)]
pub struct MediaRepository {
    pool: SqlitePool,
}

impl MediaRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, media), fields(db.table = "media", db.operation = "insert"))]
    pub async fn insert(&self, media: &NewMedia) -> Result<MediaRecord, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(
            r#"
            INSERT INTO media (
                user_id, filekey, filename, filesize, mime_type, item_id,
                width, height, duration, altitude, latitude, longitude,
                created, uploaded
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            RETURNING *
            "#,
        )
        .bind(media.user_id)
        .bind(&media.filekey)
        .bind(&media.filename)
        .bind(media.filesize)
        .bind(&media.mime_type)
        .bind(&media.item_id)
        .bind(media.width)
        .bind(media.height)
        .bind(media.duration)
        .bind(media.altitude)
        .bind(media.latitude)
        .bind(media.longitude)
        .bind(media.created)
        .bind(media.uploaded)
        .fetch_one(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, user_id: i64, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT * FROM media WHERE user_id = $1 AND id = $2",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn find_by_item_id(
        &self,
        user_id: i64,
        item_id: &str,
    ) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT * FROM media WHERE user_id = $1 AND item_id = $2",
        )
        .bind(user_id)
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn find_by_filekey(
        &self,
        user_id: i64,
        filekey: &str,
    ) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT * FROM media WHERE user_id = $1 AND filekey = $2",
        )
        .bind(user_id)
        .bind(filekey)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Fetch rows matching a typed partial filter. No implied ordering.
    #[tracing::instrument(skip(self, filter), fields(db.table = "media", db.operation = "select"))]
    pub async fn find(
        &self,
        user_id: i64,
        filter: &MediaFilter,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM media WHERE user_id = ");
        qb.push_bind(user_id);
        filter.apply(&mut qb);

        let records = qb
            .build_query_as::<MediaRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Rewrite a full row in place. Returns the stored row, or None when the
    /// id does not exist for this user.
    #[tracing::instrument(skip(self, record), fields(db.table = "media", db.operation = "update", db.record_id = %record.id))]
    pub async fn update(&self, record: &MediaRecord) -> Result<Option<MediaRecord>, AppError> {
        let updated = sqlx::query_as::<_, MediaRecord>(
            r#"
            UPDATE media SET
                filekey = $1, filename = $2, filesize = $3, mime_type = $4,
                item_id = $5, width = $6, height = $7, duration = $8,
                altitude = $9, latitude = $10, longitude = $11,
                created = $12, uploaded = $13
            WHERE user_id = $14 AND id = $15
            RETURNING *
            "#,
        )
        .bind(&record.filekey)
        .bind(&record.filename)
        .bind(record.filesize)
        .bind(&record.mime_type)
        .bind(&record.item_id)
        .bind(record.width)
        .bind(record.height)
        .bind(record.duration)
        .bind(record.altitude)
        .bind(record.latitude)
        .bind(record.longitude)
        .bind(record.created)
        .bind(record.uploaded)
        .bind(record.user_id)
        .bind(record.id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(updated)
    }

    /// Delete all rows matching a filter. Returns the number removed.
    #[tracing::instrument(skip(self, filter), fields(db.table = "media", db.operation = "delete"))]
    pub async fn remove(&self, user_id: i64, filter: &MediaFilter) -> Result<u64, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM media WHERE user_id = ");
        qb.push_bind(user_id);
        filter.apply(&mut qb);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    /// Delete one row by id, returning it so the caller can remove the
    /// backing file and thumbnail.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "delete", db.record_id = %id))]
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<Option<MediaRecord>, AppError> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "DELETE FROM media WHERE user_id = $1 AND id = $2 RETURNING *",
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn filename_exists(&self, user_id: i64, filename: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM media WHERE user_id = $1 AND filename = $2)",
        )
        .bind(user_id)
        .bind(filename)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// Substring match on the display name. LIKE wildcards in the fragment
    /// are escaped, so `100_1` matches only filenames containing `100_1`.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn find_filename_like(
        &self,
        user_id: i64,
        fragment: &str,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let escaped = fragment
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let records = sqlx::query_as::<_, MediaRecord>(
            r#"SELECT * FROM media WHERE user_id = $1 AND filename LIKE $2 ESCAPE '\'"#,
        )
        .bind(user_id)
        .bind(format!("%{escaped}%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Rows with a capture time inside the given bounds, ordered by capture
    /// time. Rows without one never match.
    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn by_created_range(
        &self,
        user_id: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let records = sqlx::query_as::<_, MediaRecord>(
            r#"
            SELECT * FROM media
            WHERE user_id = $1
              AND created IS NOT NULL
              AND ($2 IS NULL OR created >= $2)
              AND ($3 IS NULL OR created <= $3)
            ORDER BY created
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn photos(&self, user_id: i64) -> Result<Vec<MediaRecord>, AppError> {
        self.by_mime_prefix(user_id, "image/").await
    }

    #[tracing::instrument(skip(self), fields(db.table = "media", db.operation = "select"))]
    pub async fn videos(&self, user_id: i64) -> Result<Vec<MediaRecord>, AppError> {
        self.by_mime_prefix(user_id, "video/").await
    }

    async fn by_mime_prefix(
        &self,
        user_id: i64,
        prefix: &str,
    ) -> Result<Vec<MediaRecord>, AppError> {
        let records = sqlx::query_as::<_, MediaRecord>(
            "SELECT * FROM media WHERE user_id = $1 AND mime_type LIKE $2 ORDER BY uploaded",
        )
        .bind(user_id)
        .bind(format!("{prefix}%"))
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
