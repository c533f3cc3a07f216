//! User account repository.

use sqlx::SqlitePool;

use shutterbox_core::{AppError, User};

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, api_key), fields(db.table = "users", db.operation = "insert"))]
    pub async fn create(&self, username: &str, api_key: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, api_key, created) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(username)
        .bind(api_key)
        .bind(chrono::Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Key lookup on the request path; backed by the unique index.
    #[tracing::instrument(skip(self, api_key), fields(db.table = "users", db.operation = "select"))]
    pub async fn find_by_api_key(&self, api_key: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use shutterbox_core::UniqueKey;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let repo = UserRepository::new(pool);

        let user = repo.create("alice", "sb_abc123").await.unwrap();
        assert!(user.id > 0);

        let found = repo.find_by_api_key("sb_abc123").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.username, "alice");

        assert!(repo.find_by_api_key("sb_wrong").await.unwrap().is_none());
        assert_eq!(repo.get(user.id).await.unwrap().unwrap().username, "alice");
    }

    #[tokio::test]
    async fn test_duplicate_username_is_classified() {
        let dir = tempdir().unwrap();
        let pool = test_pool(dir.path()).await;
        let repo = UserRepository::new(pool);

        repo.create("alice", "sb_one").await.unwrap();
        let err = repo.create("alice", "sb_two").await.unwrap_err();
        assert!(err.is_duplicate(UniqueKey::Username));
    }
}
