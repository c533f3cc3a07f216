//! Shared helpers for repository tests.

use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use shutterbox_core::User;

use super::users::UserRepository;

pub(crate) async fn test_pool(dir: &Path) -> SqlitePool {
    let options = SqliteConnectOptions::new()
        .filename(dir.join("test.db"))
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .unwrap();

    let migrations = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    sqlx::migrate::Migrator::new(migrations)
        .await
        .unwrap()
        .run(&pool)
        .await
        .unwrap();

    pool
}

pub(crate) async fn seed_user(pool: &SqlitePool, username: &str) -> User {
    UserRepository::new(pool.clone())
        .create(username, &format!("sb_test_{username}"))
        .await
        .unwrap()
}
