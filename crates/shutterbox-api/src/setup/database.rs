//! Database pool setup and migrations.

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use shutterbox_core::Config;

/// Open the SQLite pool and run pending migrations.
pub async fn setup_database(config: &Config) -> Result<SqlitePool> {
    tracing::info!(url = %config.database_url(), "Connecting to database");

    let options = SqliteConnectOptions::from_str(config.database_url())
        .context("Invalid database URL")?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(config.db_max_connections())
        .connect_with(options)
        .await
        .context("Failed to connect to database")?;

    run_migrations(&pool).await?;

    tracing::info!(
        max_connections = config.db_max_connections(),
        "Database ready"
    );

    Ok(pool)
}

/// Apply the workspace migrations directory. Shared with the test harness.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let migrations_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../migrations");
    let migrator = sqlx::migrate::Migrator::new(migrations_dir)
        .await
        .context("Failed to load migrations")?;
    migrator
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");
    Ok(())
}
