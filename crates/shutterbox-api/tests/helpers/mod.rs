//! Test helpers: isolated app instance over a temp directory.
//!
//! Run with `cargo test -p shutterbox-api`. Each test gets its own SQLite
//! file and vault root inside a tempdir, so tests never share state.

pub mod fixtures;

use axum_test::TestServer;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::sync::Arc;
use tempfile::TempDir;

use shutterbox_api::auth::generate_api_key;
use shutterbox_api::setup::routes::setup_routes;
use shutterbox_api::state::AppState;
use shutterbox_core::{Config, User};

pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub pool: SqlitePool,
    pub user: User,
    pub api_key: String,
    _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    /// Another account, for ownership-isolation tests.
    pub async fn create_user(&self, username: &str) -> (User, String) {
        let api_key = generate_api_key();
        let user = self
            .state
            .users
            .create(username, &api_key)
            .await
            .expect("Failed to create user");
        (user, api_key)
    }
}

fn test_config(data_path: &std::path::Path) -> Config {
    Config {
        server_port: 0,
        environment: "testing".to_string(),
        data_path: data_path.to_string_lossy().into_owned(),
        database_url: String::new(),
        db_max_connections: 5,
        max_upload_bytes: 50 * 1024 * 1024,
        thumbnail_max_dim: 300,
        thumbnail_frame_position: 2.0 / 3.0,
        upload_expiration_secs: 48 * 3600,
        reaper_interval_secs: 3600,
        ffmpeg_path: "ffmpeg".to_string(),
        ffprobe_path: "ffprobe".to_string(),
    }
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let db_path = temp_dir.path().join("shutterbox-test.db");
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open test database");

    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let config = test_config(&temp_dir.path().join("data"));
    let state = Arc::new(
        AppState::build(config, pool.clone())
            .await
            .expect("Failed to build state"),
    );

    let api_key = generate_api_key();
    let user = state
        .users
        .create("tester", &api_key)
        .await
        .expect("Failed to seed user");

    let server = TestServer::new(setup_routes(state.clone())).expect("Failed to start test server");

    TestApp {
        server,
        state,
        pool,
        user,
        api_key,
        _temp_dir: temp_dir,
    }
}
