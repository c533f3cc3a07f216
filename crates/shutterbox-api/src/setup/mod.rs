//! Application initialization, extracted from main.rs.

pub mod database;
pub mod routes;
pub mod server;

use anyhow::{Context, Result};
use std::sync::Arc;

use shutterbox_core::Config;

use crate::state::AppState;

/// Wire the whole application: config validation, database, state, routes.
/// Telemetry is initialized by the binary before this runs.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    config
        .validate()
        .context("Configuration validation failed")?;

    let pool = database::setup_database(&config).await?;
    let state = Arc::new(
        AppState::build(config, pool)
            .await
            .context("Failed to build application state")?,
    );
    let router = routes::setup_routes(state.clone());

    Ok((state, router))
}
