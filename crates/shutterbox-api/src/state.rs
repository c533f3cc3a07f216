//! Shared application state.

use sqlx::SqlitePool;
use std::sync::Arc;

use shutterbox_core::{AppError, Config};
use shutterbox_db::{
    LabelRepository, MediaRepository, UploadSessionRepository, UserRepository,
};
use shutterbox_processing::{FfprobeClient, MediaExtractor, ThumbnailGenerator};
use shutterbox_storage::LocalVault;

use crate::auth::AuthState;
use crate::error::storage_to_app;
use crate::services::intake::IntakeService;
use crate::services::reaper::UploadReaper;
use crate::services::transfer::TransferEngine;

/// Everything handlers need, cloned cheaply behind `Arc` by the router.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pool: SqlitePool,
    pub media: MediaRepository,
    pub labels: LabelRepository,
    pub users: UserRepository,
    pub sessions: UploadSessionRepository,
    pub vault: LocalVault,
    pub intake: IntakeService,
    pub transfers: TransferEngine,
}

impl AppState {
    /// Wire repositories and services from a migrated pool and a config.
    /// Shared between server startup and the test harness.
    pub async fn build(config: Config, pool: SqlitePool) -> Result<Self, AppError> {
        let vault = LocalVault::new(config.data_path.clone())
            .await
            .map_err(storage_to_app)?;

        let media = MediaRepository::new(pool.clone());
        let labels = LabelRepository::new(pool.clone());
        let users = UserRepository::new(pool.clone());
        let sessions = UploadSessionRepository::new(pool.clone());

        let probe = FfprobeClient::new(config.ffprobe_path.clone())
            .map_err(|e| AppError::Validation(format!("Invalid ffprobe path: {e}")))?;
        let extractor = MediaExtractor::new(probe);
        let thumbnails = ThumbnailGenerator::new(
            config.ffmpeg_path.clone(),
            config.thumbnail_max_dim,
            config.thumbnail_frame_position,
        )
        .map_err(|e| AppError::Validation(format!("Invalid ffmpeg path: {e}")))?;

        let intake = IntakeService::new(
            media.clone(),
            vault.clone(),
            extractor,
            thumbnails,
        );
        let transfers = TransferEngine::new(
            sessions.clone(),
            media.clone(),
            vault.clone(),
            intake.clone(),
            config.max_upload_bytes,
        );

        Ok(Self {
            config,
            pool,
            media,
            labels,
            users,
            sessions,
            vault,
            intake,
            transfers,
        })
    }

    pub fn auth_state(&self) -> Arc<AuthState> {
        Arc::new(AuthState {
            users: self.users.clone(),
        })
    }

    pub fn reaper(&self) -> Arc<UploadReaper> {
        Arc::new(UploadReaper::new(
            self.sessions.clone(),
            self.vault.clone(),
            self.config.upload_expiration_secs,
            self.config.reaper_interval_secs,
        ))
    }
}
