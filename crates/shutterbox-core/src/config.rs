//! Application configuration loaded from the environment.

use std::env;

use anyhow::Context;

const DEFAULT_PORT: u16 = 4000;
const DEFAULT_DATA_PATH: &str = "./data";
const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024 * 1024;
const DEFAULT_THUMBNAIL_MAX_DIM: u32 = 300;
const DEFAULT_THUMBNAIL_FRAME_POSITION: f64 = 2.0 / 3.0;
const DEFAULT_UPLOAD_EXPIRATION_SECS: u64 = 48 * 60 * 60;
const DEFAULT_REAPER_INTERVAL_SECS: u64 = 60 * 60;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub data_path: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub max_upload_bytes: u64,
    pub thumbnail_max_dim: u32,
    pub thumbnail_frame_position: f64,
    pub upload_expiration_secs: u64,
    pub reaper_interval_secs: u64,
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env if present; real env vars win.
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        // The test environment gets its own data root so a local run never
        // mixes fixtures into real media (original layout convention).
        let data_path = {
            let base = env::var("DATA_PATH").unwrap_or_else(|_| DEFAULT_DATA_PATH.to_string());
            if environment == "testing" {
                format!("{}.testing", base.trim_end_matches('/'))
            } else {
                base
            }
        };

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| format!("sqlite://{}/shutterbox.db", data_path));

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            environment,
            data_path,
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DEFAULT_DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_UPLOAD_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            thumbnail_max_dim: env::var("THUMBNAIL_MAX_DIM")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_MAX_DIM.to_string())
                .parse()
                .unwrap_or(DEFAULT_THUMBNAIL_MAX_DIM),
            thumbnail_frame_position: env::var("THUMBNAIL_FRAME_POSITION")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_FRAME_POSITION.to_string())
                .parse()
                .unwrap_or(DEFAULT_THUMBNAIL_FRAME_POSITION),
            upload_expiration_secs: env::var("UPLOAD_EXPIRATION_SECS")
                .unwrap_or_else(|_| DEFAULT_UPLOAD_EXPIRATION_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_UPLOAD_EXPIRATION_SECS),
            reaper_interval_secs: env::var("REAPER_INTERVAL_SECS")
                .unwrap_or_else(|_| DEFAULT_REAPER_INTERVAL_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_REAPER_INTERVAL_SECS),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server_port == 0 {
            anyhow::bail!("PORT must be non-zero");
        }
        if self.max_upload_bytes == 0 {
            anyhow::bail!("MAX_UPLOAD_BYTES must be non-zero");
        }
        if self.thumbnail_max_dim == 0 {
            anyhow::bail!("THUMBNAIL_MAX_DIM must be non-zero");
        }
        if self.thumbnail_frame_position <= 0.0 || self.thumbnail_frame_position > 1.0 {
            anyhow::bail!("THUMBNAIL_FRAME_POSITION must be in (0, 1]");
        }
        if self.upload_expiration_secs == 0 {
            anyhow::bail!("UPLOAD_EXPIRATION_SECS must be non-zero");
        }
        if self.reaper_interval_secs == 0 {
            anyhow::bail!("REAPER_INTERVAL_SECS must be non-zero");
        }
        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server_port
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn data_path(&self) -> &str {
        &self.data_path
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.db_max_connections
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    pub fn thumbnail_max_dim(&self) -> u32 {
        self.thumbnail_max_dim
    }

    pub fn thumbnail_frame_position(&self) -> f64 {
        self.thumbnail_frame_position
    }

    pub fn upload_expiration_secs(&self) -> u64 {
        self.upload_expiration_secs
    }

    pub fn reaper_interval_secs(&self) -> u64 {
        self.reaper_interval_secs
    }

    pub fn ffmpeg_path(&self) -> &str {
        &self.ffmpeg_path
    }

    pub fn ffprobe_path(&self) -> &str {
        &self.ffprobe_path
    }
}
