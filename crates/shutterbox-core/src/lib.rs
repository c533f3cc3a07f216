//! Shutterbox Core Library
//!
//! This crate provides the domain models, error taxonomy, and configuration
//! shared across all Shutterbox components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel, UniqueKey};
pub use models::{
    Label, LabelCount, MediaKind, MediaRecord, NewMedia, UploadSession, User,
};
