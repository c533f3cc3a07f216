//! Shutterbox API Library
//!
//! This crate provides the HTTP surface over the ingestion pipeline: the
//! one-shot and resumable upload paths, media/label queries, file and
//! thumbnail serving, API-key authentication, and application setup.

pub mod api_doc;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod telemetry;
pub mod utils;

pub use error::{ErrorResponse, HttpAppError};
pub use services::intake::{IngestOutcome, IntakeService};
pub use services::reaper::{ReaperHandle, UploadReaper};
pub use services::transfer::TransferEngine;
