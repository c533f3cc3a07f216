//! Processing error types.

use thiserror::Error;

/// Metadata extraction failures. These abort ingestion of the file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Unreadable media file: {0}")]
    Unreadable(#[from] std::io::Error),

    #[error("Unrecognized media structure: {0}")]
    Unrecognized(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("ffprobe failed: {0}")]
    Probe(String),

    #[error("Extraction task failed: {0}")]
    Task(String),
}

/// Thumbnail failures. Ingestion logs these and continues without a preview.
#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("ffmpeg failed: {0}")]
    Convert(String),

    #[error("Image decode failed: {0}")]
    Decode(#[from] image::ImageError),

    #[error("No preview for media type: {0}")]
    Unsupported(String),

    #[error("Thumbnail task failed: {0}")]
    Task(String),
}
