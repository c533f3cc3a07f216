//! Media analysis and preview generation.
//!
//! Two concerns live here: extracting intrinsic metadata (dimensions,
//! duration, GPS position, capture time) from uploaded photos and videos,
//! and rendering JPEG thumbnails. Plain images are handled in-process with
//! the `image` and `kamadak-exif` crates; HEIC and video go through
//! `ffmpeg`/`ffprobe` subprocesses.

pub mod error;
pub mod extract;
pub mod probe;
pub mod tags;
pub mod thumbnail;

pub use error::{ExtractionError, ThumbnailError};
pub use extract::{MediaExtractor, MediaIntrinsics};
pub use probe::FfprobeClient;
pub use thumbnail::ThumbnailGenerator;
