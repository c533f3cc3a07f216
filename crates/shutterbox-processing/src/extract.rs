//! Intrinsic metadata extraction.

use std::path::Path;

use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use shutterbox_core::MediaKind;

use crate::error::ExtractionError;
use crate::probe::FfprobeClient;
use crate::tags::read_exif_fields;

/// Intrinsic properties of a stored media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaIntrinsics {
    pub mime_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    pub created: Option<DateTime<Utc>>,
}

/// HEIC/HEIF brand strings inside the `ftyp` box.
const HEIC_BRANDS: [&[u8; 4]; 6] = [b"heic", b"heix", b"hevc", b"heif", b"mif1", b"msf1"];

/// The `image` crate cannot decode HEIC; those files take the probe path.
pub fn is_heic(head: &[u8]) -> bool {
    head.len() >= 12
        && head[4..8] == *b"ftyp"
        && HEIC_BRANDS.iter().any(|brand| head[8..12] == **brand)
}

/// Earliest of the valid capture-time candidates. This is "minimum valid",
/// not "first present": a later-listed source with an earlier timestamp wins.
pub fn earliest(candidates: impl IntoIterator<Item = DateTime<Utc>>) -> Option<DateTime<Utc>> {
    candidates.into_iter().min()
}

#[derive(Clone)]
pub struct MediaExtractor {
    probe: FfprobeClient,
}

impl MediaExtractor {
    pub fn new(probe: FfprobeClient) -> Self {
        Self { probe }
    }

    /// Extract intrinsic metadata from `path`.
    ///
    /// `declared_mime` is the client's claim. Images report the mime type of
    /// the sniffed container instead; files with no recognizable media
    /// structure fail.
    #[tracing::instrument(skip(self), fields(mime = %declared_mime))]
    pub async fn extract(
        &self,
        path: &Path,
        declared_mime: &str,
    ) -> Result<MediaIntrinsics, ExtractionError> {
        let head = read_head(path).await?;

        if is_heic(&head) {
            let report = self.probe.probe(path).await?;
            return Ok(MediaIntrinsics {
                mime_type: "image/heic".to_string(),
                width: report.width,
                height: report.height,
                created: earliest(report.created_candidates),
                ..Default::default()
            });
        }

        if let Ok(format) = image::guess_format(&head) {
            return self.extract_image(path, format).await;
        }

        // Videos and anything else the image crate cannot identify: ffprobe
        // decides whether there is media structure at all.
        let report = self.probe.probe(path).await?;
        let duration = match MediaKind::from_mime(declared_mime) {
            Some(MediaKind::Video) => report.duration,
            _ => None,
        };

        Ok(MediaIntrinsics {
            mime_type: declared_mime.to_string(),
            width: report.width,
            height: report.height,
            duration,
            created: earliest(report.created_candidates),
            ..Default::default()
        })
    }

    async fn extract_image(
        &self,
        path: &Path,
        format: image::ImageFormat,
    ) -> Result<MediaIntrinsics, ExtractionError> {
        let owned = path.to_path_buf();

        let (dimensions, exif_fields) = tokio::task::spawn_blocking(move || {
            // Dimensions come from the header without a full decode.
            let dimensions = image::ImageReader::open(&owned)
                .and_then(|reader| reader.with_guessed_format())
                .map_err(ExtractionError::Unreadable)
                .and_then(|reader| {
                    reader
                        .into_dimensions()
                        .map_err(|e| ExtractionError::Unrecognized(e.to_string()))
                });
            let exif_fields = read_exif_fields(&owned);
            (dimensions, exif_fields)
        })
        .await
        .map_err(|e| ExtractionError::Task(e.to_string()))?;

        let (width, height) = dimensions?;

        Ok(MediaIntrinsics {
            mime_type: format.to_mime_type().to_string(),
            width: Some(width as i64),
            height: Some(height as i64),
            latitude: exif_fields.latitude,
            longitude: exif_fields.longitude,
            altitude: exif_fields.altitude,
            created: earliest(exif_fields.created_candidates),
            ..Default::default()
        })
    }
}

async fn read_head(path: &Path) -> Result<Vec<u8>, ExtractionError> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut head = vec![0u8; 32];
    let n = file.read(&mut head).await?;
    head.truncate(n);
    Ok(head)
}
