//! JPEG preview rendering.

use std::io::BufWriter;
use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;

use shutterbox_core::MediaKind;

use crate::error::ThumbnailError;
use crate::probe::{validate_and_canonicalize_path, validate_tool_path};

const JPEG_QUALITY: u8 = 80;

/// Renders fixed-max-dimension JPEG previews.
///
/// Plain images resize in-process. HEIC is first rewrapped as JPEG by
/// ffmpeg, videos contribute a single extracted frame; both intermediates
/// are scratch files that are removed on every path.
#[derive(Clone)]
pub struct ThumbnailGenerator {
    ffmpeg_path: String,
    max_dim: u32,
    frame_position: f64,
}

impl ThumbnailGenerator {
    pub fn new(
        ffmpeg_path: impl Into<String>,
        max_dim: u32,
        frame_position: f64,
    ) -> Result<Self, ThumbnailError> {
        let ffmpeg_path = ffmpeg_path.into();
        validate_tool_path(&ffmpeg_path).map_err(ThumbnailError::InvalidPath)?;
        Ok(Self {
            ffmpeg_path,
            max_dim,
            frame_position,
        })
    }

    /// Render a JPEG preview of `source` into `dest`.
    ///
    /// `duration` positions the extracted frame for videos and is ignored
    /// otherwise.
    #[tracing::instrument(skip(self), fields(mime = %mime_type))]
    pub async fn generate(
        &self,
        source: &Path,
        dest: &Path,
        mime_type: &str,
        duration: Option<f64>,
    ) -> Result<(), ThumbnailError> {
        match MediaKind::from_mime(mime_type) {
            Some(MediaKind::Video) => self.video_preview(source, dest, duration).await,
            Some(MediaKind::Photo) if is_heic_mime(mime_type) => {
                self.heic_preview(source, dest).await
            }
            Some(MediaKind::Photo) => self.image_preview(source, dest).await,
            None => Err(ThumbnailError::Unsupported(mime_type.to_string())),
        }
    }

    async fn image_preview(&self, source: &Path, dest: &Path) -> Result<(), ThumbnailError> {
        let source = source.to_path_buf();
        let dest = dest.to_path_buf();
        let max_dim = self.max_dim;

        tokio::task::spawn_blocking(move || render_jpeg_preview(&source, &dest, max_dim))
            .await
            .map_err(|e| ThumbnailError::Task(e.to_string()))?
    }

    async fn heic_preview(&self, source: &Path, dest: &Path) -> Result<(), ThumbnailError> {
        let source = validate_and_canonicalize_path(source).map_err(ThumbnailError::InvalidPath)?;
        let converted = jpeg_scratch_file("sb-heic-")?;

        self.run_ffmpeg(&convert_args(&source, converted.path()))
            .await?;
        self.image_preview(converted.path(), dest).await
    }

    async fn video_preview(
        &self,
        source: &Path,
        dest: &Path,
        duration: Option<f64>,
    ) -> Result<(), ThumbnailError> {
        let source = validate_and_canonicalize_path(source).map_err(ThumbnailError::InvalidPath)?;
        let offset = duration
            .filter(|d| *d > 0.0)
            .map(|d| d * self.frame_position);

        let frame = jpeg_scratch_file("sb-frame-")?;
        if let Err(err) = self
            .run_ffmpeg(&frame_args(&source, frame.path(), offset))
            .await
        {
            if offset.is_none() {
                return Err(err);
            }
            // A seek past the end of a short clip yields nothing; take the
            // first frame instead.
            tracing::warn!(error = %err, "Frame seek failed, retrying at start");
            self.run_ffmpeg(&frame_args(&source, frame.path(), None))
                .await?;
        }

        self.image_preview(frame.path(), dest).await
    }

    async fn run_ffmpeg(&self, args: &[String]) -> Result<(), ThumbnailError> {
        let output = Command::new(&self.ffmpeg_path)
            .args(args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ThumbnailError::Convert(format!("Failed to execute ffmpeg: {e}")))?;

        if !output.status.success() {
            return Err(ThumbnailError::Convert(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }
        Ok(())
    }
}

fn is_heic_mime(mime_type: &str) -> bool {
    matches!(mime_type, "image/heic" | "image/heif")
}

fn jpeg_scratch_file(prefix: &str) -> Result<tempfile::NamedTempFile, ThumbnailError> {
    Ok(tempfile::Builder::new()
        .prefix(prefix)
        .suffix(".jpg")
        .tempfile()?)
}

/// Decode, scale to fit `max_dim`, and encode as JPEG. Runs on a blocking
/// thread.
fn render_jpeg_preview(source: &Path, dest: &Path, max_dim: u32) -> Result<(), ThumbnailError> {
    let img = image::ImageReader::open(source)?
        .with_guessed_format()?
        .decode()?;
    let preview = img.thumbnail(max_dim, max_dim).to_rgb8();

    let file = std::fs::File::create(dest)?;
    let mut writer = BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
    preview.write_with_encoder(encoder)?;

    Ok(())
}

fn convert_args(source: &Path, dest: &Path) -> Vec<String> {
    vec![
        "-y".to_string(),
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
        "-frames:v".to_string(),
        "1".to_string(),
        dest.to_string_lossy().into_owned(),
    ]
}

fn frame_args(source: &Path, dest: &Path, offset_secs: Option<f64>) -> Vec<String> {
    let mut args = vec!["-y".to_string()];
    // -ss before -i seeks on the demuxer instead of decoding up to the mark.
    if let Some(offset) = offset_secs {
        args.push("-ss".to_string());
        args.push(format!("{offset:.3}"));
    }
    args.extend([
        "-i".to_string(),
        source.to_string_lossy().into_owned(),
        "-frames:v".to_string(),
        "1".to_string(),
        dest.to_string_lossy().into_owned(),
    ]);
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> ThumbnailGenerator {
        ThumbnailGenerator::new("ffmpeg", 300, 2.0 / 3.0).unwrap()
    }

    #[tokio::test]
    async fn test_image_preview_fits_max_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        let dest = dir.path().join("preview");

        let img = image::RgbImage::from_fn(600, 400, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 64])
        });
        img.save_with_format(&source, image::ImageFormat::Png).unwrap();

        generator()
            .generate(&source, &dest, "image/png", None)
            .await
            .unwrap();

        let reader = image::ImageReader::open(&dest)
            .unwrap()
            .with_guessed_format()
            .unwrap();
        assert_eq!(reader.format(), Some(image::ImageFormat::Jpeg));
        let (width, height) = reader.into_dimensions().unwrap();
        assert_eq!((width, height), (300, 200));
    }

    #[tokio::test]
    async fn test_unsupported_mime_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = generator()
            .generate(
                &dir.path().join("a"),
                &dir.path().join("b"),
                "application/pdf",
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ThumbnailError::Unsupported(_)));
    }

    #[test]
    fn test_frame_args_seek_placement() {
        let source = Path::new("/data/in.mp4");
        let dest = Path::new("/tmp/out.jpg");

        let args = frame_args(source, dest, Some(9.6666667));
        assert_eq!(args[0], "-y");
        assert_eq!(args[1], "-ss");
        assert_eq!(args[2], "9.667");
        assert_eq!(args[3], "-i");
        assert_eq!(args[4], "/data/in.mp4");
        assert_eq!(args[args.len() - 1], "/tmp/out.jpg");

        let args = frame_args(source, dest, None);
        assert!(!args.contains(&"-ss".to_string()));
        assert!(args.contains(&"-frames:v".to_string()));
    }

    #[test]
    fn test_tool_path_is_validated() {
        assert!(ThumbnailGenerator::new("ffmpeg; rm -rf /", 300, 0.5).is_err());
        assert!(ThumbnailGenerator::new("/usr/local/bin/ffmpeg", 300, 0.5).is_ok());
    }
}
