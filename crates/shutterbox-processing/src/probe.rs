//! ffprobe subprocess client.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime, Utc};
use tokio::process::Command;

use crate::error::ExtractionError;

/// Validate that a path doesn't contain shell metacharacters or dangerous sequences
pub(crate) fn validate_path(path: &str) -> Result<(), String> {
    let dangerous_chars = [';', '|', '&', '$', '`', '(', ')', '<', '>', '\n', '\r'];
    if path.chars().any(|c| dangerous_chars.contains(&c)) {
        return Err(format!("Path contains dangerous characters: {path}"));
    }

    if path.contains("..") {
        return Err(format!("Path contains directory traversal: {path}"));
    }

    Ok(())
}

/// Validate and canonicalize a file path to prevent directory traversal
pub(crate) fn validate_and_canonicalize_path(path: &Path) -> Result<PathBuf, String> {
    let path_str = path.to_string_lossy();
    validate_path(&path_str)?;

    path.canonicalize()
        .map_err(|e| format!("Failed to canonicalize path: {e}"))
}

/// Binary paths take a stricter allowlist than media paths.
pub(crate) fn validate_tool_path(tool_path: &str) -> Result<(), String> {
    validate_path(tool_path)?;

    if !tool_path
        .chars()
        .all(|c| c.is_alphanumeric() || c == '/' || c == '-' || c == '_' || c == '.' || c == '\\')
    {
        return Err(format!("Tool path contains unsafe characters: {tool_path}"));
    }

    Ok(())
}

/// What a probe run learned about a media file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub duration: Option<f64>,
    /// Parsed capture-time candidates, one per recognized tag source.
    pub created_candidates: Vec<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct FfprobeClient {
    ffprobe_path: String,
}

impl FfprobeClient {
    pub fn new(ffprobe_path: impl Into<String>) -> Result<Self, ExtractionError> {
        let ffprobe_path = ffprobe_path.into();
        validate_tool_path(&ffprobe_path).map_err(ExtractionError::InvalidPath)?;
        Ok(Self { ffprobe_path })
    }

    /// Run ffprobe over `media_path` and parse its JSON report.
    #[tracing::instrument(skip(self), fields(
        process.executable.path = %self.ffprobe_path,
        ffmpeg.operation = "probe"
    ))]
    pub async fn probe(&self, media_path: &Path) -> Result<ProbeReport, ExtractionError> {
        let start = std::time::Instant::now();

        let validated_path =
            validate_and_canonicalize_path(media_path).map_err(ExtractionError::InvalidPath)?;

        let output = Command::new(&self.ffprobe_path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
                "-select_streams",
                "v:0",
            ])
            .arg(&validated_path)
            .output()
            .await
            .map_err(|e| ExtractionError::Probe(format!("Failed to execute ffprobe: {e}")))?;

        if !output.status.success() {
            return Err(ExtractionError::Probe(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let report_json: serde_json::Value = serde_json::from_slice(&output.stdout)
            .map_err(|e| ExtractionError::Probe(format!("Failed to parse ffprobe output: {e}")))?;

        let report = parse_probe_report(&report_json);
        tracing::info!(
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            width = report.width,
            height = report.height,
            media_duration = report.duration,
            "Media probe completed"
        );

        Ok(report)
    }
}

/// Pull dimensions, duration, and capture-time candidates out of an ffprobe
/// JSON report.
///
/// Candidate order: format-level `creation_time`, stream-level
/// `creation_time`, then the QuickTime device tag. Capture-time resolution
/// takes the earliest, so order only matters for logging.
pub fn parse_probe_report(report: &serde_json::Value) -> ProbeReport {
    let stream = report["streams"].get(0);
    let format = &report["format"];

    let width = stream.and_then(|s| s["width"].as_i64());
    let height = stream.and_then(|s| s["height"].as_i64());

    let duration = format["duration"]
        .as_str()
        .and_then(|d| d.parse::<f64>().ok());

    let mut created_candidates = Vec::new();
    let sources = [
        format["tags"]["creation_time"].as_str(),
        stream.and_then(|s| s["tags"]["creation_time"].as_str()),
        format["tags"]["com.apple.quicktime.creationdate"].as_str(),
    ];
    for candidate in sources.into_iter().flatten() {
        if let Some(parsed) = parse_probe_datetime(candidate) {
            created_candidates.push(parsed);
        }
    }

    ProbeReport {
        width,
        height,
        duration,
        created_candidates,
    }
}

/// Parse the timestamp spellings ffprobe emits.
///
/// Container tags use RFC 3339 (`2023-07-04T12:30:00.000000Z`); QuickTime
/// device tags use a compact offset (`2023-07-04T14:30:00+0200`); some
/// muxers write a bare `2023-07-04 12:30:00`, which is taken as UTC.
pub fn parse_probe_datetime(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(parsed.and_utc());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_report() {
        let report_json = json!({
            "streams": [{
                "width": 1920,
                "height": 1080,
                "tags": { "creation_time": "2023-07-04T12:30:05.000000Z" }
            }],
            "format": {
                "duration": "14.500000",
                "tags": {
                    "creation_time": "2023-07-04T12:30:10.000000Z",
                    "com.apple.quicktime.creationdate": "2023-07-04T14:29:58+0200"
                }
            }
        });

        let report = parse_probe_report(&report_json);
        assert_eq!(report.width, Some(1920));
        assert_eq!(report.height, Some(1080));
        assert_eq!(report.duration, Some(14.5));
        assert_eq!(report.created_candidates.len(), 3);
        // The QuickTime tag resolves to 12:29:58 UTC, the earliest of the three.
        let earliest = report.created_candidates.iter().min().unwrap();
        assert_eq!(earliest.to_rfc3339(), "2023-07-04T12:29:58+00:00");
    }

    #[test]
    fn test_parse_sparse_report() {
        let report_json = json!({
            "streams": [{ "width": 640, "height": 480 }],
            "format": {}
        });

        let report = parse_probe_report(&report_json);
        assert_eq!(report.width, Some(640));
        assert_eq!(report.duration, None);
        assert!(report.created_candidates.is_empty());

        let empty = parse_probe_report(&json!({}));
        assert_eq!(empty, ProbeReport::default());
    }

    #[test]
    fn test_unparseable_candidates_are_skipped() {
        let report_json = json!({
            "streams": [],
            "format": {
                "duration": "not-a-number",
                "tags": { "creation_time": "sometime in july" }
            }
        });

        let report = parse_probe_report(&report_json);
        assert_eq!(report.duration, None);
        assert!(report.created_candidates.is_empty());
    }

    #[test]
    fn test_parse_probe_datetime_formats() {
        assert_eq!(
            parse_probe_datetime("2023-07-04T12:30:00.000000Z")
                .unwrap()
                .to_rfc3339(),
            "2023-07-04T12:30:00+00:00"
        );
        assert_eq!(
            parse_probe_datetime("2023-07-04T14:30:00+0200")
                .unwrap()
                .to_rfc3339(),
            "2023-07-04T12:30:00+00:00"
        );
        assert_eq!(
            parse_probe_datetime("2023-07-04 12:30:00").unwrap().to_rfc3339(),
            "2023-07-04T12:30:00+00:00"
        );
        assert!(parse_probe_datetime("0000-00-00 00:00:00").is_none());
    }

    #[test]
    fn test_path_validation() {
        assert!(validate_path("/data/files/1/abc.mp4").is_ok());
        assert!(validate_path("/data/files/../etc").is_err());
        assert!(validate_path("/tmp/a;rm -rf").is_err());

        assert!(validate_tool_path("/usr/bin/ffprobe").is_ok());
        assert!(validate_tool_path("ffprobe").is_ok());
        assert!(validate_tool_path("ffprobe --help").is_err());
    }
}
