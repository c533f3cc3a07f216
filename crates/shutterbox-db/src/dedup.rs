//! Filename deduplication.
//!
//! Uploads keep their client-supplied filename, but `(user_id, filename)` is
//! unique. When a name is taken, a parenthetical counter is appended before
//! the extension: `photo.jpg`, `photo (1).jpg`, `photo (2).jpg`. The store
//! is re-queried after every rewrite; the insert's unique constraint stays
//! authoritative for races, and callers retry through [`uniquify`] when a
//! concurrent upload takes the name first.

use std::sync::OnceLock;

use regex::Regex;

use shutterbox_core::AppError;

use crate::db::media::MediaRepository;

fn counter_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\s?\((\d+)\)$").expect("counter suffix pattern"))
}

/// Split a filename into stem and extension at the last dot. Leading-dot
/// names like `.hidden` count as extensionless.
pub fn split_filename(filename: &str) -> (&str, Option<&str>) {
    match filename.rfind('.') {
        Some(idx) if idx > 0 => (&filename[..idx], Some(&filename[idx + 1..])),
        _ => (filename, None),
    }
}

/// Next candidate for a taken name: appends ` (1)` before the extension, or
/// increments an existing parenthetical counter.
pub fn next_candidate(filename: &str) -> String {
    let (stem, ext) = split_filename(filename);

    let bumped = counter_pattern().captures(stem).and_then(|caps| {
        let whole = caps.get(0)?;
        let count: u64 = caps.get(1)?.as_str().parse().ok()?;
        let next = count.checked_add(1)?;
        Some(format!("{} ({next})", &stem[..whole.start()]))
    });
    let next_stem = bumped.unwrap_or_else(|| format!("{stem} (1)"));

    match ext {
        Some(ext) => format!("{next_stem}.{ext}"),
        None => next_stem,
    }
}

/// Find a free filename for `user_id`, starting from `desired`.
pub async fn uniquify(
    repo: &MediaRepository,
    user_id: i64,
    desired: &str,
) -> Result<String, AppError> {
    let mut candidate = desired.to_string();
    while repo.filename_exists(user_id, &candidate).await? {
        candidate = next_candidate(&candidate);
    }

    if candidate != desired {
        tracing::debug!(desired, chosen = %candidate, "Filename taken, deduplicated");
    }
    Ok(candidate)
}
