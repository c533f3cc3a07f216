//! Single-range `Range` header parsing for file serving.

/// Outcome of parsing a `Range` header against a file of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No (or an ignorable) range header: serve the whole file.
    Full,
    /// Serve `start..=end`.
    Partial { start: u64, end: u64 },
    /// The requested range cannot be satisfied: answer 416.
    Unsatisfiable,
}

/// Parse a `Range` header value.
///
/// Only a single `bytes=` range is honored. Syntactically malformed headers
/// are ignored (the full file is served), per RFC 9110; a well-formed range
/// that lies outside the file is unsatisfiable.
pub fn parse_range(header: Option<&str>, total: u64) -> ByteRange {
    let Some(header) = header else {
        return ByteRange::Full;
    };
    let Some(spec) = header.strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    // Multi-range requests are not supported; serve the whole file.
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((start_str, end_str)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };

    if total == 0 {
        return ByteRange::Unsatisfiable;
    }

    match (start_str.is_empty(), end_str.is_empty()) {
        // "-n": the final n bytes.
        (true, false) => match end_str.parse::<u64>() {
            Ok(0) => ByteRange::Unsatisfiable,
            Ok(suffix) => ByteRange::Partial {
                start: total.saturating_sub(suffix),
                end: total - 1,
            },
            Err(_) => ByteRange::Full,
        },
        // "a-": from a to the end.
        (false, true) => match start_str.parse::<u64>() {
            Ok(start) if start < total => ByteRange::Partial {
                start,
                end: total - 1,
            },
            Ok(_) => ByteRange::Unsatisfiable,
            Err(_) => ByteRange::Full,
        },
        // "a-b" inclusive; b is clamped to the end of the file.
        (false, false) => match (start_str.parse::<u64>(), end_str.parse::<u64>()) {
            (Ok(start), Ok(end)) if start <= end && start < total => ByteRange::Partial {
                start,
                end: end.min(total - 1),
            },
            (Ok(_), Ok(_)) => ByteRange::Unsatisfiable,
            _ => ByteRange::Full,
        },
        (true, true) => ByteRange::Full,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_header_serves_full() {
        assert_eq!(parse_range(None, 100), ByteRange::Full);
        assert_eq!(parse_range(Some("items=0-5"), 100), ByteRange::Full);
    }

    #[test]
    fn test_bounded_range() {
        assert_eq!(
            parse_range(Some("bytes=0-49"), 100),
            ByteRange::Partial { start: 0, end: 49 }
        );
        assert_eq!(
            parse_range(Some("bytes=50-200"), 100),
            ByteRange::Partial { start: 50, end: 99 }
        );
    }

    #[test]
    fn test_open_and_suffix_ranges() {
        assert_eq!(
            parse_range(Some("bytes=90-"), 100),
            ByteRange::Partial { start: 90, end: 99 }
        );
        assert_eq!(
            parse_range(Some("bytes=-10"), 100),
            ByteRange::Partial { start: 90, end: 99 }
        );
        assert_eq!(
            parse_range(Some("bytes=-500"), 100),
            ByteRange::Partial { start: 0, end: 99 }
        );
    }

    #[test]
    fn test_unsatisfiable() {
        assert_eq!(parse_range(Some("bytes=100-"), 100), ByteRange::Unsatisfiable);
        assert_eq!(
            parse_range(Some("bytes=150-200"), 100),
            ByteRange::Unsatisfiable
        );
        assert_eq!(parse_range(Some("bytes=-0"), 100), ByteRange::Unsatisfiable);
        assert_eq!(parse_range(Some("bytes=0-"), 0), ByteRange::Unsatisfiable);
    }

    #[test]
    fn test_malformed_is_ignored() {
        assert_eq!(parse_range(Some("bytes=a-b"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=0-5,10-20"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=-"), 100), ByteRange::Full);
        assert_eq!(parse_range(Some("bytes=5"), 100), ByteRange::Full);
    }
}
