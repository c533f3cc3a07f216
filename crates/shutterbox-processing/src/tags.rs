//! EXIF tag extraction for images.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use exif::{In, Tag, Value};

/// Position and capture-time fields pulled from an EXIF segment.
#[derive(Debug, Clone, Default)]
pub struct ExifFields {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<f64>,
    /// Parsed capture-time candidates, one per recognized tag source.
    pub created_candidates: Vec<DateTime<Utc>>,
}

/// Read EXIF fields from an image file.
///
/// Files without an EXIF segment, or with one that fails to parse, yield
/// empty fields rather than an error; many valid uploads carry no EXIF.
pub fn read_exif_fields(path: &Path) -> ExifFields {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return ExifFields::default(),
    };
    let mut reader = BufReader::new(file);
    match exif::Reader::new().read_from_container(&mut reader) {
        Ok(exif_data) => fields_from(&exif_data),
        Err(_) => ExifFields::default(),
    }
}

fn fields_from(exif_data: &exif::Exif) -> ExifFields {
    let mut fields = ExifFields::default();

    // Distinct tag sources; resolution picks the earliest valid one later.
    for tag in [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime] {
        if let Some(parsed) = ascii_value(exif_data, tag).and_then(|s| parse_exif_datetime(&s)) {
            fields.created_candidates.push(parsed);
        }
    }

    if let Some((latitude, longitude)) = read_position(exif_data) {
        fields.latitude = Some(latitude);
        fields.longitude = Some(longitude);
    }
    fields.altitude = read_altitude(exif_data);

    fields
}

fn read_position(exif_data: &exif::Exif) -> Option<(f64, f64)> {
    let mut latitude = dms_to_decimal(&rationals(exif_data, Tag::GPSLatitude)?)?;
    let mut longitude = dms_to_decimal(&rationals(exif_data, Tag::GPSLongitude)?)?;

    if ref_contains(exif_data, Tag::GPSLatitudeRef, 'S') {
        latitude = -latitude;
    }
    if ref_contains(exif_data, Tag::GPSLongitudeRef, 'W') {
        longitude = -longitude;
    }

    Some((latitude, longitude))
}

fn read_altitude(exif_data: &exif::Exif) -> Option<f64> {
    let parts = rationals(exif_data, Tag::GPSAltitude)?;
    let raw = parts.first()?.to_f64();

    // GPSAltitudeRef byte 1 marks below sea level.
    let below_sea = matches!(
        exif_data
            .get_field(Tag::GPSAltitudeRef, In::PRIMARY)
            .map(|f| &f.value),
        Some(Value::Byte(v)) if v.first() == Some(&1)
    );

    Some(if below_sea { -raw } else { raw })
}

fn ascii_value(exif_data: &exif::Exif, tag: Tag) -> Option<String> {
    let field = exif_data.get_field(tag, In::PRIMARY)?;
    match &field.value {
        Value::Ascii(items) if !items.is_empty() => {
            std::str::from_utf8(&items[0]).ok().map(|s| s.to_string())
        }
        _ => None,
    }
}

fn rationals(exif_data: &exif::Exif, tag: Tag) -> Option<Vec<exif::Rational>> {
    match &exif_data.get_field(tag, In::PRIMARY)?.value {
        Value::Rational(parts) => Some(parts.clone()),
        _ => None,
    }
}

fn ref_contains(exif_data: &exif::Exif, tag: Tag, hemisphere: char) -> bool {
    exif_data
        .get_field(tag, In::PRIMARY)
        .map(|f| f.display_value().to_string().contains(hemisphere))
        .unwrap_or(false)
}

/// Degrees, minutes, seconds to decimal degrees.
pub fn dms_to_decimal(parts: &[exif::Rational]) -> Option<f64> {
    if parts.len() < 3 {
        return None;
    }
    Some(parts[0].to_f64() + parts[1].to_f64() / 60.0 + parts[2].to_f64() / 3600.0)
}

/// EXIF datetime strings are colon-separated: `2023:07:04 12:30:00`, with no
/// zone. Zeroed placeholder values fail the parse and are discarded.
pub fn parse_exif_datetime(value: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(value.trim(), "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
