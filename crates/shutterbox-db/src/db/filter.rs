//! Typed partial filter over media columns.
//!
//! Query parameters arrive as loosely typed JSON. This module narrows them to
//! a fixed field set with typed values before any SQL is assembled, so user
//! input never reaches the query text. Values bind as parameters; only column
//! names from [`FilterField::column`] are interpolated.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Sqlite};

use shutterbox_core::AppError;

/// Media columns that may appear in a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    Id,
    UserId,
    Filekey,
    Filename,
    Filesize,
    MimeType,
    ItemId,
    Width,
    Height,
    Duration,
    Altitude,
    Latitude,
    Longitude,
    Created,
    Uploaded,
}

impl FilterField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "id" => Some(Self::Id),
            "user_id" => Some(Self::UserId),
            "filekey" => Some(Self::Filekey),
            "filename" => Some(Self::Filename),
            "filesize" => Some(Self::Filesize),
            "mime_type" => Some(Self::MimeType),
            "item_id" => Some(Self::ItemId),
            "width" => Some(Self::Width),
            "height" => Some(Self::Height),
            "duration" => Some(Self::Duration),
            "altitude" => Some(Self::Altitude),
            "latitude" => Some(Self::Latitude),
            "longitude" => Some(Self::Longitude),
            "created" => Some(Self::Created),
            "uploaded" => Some(Self::Uploaded),
            _ => None,
        }
    }

    pub fn column(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::UserId => "user_id",
            Self::Filekey => "filekey",
            Self::Filename => "filename",
            Self::Filesize => "filesize",
            Self::MimeType => "mime_type",
            Self::ItemId => "item_id",
            Self::Width => "width",
            Self::Height => "height",
            Self::Duration => "duration",
            Self::Altitude => "altitude",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::Created => "created",
            Self::Uploaded => "uploaded",
        }
    }

    fn is_timestamp(&self) -> bool {
        matches!(self, Self::Created | Self::Uploaded)
    }
}

/// A single typed comparison value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Int(i64),
    Real(f64),
    Timestamp(DateTime<Utc>),
    Null,
}

/// Conjunction of equality clauses over media columns.
///
/// An empty filter matches everything for the scoped user. No ordering is
/// implied; callers that need a stable order must sort or use a dedicated
/// repository query.
#[derive(Debug, Clone, Default)]
pub struct MediaFilter {
    clauses: Vec<(FilterField, FilterValue)>,
}

impl MediaFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: FilterField, value: FilterValue) -> Self {
        self.clauses.push((field, value));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(FilterField, FilterValue)] {
        &self.clauses
    }

    /// Build a filter from decoded JSON query parameters.
    ///
    /// Unknown fields and bool, array, or object values are rejected.
    /// Timestamp columns take RFC 3339 strings. The `id` field is special:
    /// anything that is not a non-negative integer acts as an unset sentinel
    /// and drops the clause, since clients pass `-1` for "no id filter".
    pub fn from_map(map: &serde_json::Map<String, Value>) -> Result<Self, AppError> {
        let mut filter = Self::new();

        for (name, value) in map {
            let field = FilterField::from_name(name)
                .ok_or_else(|| AppError::InvalidQuery(format!("Unknown field: {name}")))?;

            let typed = match value {
                Value::Bool(_) | Value::Array(_) | Value::Object(_) => {
                    return Err(AppError::InvalidQuery(format!(
                        "Unsupported value for field: {name}"
                    )));
                }
                _ if field == FilterField::Id => {
                    if let Some(id) = value.as_i64().filter(|id| *id >= 0) {
                        filter.clauses.push((field, FilterValue::Int(id)));
                    }
                    continue;
                }
                Value::Null => FilterValue::Null,
                Value::String(text) if field.is_timestamp() => {
                    let parsed = DateTime::parse_from_rfc3339(text).map_err(|_| {
                        AppError::InvalidQuery(format!("Invalid timestamp for field: {name}"))
                    })?;
                    FilterValue::Timestamp(parsed.with_timezone(&Utc))
                }
                Value::String(text) => FilterValue::Text(text.clone()),
                Value::Number(num) => match (num.as_i64(), num.as_f64()) {
                    (Some(int), _) => FilterValue::Int(int),
                    (None, Some(real)) => FilterValue::Real(real),
                    (None, None) => {
                        return Err(AppError::InvalidQuery(format!(
                            "Unsupported value for field: {name} ({num})"
                        )));
                    }
                },
            };

            filter.clauses.push((field, typed));
        }

        Ok(filter)
    }

    /// Append `AND column = value` clauses to a query already scoped by user.
    pub(crate) fn apply(&self, qb: &mut QueryBuilder<'_, Sqlite>) {
        for (field, value) in &self.clauses {
            qb.push(" AND ");
            qb.push(field.column());
            match value {
                FilterValue::Null => {
                    qb.push(" IS NULL");
                }
                FilterValue::Text(text) => {
                    qb.push(" = ");
                    qb.push_bind(text.clone());
                }
                FilterValue::Int(int) => {
                    qb.push(" = ");
                    qb.push_bind(*int);
                }
                FilterValue::Real(real) => {
                    qb.push(" = ");
                    qb.push_bind(*real);
                }
                FilterValue::Timestamp(ts) => {
                    qb.push(" = ");
                    qb.push_bind(*ts);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> serde_json::Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_from_map_typed_values() {
        let filter = MediaFilter::from_map(&map(json!({
            "filename": "sunset.jpg",
            "width": 1920,
            "duration": 12.5,
            "item_id": null,
        })))
        .unwrap();

        assert_eq!(filter.clauses().len(), 4);
        assert!(filter
            .clauses()
            .contains(&(FilterField::Filename, FilterValue::Text("sunset.jpg".into()))));
        assert!(filter
            .clauses()
            .contains(&(FilterField::Width, FilterValue::Int(1920))));
        assert!(filter
            .clauses()
            .contains(&(FilterField::Duration, FilterValue::Real(12.5))));
        assert!(filter
            .clauses()
            .contains(&(FilterField::ItemId, FilterValue::Null)));
    }

    #[test]
    fn test_from_map_rejects_unknown_field() {
        let err = MediaFilter::from_map(&map(json!({"owner": 1}))).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery(_)));
    }

    #[test]
    fn test_from_map_rejects_structured_values() {
        for value in [json!({"width": true}), json!({"width": [1]}), json!({"width": {"eq": 1}})] {
            let err = MediaFilter::from_map(&map(value)).unwrap_err();
            assert!(matches!(err, AppError::InvalidQuery(_)));
        }
    }

    #[test]
    fn test_id_sentinel_is_dropped() {
        let filter = MediaFilter::from_map(&map(json!({"id": -1, "filename": "a.png"}))).unwrap();
        assert_eq!(filter.clauses().len(), 1);
        assert_eq!(filter.clauses()[0].0, FilterField::Filename);

        let filter = MediaFilter::from_map(&map(json!({"id": 42}))).unwrap();
        assert_eq!(filter.clauses(), &[(FilterField::Id, FilterValue::Int(42))]);

        // Anything that is not a non-negative integer counts as unset.
        for value in [json!({"id": "7"}), json!({"id": 1.5}), json!({"id": null})] {
            let filter = MediaFilter::from_map(&map(value)).unwrap();
            assert!(filter.is_empty());
        }

        // The structured-value rule still applies to id.
        assert!(MediaFilter::from_map(&map(json!({"id": [1]}))).is_err());
    }

    #[test]
    fn test_timestamp_parsing() {
        let filter =
            MediaFilter::from_map(&map(json!({"created": "2024-06-01T12:00:00Z"}))).unwrap();
        match &filter.clauses()[0] {
            (FilterField::Created, FilterValue::Timestamp(ts)) => {
                assert_eq!(ts.to_rfc3339(), "2024-06-01T12:00:00+00:00");
            }
            other => panic!("unexpected clause {other:?}"),
        }

        let err = MediaFilter::from_map(&map(json!({"created": "June 1st"}))).unwrap_err();
        assert!(matches!(err, AppError::InvalidQuery(_)));
    }

    #[test]
    fn test_apply_builds_parameterized_sql() {
        let filter = MediaFilter::new()
            .with(FilterField::Filename, FilterValue::Text("a.png".into()))
            .with(FilterField::ItemId, FilterValue::Null)
            .with(FilterField::Width, FilterValue::Int(640));

        let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM media WHERE user_id = ");
        qb.push_bind(1i64);
        filter.apply(&mut qb);

        let sql = qb.sql();
        assert!(sql.contains("AND filename = "));
        assert!(sql.contains("AND item_id IS NULL"));
        assert!(sql.contains("AND width = "));
        assert!(!sql.contains("a.png"));
    }
}
