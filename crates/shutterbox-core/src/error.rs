//! Error types module
//!
//! All failures are unified under the `AppError` enum: database, storage,
//! validation, extraction, and constraint errors. Repositories convert
//! `sqlx::Error` through the `From` impl below, which recognizes unique
//! constraint violations and classifies them by the violated key so that
//! callers can treat "duplicate item_id" and "duplicate filename" as
//! recoverable signals instead of opaque database failures.

use std::io;

use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like duplicate submissions
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Which uniqueness rule a constraint violation tripped.
///
/// SQLite reports violations as `UNIQUE constraint failed: table.column`,
/// so classification works on the column list in the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueKey {
    /// `(user_id, item_id)` - the idempotency key for retried uploads
    ItemId,
    /// `(user_id, filename)` - the display-name dedup backstop
    Filename,
    /// `(user_id, filekey)` - the on-disk identity
    Filekey,
    /// `users.username`
    Username,
    /// `users.api_key`
    ApiKey,
    /// A unique index this application does not special-case
    Other,
}

impl std::fmt::Display for UniqueKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UniqueKey::ItemId => "item_id",
            UniqueKey::Filename => "filename",
            UniqueKey::Filekey => "filekey",
            UniqueKey::Username => "username",
            UniqueKey::ApiKey => "api_key",
            UniqueKey::Other => "unique key",
        };
        f.write_str(name)
    }
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Metadata extraction failed: {message}")]
    Extraction {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Duplicate {0}")]
    ConstraintViolation(UniqueKey),

    #[error("Storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Map SQLite's unique-violation message to the key it names.
fn classify_unique_violation(message: &str) -> UniqueKey {
    if message.contains("media.item_id") {
        UniqueKey::ItemId
    } else if message.contains("media.filename") {
        UniqueKey::Filename
    } else if message.contains("media.filekey") {
        UniqueKey::Filekey
    } else if message.contains("users.username") {
        UniqueKey::Username
    } else if message.contains("users.api_key") {
        UniqueKey::ApiKey
    } else {
        UniqueKey::Other
    }
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::ConstraintViolation(classify_unique_violation(db_err.message()));
            }
        }
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in the ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::InvalidQuery(_) => (
            400,
            "INVALID_QUERY",
            false,
            Some("Check filter fields and value types"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::Unauthorized(_) => (
            401,
            "UNAUTHORIZED",
            false,
            Some("Check the API key"),
            false,
            LogLevel::Debug,
        ),
        AppError::PayloadTooLarge(_) => (
            413,
            "PAYLOAD_TOO_LARGE",
            false,
            Some("Reduce file size or use the resumable upload path"),
            false,
            LogLevel::Debug,
        ),
        AppError::Extraction { .. } => (
            422,
            "EXTRACTION_ERROR",
            false,
            Some("Check that the file is a readable photo or video"),
            false,
            LogLevel::Warn,
        ),
        AppError::Conflict(_) => (
            409,
            "CONFLICT",
            true,
            Some("Check the current state and retry"),
            false,
            LogLevel::Debug,
        ),
        AppError::ConstraintViolation(_) => (
            409,
            "CONSTRAINT_VIOLATION",
            false,
            Some("The resource already exists"),
            false,
            LogLevel::Warn,
        ),
        AppError::Storage { .. } => (
            500,
            "STORAGE_IO_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Validation(_) => "Validation",
            AppError::InvalidQuery(_) => "InvalidQuery",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Extraction { .. } => "Extraction",
            AppError::Conflict(_) => "Conflict",
            AppError::ConstraintViolation(_) => "ConstraintViolation",
            AppError::Storage { .. } => "Storage",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// True when this error is a unique-constraint violation of the given key.
    pub fn is_duplicate(&self, key: UniqueKey) -> bool {
        matches!(self, AppError::ConstraintViolation(k) if *k == key)
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Validation(ref msg) => msg.clone(),
            AppError::InvalidQuery(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => format!("Unauthorized: {}", msg),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Extraction { ref message, .. } => message.clone(),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::ConstraintViolation(key) => format!("Duplicate {}", key),
            AppError::Storage { .. } => "Failed to access storage".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_database() {
        let err = AppError::from(sqlx::Error::PoolClosed);
        assert_eq!(err.http_status_code(), 500);
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_recoverable());
        assert_eq!(err.client_message(), "Failed to access database");
        assert!(err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("Resource not found".to_string());
        assert_eq!(err.http_status_code(), 404);
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert!(!err.is_recoverable());
        assert_eq!(err.client_message(), "Resource not found");
        assert!(!err.is_sensitive());
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_error_metadata_extraction() {
        let err = AppError::Extraction {
            message: "unreadable media".to_string(),
            source: anyhow::anyhow!("decode failed"),
        };
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.error_code(), "EXTRACTION_ERROR");
        assert_eq!(err.client_message(), "unreadable media");
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_classify_unique_violation_columns() {
        assert_eq!(
            classify_unique_violation("UNIQUE constraint failed: media.user_id, media.item_id"),
            UniqueKey::ItemId
        );
        assert_eq!(
            classify_unique_violation("UNIQUE constraint failed: media.user_id, media.filename"),
            UniqueKey::Filename
        );
        assert_eq!(
            classify_unique_violation("UNIQUE constraint failed: media.user_id, media.filekey"),
            UniqueKey::Filekey
        );
        assert_eq!(
            classify_unique_violation("UNIQUE constraint failed: users.username"),
            UniqueKey::Username
        );
        assert_eq!(
            classify_unique_violation("UNIQUE constraint failed: sessions.token"),
            UniqueKey::Other
        );
    }

    #[test]
    fn test_error_metadata_conflict() {
        let err = AppError::Conflict("offset mismatch".to_string());
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.error_code(), "CONFLICT");
        assert_eq!(err.client_message(), "offset mismatch");
        assert!(!err.is_sensitive());
    }

    #[test]
    fn test_is_duplicate() {
        let err = AppError::ConstraintViolation(UniqueKey::ItemId);
        assert!(err.is_duplicate(UniqueKey::ItemId));
        assert!(!err.is_duplicate(UniqueKey::Filename));
        assert!(!AppError::Internal("x".into()).is_duplicate(UniqueKey::ItemId));
    }

    #[test]
    fn test_detailed_message_includes_chain() {
        let source = anyhow::anyhow!("root cause");
        let err = AppError::InternalWithSource {
            message: "wrapper".to_string(),
            source,
        };
        let details = err.detailed_message();
        assert!(details.contains("Caused by: root cause"));
    }
}
