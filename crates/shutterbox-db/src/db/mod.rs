//! Database repositories for data access layer
//!
//! Each repository owns a connection pool clone and is responsible for one
//! table. Uniqueness conflicts surface as `AppError::ConstraintViolation`
//! through the error conversion in shutterbox-core, so callers can branch on
//! which key collided without parsing driver messages.
//
// Media records and the typed partial filter
pub mod filter;
pub mod media;
//
// Labels attached to media records
pub mod labels;
//
// Resumable upload sessions
pub mod uploads;
//
// Account records and API key lookup
pub mod users;

pub use labels::LabelRepository;
pub use media::MediaRepository;
pub use uploads::UploadSessionRepository;
pub use users::UserRepository;

#[cfg(test)]
pub(crate) mod test_support;
