//! Shutterbox data access layer.
//!
//! SQLite-backed repositories for users, media records, labels, and resumable
//! upload sessions. Queries are dynamic (no compile-time statement cache) and
//! every media operation is scoped to an owning user.

pub mod db;
pub mod dedup;

pub use db::filter::{FilterField, FilterValue, MediaFilter};
pub use db::{LabelRepository, MediaRepository, UploadSessionRepository, UserRepository};
