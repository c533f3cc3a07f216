//! Data models for the application
//!
//! One sub-module per domain entity; everything re-exported for convenient
//! imports.

mod label;
mod media;
mod upload;
mod user;

pub use label::{Label, LabelCount};
pub use media::{MediaKind, MediaRecord, NewMedia};
pub use upload::UploadSession;
pub use user::User;
