//! Filesystem vault for Shutterbox.
//!
//! All media lives under a single data root:
//!
//! - `files/{user_id}/{filekey}` — stored media
//! - `files/{user_id}/thumbnails/{filekey}` — generated previews
//! - `temp/{name}` — staged one-shot uploads and resumable transfers
//!
//! Filekeys and temp names are single path segments. Separators and `..` are
//! rejected, so every resolved path stays inside the vault root.

pub mod vault;

pub use vault::{LocalVault, StorageError, StorageResult};
