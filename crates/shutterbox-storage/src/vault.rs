//! Local filesystem vault implementation.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

const FILES_DIR: &str = "files";
const TEMP_DIR: &str = "temp";
const THUMBNAILS_DIR: &str = "thumbnails";

/// Vault rooted at a single data directory.
///
/// Stored media is laid out per user under `files/`, with generated previews
/// in a `thumbnails/` subdirectory. In-flight uploads are staged under `temp/`
/// and moved into place once complete.
#[derive(Debug, Clone)]
pub struct LocalVault {
    root: PathBuf,
}

impl LocalVault {
    /// Open a vault at `root`, creating the `files/` and `temp/` directories.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.join(FILES_DIR)).await?;
        fs::create_dir_all(root.join(TEMP_DIR)).await?;
        tracing::info!(root = %root.display(), "Local vault initialized");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generate a fresh filekey for stored media.
    pub fn generate_filekey() -> String {
        Uuid::new_v4().to_string()
    }

    /// Filesystem path of a stored media file.
    pub fn file_path(&self, user_id: i64, filekey: &str) -> StorageResult<PathBuf> {
        validate_segment(filekey)?;
        Ok(self.user_dir(user_id).join(filekey))
    }

    /// Filesystem path of a media file's thumbnail.
    pub fn thumbnail_path(&self, user_id: i64, filekey: &str) -> StorageResult<PathBuf> {
        validate_segment(filekey)?;
        Ok(self.user_dir(user_id).join(THUMBNAILS_DIR).join(filekey))
    }

    /// Filesystem path of a staged temp file.
    pub fn temp_path(&self, name: &str) -> StorageResult<PathBuf> {
        validate_segment(name)?;
        Ok(self.root.join(TEMP_DIR).join(name))
    }

    /// Create (or truncate) a staged temp file and return it for writing.
    pub async fn create_temp(&self, name: &str) -> StorageResult<fs::File> {
        let path = self.temp_path(name)?;
        Ok(fs::File::create(&path).await?)
    }

    /// Open a staged temp file for appending.
    pub async fn open_temp_append(&self, name: &str) -> StorageResult<fs::File> {
        let path = self.temp_path(name)?;
        match fs::OpenOptions::new().append(true).open(&path).await {
            Ok(file) => Ok(file),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Size in bytes of a staged temp file.
    pub async fn temp_len(&self, name: &str) -> StorageResult<u64> {
        let path = self.temp_path(name)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Remove a staged temp file. Missing files are not an error.
    pub async fn discard_temp(&self, name: &str) -> StorageResult<()> {
        let path = self.temp_path(name)?;
        remove_if_present(&path).await
    }

    /// Move a staged temp file into the permanent area for `user_id`.
    ///
    /// Uses rename, falling back to copy + remove when the temp and files
    /// directories sit on different filesystems.
    pub async fn promote(
        &self,
        temp_name: &str,
        user_id: i64,
        filekey: &str,
    ) -> StorageResult<PathBuf> {
        let from = self.temp_path(temp_name)?;
        let to = self.file_path(user_id, filekey)?;

        if !fs::try_exists(&from).await.unwrap_or(false) {
            return Err(StorageError::NotFound(temp_name.to_string()));
        }
        ensure_parent_dir(&to).await?;

        let start = std::time::Instant::now();
        if let Err(err) = fs::rename(&from, &to).await {
            tracing::debug!(error = %err, "Rename failed, falling back to copy");
            if let Err(err) = fs::copy(&from, &to).await {
                // An interrupted copy must not leave half a file behind.
                let _ = remove_if_present(&to).await;
                return Err(err.into());
            }
            fs::remove_file(&from).await?;
        }

        tracing::info!(
            from = %from.display(),
            to = %to.display(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged file promoted into vault"
        );

        Ok(to)
    }

    /// Prepare the thumbnail directory for `user_id` and return the
    /// destination path for `filekey`. The preview generator writes there.
    pub async fn thumbnail_dest(&self, user_id: i64, filekey: &str) -> StorageResult<PathBuf> {
        let path = self.thumbnail_path(user_id, filekey)?;
        ensure_parent_dir(&path).await?;
        Ok(path)
    }

    /// Remove a thumbnail, leaving the media file alone. Missing files are
    /// not an error.
    pub async fn discard_thumbnail(&self, user_id: i64, filekey: &str) -> StorageResult<()> {
        let path = self.thumbnail_path(user_id, filekey)?;
        remove_if_present(&path).await
    }

    /// Remove a stored media file and its thumbnail.
    ///
    /// Already-missing files are not an error, so deletes stay idempotent.
    pub async fn delete_media(&self, user_id: i64, filekey: &str) -> StorageResult<()> {
        let file = self.file_path(user_id, filekey)?;
        let thumbnail = self.thumbnail_path(user_id, filekey)?;

        remove_if_present(&file).await?;
        remove_if_present(&thumbnail).await?;

        tracing::info!(user_id, filekey = %filekey, "Media removed from vault");
        Ok(())
    }

    /// Size in bytes of a stored media file.
    pub async fn media_len(&self, user_id: i64, filekey: &str) -> StorageResult<u64> {
        let path = self.file_path(user_id, filekey)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(filekey.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn user_dir(&self, user_id: i64) -> PathBuf {
        self.root.join(FILES_DIR).join(user_id.to_string())
    }
}

/// Filekeys and temp names are single path segments.
fn validate_segment(value: &str) -> StorageResult<()> {
    if value.is_empty() || value.contains('/') || value.contains('\\') || value.contains("..") {
        return Err(StorageError::InvalidKey(value.to_string()));
    }
    Ok(())
}

async fn ensure_parent_dir(path: &Path) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> StorageResult<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}
