//! Multipart intake for the one-shot upload path.
//!
//! The single `file` field streams straight into a vault temp file so a
//! 10 GiB video never sits in memory. The declared content type is checked
//! before the first byte is staged, and the size ceiling is enforced while
//! the stream is read; on any failure the staged file is discarded.

use axum::extract::Multipart;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use shutterbox_core::{AppError, MediaKind};
use shutterbox_storage::LocalVault;

use crate::error::storage_to_app;

pub const INVALID_TYPE_MESSAGE: &str = "Invalid file type. Only photos and videos are allowed.";

/// A fully received upload staged in the vault's temp area.
#[derive(Debug)]
pub struct StagedUpload {
    pub temp_name: String,
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Strip any path components from a client-supplied filename.
pub fn sanitize_filename(raw: &str) -> String {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .replace(['\0', '\r', '\n'], "");
    if name.is_empty() || name == "." || name == ".." {
        "unknown".to_string()
    } else {
        name
    }
}

/// Stream the single `file` field of `multipart` into a vault temp file.
///
/// Rejects non-photo/video declared types before staging any bytes and
/// enforces `max_bytes` mid-stream.
pub async fn stage_multipart_file(
    vault: &LocalVault,
    mut multipart: Multipart,
    max_bytes: u64,
) -> Result<StagedUpload, AppError> {
    let mut staged: Option<StagedUpload> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if staged.is_some() {
            return Err(AppError::Validation(
                "Multiple file fields are not allowed; send exactly one field named 'file'"
                    .to_string(),
            ));
        }

        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        if MediaKind::from_mime(&mime_type).is_none() {
            return Err(AppError::Validation(INVALID_TYPE_MESSAGE.to_string()));
        }

        let filename = sanitize_filename(field.file_name().unwrap_or("unknown"));
        let temp_name = format!("stage-{}", Uuid::new_v4());
        let mut file = vault.create_temp(&temp_name).await.map_err(storage_to_app)?;

        let mut size: u64 = 0;
        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    discard(vault, &temp_name).await;
                    return Err(AppError::Validation(format!("Upload stream aborted: {e}")));
                }
            };

            size += chunk.len() as u64;
            if size > max_bytes {
                discard(vault, &temp_name).await;
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the maximum upload size of {max_bytes} bytes"
                )));
            }
            if let Err(e) = file.write_all(&chunk).await {
                discard(vault, &temp_name).await;
                return Err(e.into());
            }
        }

        if let Err(e) = file.flush().await {
            discard(vault, &temp_name).await;
            return Err(e.into());
        }

        staged = Some(StagedUpload {
            temp_name,
            filename,
            mime_type,
            size,
        });
    }

    staged.ok_or_else(|| AppError::Validation("No file provided".to_string()))
}

async fn discard(vault: &LocalVault, temp_name: &str) {
    if let Err(err) = vault.discard_temp(temp_name).await {
        tracing::warn!(error = %err, temp_name, "Failed to discard staged upload");
    }
}
