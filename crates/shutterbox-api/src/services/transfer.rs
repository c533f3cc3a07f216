//! Resumable transfer engine (tus-flavored).
//!
//! A transfer is created with a declared length and metadata claims, fed by
//! sequential appends that must land exactly at the current offset, and
//! handed to [`IntakeService`](super::intake::IntakeService) when the last
//! byte arrives. The temp file under the session id is the single source of
//! bytes; the session row tracks how many of them are committed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::HashMap;
use std::fmt::Display;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use shutterbox_core::{AppError, MediaKind, UploadSession};
use shutterbox_db::{MediaRepository, UploadSessionRepository};
use shutterbox_storage::LocalVault;

use super::intake::{IngestOutcome, IntakeService};
use crate::error::storage_to_app;
use crate::utils::multipart::{sanitize_filename, INVALID_TYPE_MESSAGE};

/// Decoded `Upload-Metadata` header: `key base64value` pairs separated by
/// commas. Keys without a value decode to an empty string.
pub fn parse_upload_metadata(header: &str) -> Result<HashMap<String, String>, AppError> {
    let mut metadata = HashMap::new();
    for pair in header.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, ' ');
        let key = parts.next().unwrap_or_default().to_string();
        if key.is_empty() {
            return Err(AppError::Validation(
                "Malformed Upload-Metadata header".to_string(),
            ));
        }
        let value = match parts.next() {
            Some(encoded) => {
                let raw = BASE64.decode(encoded.trim()).map_err(|_| {
                    AppError::Validation(format!(
                        "Upload-Metadata value for '{key}' is not valid base64"
                    ))
                })?;
                String::from_utf8(raw).map_err(|_| {
                    AppError::Validation(format!(
                        "Upload-Metadata value for '{key}' is not valid UTF-8"
                    ))
                })?
            }
            None => String::new(),
        };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

/// Result of one append.
#[derive(Debug)]
pub enum AppendOutcome {
    /// More bytes are expected; `offset` is the new committed offset.
    Received { offset: i64 },
    /// The declared length has been reached and the upload was ingested.
    Completed(IngestOutcome),
}

#[derive(Clone)]
pub struct TransferEngine {
    sessions: UploadSessionRepository,
    media: MediaRepository,
    vault: LocalVault,
    intake: IntakeService,
    max_upload_bytes: u64,
}

impl TransferEngine {
    pub fn new(
        sessions: UploadSessionRepository,
        media: MediaRepository,
        vault: LocalVault,
        intake: IntakeService,
        max_upload_bytes: u64,
    ) -> Self {
        Self {
            sessions,
            media,
            vault,
            intake,
            max_upload_bytes,
        }
    }

    /// Open a new transfer for `user_id` from the declared length and the
    /// decoded `Upload-Metadata` claims.
    #[tracing::instrument(skip(self, metadata), fields(user_id, length, operation = "transfer_create"))]
    pub async fn create(
        &self,
        user_id: i64,
        length: i64,
        metadata: &HashMap<String, String>,
    ) -> Result<UploadSession, AppError> {
        if length <= 0 {
            return Err(AppError::Validation(
                "Upload-Length must be a positive integer".to_string(),
            ));
        }
        if length as u64 > self.max_upload_bytes {
            return Err(AppError::PayloadTooLarge(format!(
                "Declared length exceeds the maximum upload size of {} bytes",
                self.max_upload_bytes
            )));
        }

        let item_id = metadata
            .get("itemId")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation("itemId is required".to_string()))?
            .clone();

        let mime_type = metadata
            .get("filetype")
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Validation(INVALID_TYPE_MESSAGE.to_string()))?;
        if MediaKind::from_mime(mime_type).is_none() {
            return Err(AppError::Validation(INVALID_TYPE_MESSAGE.to_string()));
        }

        // Refuse outright when the item already landed; clients that lost
        // the completion response should check the metadata listing instead
        // of re-transferring gigabytes.
        if self.media.find_by_item_id(user_id, &item_id).await?.is_some() {
            return Err(AppError::Conflict("itemId is already used".to_string()));
        }

        let filename = metadata
            .get("filename")
            .filter(|v| !v.is_empty())
            .map(|v| sanitize_filename(v));

        let id = Uuid::new_v4().simple().to_string();
        self.vault
            .create_temp(&id)
            .await
            .map_err(storage_to_app)?
            .flush()
            .await?;

        let session = UploadSession::new(
            id,
            user_id,
            item_id,
            length,
            filename,
            Some(mime_type.clone()),
        );
        let stored = match self.sessions.create(&session).await {
            Ok(stored) => stored,
            Err(err) => {
                self.discard_temp(&session.id).await;
                return Err(err);
            }
        };
        tracing::info!(upload_id = %stored.id, length, "Resumable transfer opened");
        Ok(stored)
    }

    /// Committed offset of an in-flight transfer, for `HEAD` probes.
    pub async fn offset(&self, user_id: i64, id: &str) -> Result<UploadSession, AppError> {
        self.sessions
            .get(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload session {id} not found")))
    }

    /// Append `body` at `offset`, which must equal the committed offset.
    ///
    /// The temp file is truncated to the committed offset before writing so
    /// that bytes from a previously interrupted append can never survive.
    /// When the final byte arrives the upload is ingested and the session
    /// removed.
    #[tracing::instrument(skip(self, body), fields(user_id, upload_id = %id, offset, operation = "transfer_append"))]
    pub async fn append<S, E>(
        &self,
        user_id: i64,
        id: &str,
        offset: i64,
        mut body: S,
    ) -> Result<AppendOutcome, AppError>
    where
        S: Stream<Item = Result<Bytes, E>> + Unpin,
        E: Display,
    {
        let session = self
            .sessions
            .get(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload session {id} not found")))?;

        if offset != session.bytes_received {
            return Err(AppError::Conflict(format!(
                "Upload-Offset {offset} does not match the current offset {}",
                session.bytes_received
            )));
        }

        let mut file = self
            .vault
            .open_temp_append(id)
            .await
            .map_err(storage_to_app)?;
        file.set_len(session.bytes_received as u64).await?;

        let mut received = session.bytes_received;
        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    // The session stays at its committed offset; the client
                    // probes with HEAD and resumes from there.
                    tracing::warn!(error = %e, upload_id = id, "Append stream interrupted");
                    return Err(AppError::Validation(format!("Upload stream aborted: {e}")));
                }
            };
            received += chunk.len() as i64;
            if received > session.length {
                return Err(AppError::Validation(format!(
                    "Received {received} bytes but Upload-Length is {}",
                    session.length
                )));
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        // Compare-and-swap against the offset this append started from, so
        // two appends racing past the check above cannot both commit.
        let session = self
            .sessions
            .advance(user_id, id, offset, received)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!(
                    "Upload-Offset {offset} is no longer the current offset"
                ))
            })?;

        if !session.is_complete() {
            tracing::debug!(upload_id = id, offset = session.bytes_received, "Chunk committed");
            return Ok(AppendOutcome::Received {
                offset: session.bytes_received,
            });
        }

        let outcome = self.finalize(&session).await?;
        Ok(AppendOutcome::Completed(outcome))
    }

    /// Abort a transfer, dropping its session row and staged bytes.
    #[tracing::instrument(skip(self), fields(user_id, upload_id = %id, operation = "transfer_terminate"))]
    pub async fn terminate(&self, user_id: i64, id: &str) -> Result<(), AppError> {
        let session = self
            .sessions
            .get(user_id, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Upload session {id} not found")))?;

        self.sessions.delete(user_id, &session.id).await?;
        self.discard_temp(&session.id).await;
        tracing::info!(upload_id = %session.id, "Resumable transfer terminated");
        Ok(())
    }

    /// Run the completed transfer through the intake pipeline and drop the
    /// session. The temp file is consumed by ingestion; on ingestion failure
    /// it is discarded so a retry starts from a fresh transfer.
    async fn finalize(&self, session: &UploadSession) -> Result<IngestOutcome, AppError> {
        let filename = session
            .filename
            .clone()
            .unwrap_or_else(|| session.id.clone());
        let mime_type = session
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let result = self
            .intake
            .ingest(
                session.user_id,
                &session.id,
                &filename,
                &mime_type,
                Some(&session.item_id),
            )
            .await;

        match result {
            Ok(outcome) => {
                self.sessions.delete(session.user_id, &session.id).await?;
                Ok(outcome)
            }
            Err(err) => {
                self.discard_temp(&session.id).await;
                if let Err(delete_err) =
                    self.sessions.delete(session.user_id, &session.id).await
                {
                    tracing::warn!(
                        error = %delete_err,
                        upload_id = %session.id,
                        "Failed to remove session after ingestion failure"
                    );
                }
                Err(err)
            }
        }
    }

    async fn discard_temp(&self, name: &str) {
        if let Err(err) = self.vault.discard_temp(name).await {
            tracing::warn!(error = %err, temp_name = name, "Failed to discard transfer temp file");
        }
    }
}
