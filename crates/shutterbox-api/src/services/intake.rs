//! Shared ingestion pipeline.
//!
//! Both upload paths end here: a staged temp file is promoted into the
//! owner's vault area, intrinsic metadata is extracted, a preview is
//! rendered best-effort, the display name is deduplicated, and the record
//! is inserted. The store's unique constraints are the authority for both
//! idempotency (`(user_id, item_id)`) and display names
//! (`(user_id, filename)`): pre-checks are optimizations, and constraint
//! violations on insert are handled as normal signals, not failures.

use chrono::Utc;

use shutterbox_core::{AppError, MediaRecord, NewMedia, UniqueKey};
use shutterbox_db::{dedup, MediaRepository};
use shutterbox_processing::{MediaExtractor, ThumbnailGenerator};
use shutterbox_storage::LocalVault;

use crate::error::{extraction_to_app, log_thumbnail_failure, storage_to_app};

pub const SKIPPED_MESSAGE: &str = "Skipped because this file is already uploaded.";

/// Result of one ingestion: the persisted record, and whether the upload
/// was skipped because the idempotency key was already used.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: MediaRecord,
    pub skipped: bool,
}

#[derive(Clone)]
pub struct IntakeService {
    media: MediaRepository,
    vault: LocalVault,
    extractor: MediaExtractor,
    thumbnails: ThumbnailGenerator,
}

impl IntakeService {
    pub fn new(
        media: MediaRepository,
        vault: LocalVault,
        extractor: MediaExtractor,
        thumbnails: ThumbnailGenerator,
    ) -> Self {
        Self {
            media,
            vault,
            extractor,
            thumbnails,
        }
    }

    /// Ingest the staged temp file `temp_name` for `user_id`.
    ///
    /// Consumes the temp file on every path: it is either promoted into the
    /// vault or discarded. When `item_id` is already persisted for this
    /// owner the received bytes are dropped and the existing record comes
    /// back with `skipped = true`.
    #[tracing::instrument(
        skip(self),
        fields(user_id, mime = %declared_mime, item_id = ?item_id, operation = "ingest")
    )]
    pub async fn ingest(
        &self,
        user_id: i64,
        temp_name: &str,
        desired_filename: &str,
        declared_mime: &str,
        item_id: Option<&str>,
    ) -> Result<IngestOutcome, AppError> {
        // Fast path for retried uploads; the insert below stays authoritative.
        if let Some(item) = item_id {
            if let Some(existing) = self.media.find_by_item_id(user_id, item).await? {
                tracing::info!(item_id = item, media_id = existing.id, "Duplicate upload skipped");
                self.vault
                    .discard_temp(temp_name)
                    .await
                    .map_err(storage_to_app)?;
                return Ok(IngestOutcome {
                    record: existing,
                    skipped: true,
                });
            }
        }

        let filesize = match self.vault.temp_len(temp_name).await {
            Ok(len) => len as i64,
            Err(err) => {
                self.discard_staged(temp_name).await;
                return Err(storage_to_app(err));
            }
        };

        let filekey = LocalVault::generate_filekey();
        let path = match self.vault.promote(temp_name, user_id, &filekey).await {
            Ok(path) => path,
            Err(err) => {
                self.discard_staged(temp_name).await;
                return Err(storage_to_app(err));
            }
        };

        let intrinsics = match self.extractor.extract(&path, declared_mime).await {
            Ok(intrinsics) => intrinsics,
            Err(err) => {
                self.remove_local_work(user_id, &filekey).await;
                return Err(extraction_to_app(err));
            }
        };

        // Best-effort preview; ingestion continues without one on failure.
        match self.vault.thumbnail_dest(user_id, &filekey).await {
            Ok(dest) => {
                if let Err(err) = self
                    .thumbnails
                    .generate(&path, &dest, &intrinsics.mime_type, intrinsics.duration)
                    .await
                {
                    log_thumbnail_failure(&err, &filekey);
                    if let Err(err) = self.vault.discard_thumbnail(user_id, &filekey).await {
                        tracing::warn!(error = %err, filekey, "Failed to remove partial thumbnail");
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, filekey, "Could not prepare thumbnail directory");
            }
        }

        let mut new_media = NewMedia::new(
            user_id,
            filekey.clone(),
            String::new(),
            intrinsics.mime_type.clone(),
        );
        new_media.filesize = filesize;
        new_media.item_id = item_id.map(str::to_string);
        new_media.width = intrinsics.width;
        new_media.height = intrinsics.height;
        new_media.duration = intrinsics.duration;
        new_media.latitude = intrinsics.latitude;
        new_media.longitude = intrinsics.longitude;
        new_media.altitude = intrinsics.altitude;
        new_media.created = intrinsics.created;
        new_media.uploaded = Utc::now();

        // The dedup pre-check loses races; the filename constraint decides
        // and the loop re-runs deduplication until an insert sticks.
        loop {
            new_media.filename = dedup::uniquify(&self.media, user_id, desired_filename).await?;

            match self.media.insert(&new_media).await {
                Ok(record) => {
                    tracing::info!(
                        media_id = record.id,
                        filename = %record.filename,
                        filekey = %record.filekey,
                        "Media ingested"
                    );
                    return Ok(IngestOutcome {
                        record,
                        skipped: false,
                    });
                }
                Err(err) if err.is_duplicate(UniqueKey::Filename) => {
                    tracing::debug!(
                        desired = desired_filename,
                        "Lost filename race, retrying deduplication"
                    );
                    continue;
                }
                Err(err) if err.is_duplicate(UniqueKey::ItemId) => {
                    // A concurrent upload with the same item_id finished
                    // first; our bytes lose and the winner's record wins.
                    self.remove_local_work(user_id, &filekey).await;
                    if let Some(item) = item_id {
                        if let Some(existing) = self.media.find_by_item_id(user_id, item).await? {
                            tracing::info!(
                                item_id = item,
                                media_id = existing.id,
                                "Concurrent duplicate completed first, local work discarded"
                            );
                            return Ok(IngestOutcome {
                                record: existing,
                                skipped: true,
                            });
                        }
                    }
                    return Err(err);
                }
                Err(err) => {
                    self.remove_local_work(user_id, &filekey).await;
                    return Err(err);
                }
            }
        }
    }

    /// Drop a staged temp file that never made it into the vault. Cleanup
    /// failures are logged, not propagated; the caller's error matters more.
    async fn discard_staged(&self, temp_name: &str) {
        if let Err(err) = self.vault.discard_temp(temp_name).await {
            tracing::warn!(error = %err, temp_name, "Failed to remove staged temp file");
        }
    }

    /// Drop the promoted file and any thumbnail after a failed or lost
    /// ingestion. Cleanup failures are logged, not propagated; the caller's
    /// error matters more.
    async fn remove_local_work(&self, user_id: i64, filekey: &str) {
        if let Err(err) = self.vault.delete_media(user_id, filekey).await {
            tracing::warn!(error = %err, filekey, "Failed to remove files after aborted ingestion");
        }
    }
}
