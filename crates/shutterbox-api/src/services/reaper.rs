//! Background expiration of abandoned resumable transfers.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::interval;

use shutterbox_db::UploadSessionRepository;
use shutterbox_storage::LocalVault;

/// Periodically removes resumable uploads that have sat idle longer than
/// the configured expiration, together with their staged temp files.
pub struct UploadReaper {
    sessions: UploadSessionRepository,
    vault: LocalVault,
    expiration_secs: u64,
    interval_secs: u64,
}

/// Handle to a running reaper. Dropping it does not stop the task; call
/// [`ReaperHandle::stop`] for an orderly shutdown.
pub struct ReaperHandle {
    stop: watch::Sender<bool>,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ReaperHandle {
    /// Signal the reaper to stop and wait for the current sweep to finish.
    /// Safe to call more than once.
    pub async fn stop(&self) {
        let _ = self.stop.send(true);
        if let Some(task) = self.task.lock().await.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Upload reaper task ended abnormally");
            }
        }
    }
}

impl UploadReaper {
    pub fn new(
        sessions: UploadSessionRepository,
        vault: LocalVault,
        expiration_secs: u64,
        interval_secs: u64,
    ) -> Self {
        Self {
            sessions,
            vault,
            expiration_secs,
            interval_secs,
        }
    }

    /// Spawn the periodic sweep loop.
    pub fn start(self: Arc<Self>) -> ReaperHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut sweep_interval = interval(Duration::from_secs(self.interval_secs.max(1)));
            // The first tick fires immediately; skip it so startup does not
            // race the migrations-then-serve sequence in tests.
            sweep_interval.tick().await;

            loop {
                tokio::select! {
                    _ = sweep_interval.tick() => {
                        match self.sweep_once().await {
                            Ok(0) => {}
                            Ok(reaped) => {
                                tracing::info!(reaped, "Expired upload sessions removed");
                            }
                            Err(e) => {
                                tracing::error!(error = %e, "Upload reaper sweep failed");
                            }
                        }
                    }
                    _ = stop_rx.changed() => {
                        tracing::info!("Upload reaper stopping");
                        break;
                    }
                }
            }
        });

        ReaperHandle {
            stop: stop_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Remove every session older than the expiration window. Failures on
    /// individual sessions are logged and do not abort the sweep; returns
    /// the number of sessions removed.
    pub async fn sweep_once(&self) -> Result<usize, anyhow::Error> {
        let now = Utc::now();
        let mut reaped = 0usize;

        for session in self.sessions.list().await? {
            if session.age_secs(now) <= self.expiration_secs {
                continue;
            }

            if let Err(e) = self.sessions.delete(session.user_id, &session.id).await {
                tracing::error!(error = %e, upload_id = %session.id, "Failed to delete expired session");
                continue;
            }
            // The row is gone; a leftover temp file is only wasted disk.
            if let Err(e) = self.vault.discard_temp(&session.id).await {
                tracing::warn!(error = %e, upload_id = %session.id, "Failed to discard expired temp file");
            }
            tracing::debug!(
                upload_id = %session.id,
                age_secs = session.age_secs(now),
                "Expired upload session reaped"
            );
            reaped += 1;
        }

        Ok(reaped)
    }
}
