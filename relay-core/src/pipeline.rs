//! Relay orchestrator: filter → fetch → encrypt → upload.
//!
//! Each step's error is returned as-is and ends the invocation. Nothing is
//! rolled back: a local archive built before a failed upload stays on disk,
//! and a partially written remote file stays on the server.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::object_source::ObjectSource;
use crate::path_filter::{belongs_to_watched_folder, derive_names};
use crate::types::{IgnoreReason, ObjectReference, RunOutcome, StorageEvent};
use relay_archive::{ArchiveEncryptor, ArchiveError};
use relay_sftp::ArchiveUploader;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Handles one storage event per call to [`Relay::run`].
pub struct Relay {
    config: RelayConfig,
    source: Arc<dyn ObjectSource>,
    uploader: Arc<dyn ArchiveUploader>,
    encryptor: ArchiveEncryptor,
}

impl Relay {
    pub fn new(
        config: RelayConfig,
        source: Arc<dyn ObjectSource>,
        uploader: Arc<dyn ArchiveUploader>,
    ) -> Self {
        let encryptor = ArchiveEncryptor::new(config.archive_encryption);
        Self {
            config,
            source,
            uploader,
            encryptor,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Processes one event. Unmatched events succeed as [`RunOutcome::Ignored`].
    ///
    /// Every blocking step races `cancel` and yields [`RelayError::Cancelled`]
    /// when it fires first.
    pub async fn run(
        &self,
        event: &StorageEvent,
        cancel: &CancellationToken,
    ) -> RelayResult<RunOutcome> {
        let object = ObjectReference::from(event);

        if object.container != self.config.bucket {
            info!(bucket = %object.container, "ignoring file from another bucket: {}", object.name);
            return Ok(RunOutcome::Ignored {
                reason: IgnoreReason::OtherBucket,
            });
        }

        if !belongs_to_watched_folder(&object.name, &self.config.watched_folder) {
            info!("ignoring file: {}", object.name);
            return Ok(RunOutcome::Ignored {
                reason: IgnoreReason::OutsideWatchedFolder,
            });
        }

        let names = derive_names(
            &object.name,
            &self.config.watched_folder,
            self.config.name_trim,
        );
        if names.entry_name.is_empty() {
            info!("ignoring file with no name after trimming: {}", object.name);
            return Ok(RunOutcome::Ignored {
                reason: IgnoreReason::EmptyEntryName,
            });
        }

        info!(generation = ?event.generation, "processing file: {}", object.name);

        let payload = guard(cancel, self.source.open(&object))
            .await
            .inspect_err(|e| error!(object = %object, "fetch failed: {e}"))?;
        let bytes = payload.len();

        info!(entry = %names.entry_name, bytes, "zipping file...");
        let local_archive = self
            .encrypt(cancel, names.entry_name.clone(), payload)
            .await
            .inspect_err(|e| error!(entry = %names.entry_name, "error when zipping file: {e}"))?;

        info!(archive = %local_archive.display(), "sending file to sftp server...");
        let upload = async {
            self.uploader
                .upload(&local_archive, &self.config.remote_dir, &names.base_name)
                .await
                .map_err(RelayError::from)
        };
        let remote_path = guard(cancel, upload)
            .await
            .inspect_err(|e| error!(archive = %local_archive.display(), "upload failed: {e}"))?;

        info!(remote_path = %remote_path, "done!");
        Ok(RunOutcome::Delivered {
            local_archive,
            remote_path,
            bytes,
        })
    }

    /// Builds the archive on the blocking pool; the payload is dropped once written.
    ///
    /// The blocking write cannot be interrupted. On cancellation it is awaited
    /// before [`RelayError::Cancelled`] is returned, so no write to the archive
    /// outlives the invocation.
    async fn encrypt(
        &self,
        cancel: &CancellationToken,
        entry_name: String,
        payload: Vec<u8>,
    ) -> RelayResult<PathBuf> {
        let encryptor = self.encryptor.clone();
        let tmp_dir = self.config.tmp_dir.clone();
        let password = self.config.archive_password.clone();

        let mut task = tokio::task::spawn_blocking(move || {
            encryptor.encrypt(&tmp_dir, &entry_name, &payload, password.expose())
        });

        let joined = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                if let Err(e) = (&mut task).await {
                    warn!("archive task failed after cancellation: {e}");
                }
                return Err(RelayError::Cancelled);
            }
            joined = &mut task => joined,
        };

        joined
            .map_err(|e| ArchiveError::Io(std::io::Error::other(e)))?
            .map_err(RelayError::from)
    }
}

/// Races a pipeline step against cancellation.
async fn guard<T>(
    cancel: &CancellationToken,
    step: impl Future<Output = RelayResult<T>>,
) -> RelayResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RelayError::Cancelled),
        result = step => result,
    }
}
