//! Shared test doubles for relay pipeline tests.

#![allow(dead_code)]

use async_trait::async_trait;
use relay_core::object_source::ObjectSource;
use relay_core::{ObjectReference, RelayConfig, RelayError, RelayResult};
use relay_sftp::{remote_path, ArchiveUploader, UploadError, UploadResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// In-memory object store keyed by `(bucket, name)`.
#[derive(Default)]
pub struct MemorySource {
    objects: HashMap<(String, String), Vec<u8>>,
    pub calls: AtomicUsize,
    delay: Option<Duration>,
    cancel_on_open: Option<CancellationToken>,
}

impl MemorySource {
    pub fn with_object(bucket: &str, name: &str, data: &[u8]) -> Self {
        let mut source = Self::default();
        source
            .objects
            .insert((bucket.to_string(), name.to_string()), data.to_vec());
        source
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Makes every read hang for `delay` before answering.
    pub fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Cancels `token` while answering a read, so the run is cancelled
    /// right after the fetch succeeds.
    pub fn cancelling(mut self, token: CancellationToken) -> Self {
        self.cancel_on_open = Some(token);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectSource for MemorySource {
    async fn open(&self, object: &ObjectReference) -> RelayResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(token) = &self.cancel_on_open {
            token.cancel();
        }
        self.objects
            .get(&(object.container.clone(), object.name.clone()))
            .cloned()
            .ok_or_else(|| RelayError::Fetch(format!("{object} not found")))
    }
}

/// One recorded upload: the archive bytes as they were at upload time.
#[derive(Clone, Debug)]
pub struct RecordedUpload {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub archive: Vec<u8>,
}

/// Uploader that copies the local archive into memory instead of a server.
#[derive(Default)]
pub struct RecordingUploader {
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

impl RecordingUploader {
    pub fn recorded(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveUploader for RecordingUploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        remote_base_name: &str,
    ) -> UploadResult<String> {
        let archive = tokio::fs::read(local_path)
            .await
            .map_err(|e| UploadError::Transfer(format!("cannot open local archive: {e}")))?;
        let remote = remote_path(remote_dir, remote_base_name);
        self.uploads.lock().unwrap().push(RecordedUpload {
            local_path: local_path.to_path_buf(),
            remote_path: remote.clone(),
            archive,
        });
        Ok(remote)
    }
}

/// Uploader that fails at a fixed stage.
pub struct FailingUploader {
    pub error: fn() -> UploadError,
    pub calls: AtomicUsize,
}

impl FailingUploader {
    pub fn auth_rejected() -> Self {
        Self {
            error: || UploadError::Auth("password rejected for user foo".into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn session_refused() -> Self {
        Self {
            error: || UploadError::Session("sftp subsystem request failed".into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn transfer_broken() -> Self {
        Self {
            error: || UploadError::Transfer("copy to in/data.zip failed".into()),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ArchiveUploader for FailingUploader {
    async fn upload(&self, _local: &Path, _dir: &str, _base: &str) -> UploadResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err((self.error)())
    }
}

/// Config bound to bucket `s-cactus`, folder `reporting/sik`, archives under `tmp_dir`.
pub fn test_config(tmp_dir: &Path) -> RelayConfig {
    RelayConfig::test(tmp_dir.to_path_buf())
}
