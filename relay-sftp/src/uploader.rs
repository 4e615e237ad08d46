//! SSH/SFTP archive uploader.

use crate::error::{UploadError, UploadResult};
use crate::host_key::HostKeyPolicy;
use async_trait::async_trait;
use russh::client::{self, Handle};
use russh::{Channel, ChannelMsg, Disconnect};
use russh_keys::key::PublicKey;
use russh_sftp::client::SftpSession;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Delivers a local archive to `<remote_dir>/<remote_base_name>.zip`.
#[async_trait]
pub trait ArchiveUploader: Send + Sync {
    /// Uploads the archive and returns the remote path written.
    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        remote_base_name: &str,
    ) -> UploadResult<String>;
}

/// Connection parameters for the SFTP server.
#[derive(Clone, Debug)]
pub struct SftpSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub host_key_policy: HostKeyPolicy,
    /// Bounds dial, handshake and authentication together.
    pub connect_timeout: Duration,
}

/// Remote destination for an archive.
pub fn remote_path(remote_dir: &str, remote_base_name: &str) -> String {
    if remote_dir.is_empty() {
        format!("{remote_base_name}.zip")
    } else {
        format!("{}/{remote_base_name}.zip", remote_dir.trim_end_matches('/'))
    }
}

/// SSH client handler that applies the host key policy.
struct HostKeyCheck {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

#[async_trait]
impl client::Handler for HostKeyCheck {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(self.policy.verify(&self.host, self.port, server_public_key))
    }
}

/// Uploads archives over a fresh SSH connection per call.
pub struct SftpUploader {
    settings: SftpSettings,
    ssh_config: Arc<client::Config>,
}

impl SftpUploader {
    pub fn new(settings: SftpSettings) -> Self {
        if !settings.host_key_policy.is_verifying() {
            warn!(
                host = %settings.host,
                "SFTP host key verification is disabled; any server key will be trusted"
            );
        }

        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: Some(Duration::from_secs(300)),
            ..Default::default()
        });

        Self {
            settings,
            ssh_config,
        }
    }

    fn address(&self) -> String {
        format!("{}:{}", self.settings.host, self.settings.port)
    }

    /// Disconnected -> Authenticated.
    async fn connect(&self) -> UploadResult<Handle<HostKeyCheck>> {
        let addr = self.address();
        let handler = HostKeyCheck {
            host: self.settings.host.clone(),
            port: self.settings.port,
            policy: self.settings.host_key_policy.clone(),
        };

        let mut handle = client::connect(
            self.ssh_config.clone(),
            (self.settings.host.as_str(), self.settings.port),
            handler,
        )
        .await
        .map_err(|e| UploadError::Auth(format!("handshake with {addr} failed: {e}")))?;

        let accepted = handle
            .authenticate_password(self.settings.username.as_str(), self.settings.password.as_str())
            .await
            .map_err(|e| UploadError::Auth(format!("authentication with {addr} failed: {e}")))?;
        if !accepted {
            return Err(UploadError::Auth(format!(
                "password rejected for user {} on {addr}",
                self.settings.username
            )));
        }

        debug!(%addr, user = %self.settings.username, "SSH session authenticated");
        Ok(handle)
    }

    /// Authenticated -> SessionOpen -> Transferring, closing the subsystem afterwards.
    ///
    /// The subsystem reply and the SFTP version exchange share the connect
    /// timeout, so a server that refuses or ignores the request fails fast.
    async fn transfer(
        &self,
        handle: &Handle<HostKeyCheck>,
        local_path: &Path,
        remote: &str,
    ) -> UploadResult<u64> {
        let open_session = async {
            let mut channel = handle
                .channel_open_session()
                .await
                .map_err(|e| UploadError::Session(format!("channel open failed: {e}")))?;
            channel
                .request_subsystem(true, "sftp")
                .await
                .map_err(|e| UploadError::Session(format!("sftp subsystem request failed: {e}")))?;
            await_subsystem_reply(&mut channel).await?;
            SftpSession::new(channel.into_stream())
                .await
                .map_err(|e| UploadError::Session(format!("sftp init failed: {e}")))
        };
        let sftp = tokio::time::timeout(self.settings.connect_timeout, open_session)
            .await
            .map_err(|_| {
                UploadError::Session(format!(
                    "timed out after {:?} opening the sftp subsystem",
                    self.settings.connect_timeout
                ))
            })??;

        let copied = copy_to_remote(&sftp, local_path, remote).await;

        if let Err(e) = sftp.close().await {
            debug!("sftp session close failed: {e}");
        }
        copied
    }
}

#[async_trait]
impl ArchiveUploader for SftpUploader {
    async fn upload(
        &self,
        local_path: &Path,
        remote_dir: &str,
        remote_base_name: &str,
    ) -> UploadResult<String> {
        let remote = remote_path(remote_dir, remote_base_name);
        let addr = self.address();

        let handle = tokio::time::timeout(self.settings.connect_timeout, self.connect())
            .await
            .map_err(|_| {
                UploadError::Auth(format!(
                    "timed out after {:?} connecting to {addr}",
                    self.settings.connect_timeout
                ))
            })??;

        let result = self.transfer(&handle, local_path, &remote).await;

        if let Err(e) = handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await
        {
            debug!("SSH disconnect from {addr} failed: {e}");
        }

        let bytes = result?;
        info!(%addr, remote_path = %remote, bytes, "archive uploaded");
        Ok(remote)
    }
}

/// Waits for the server to accept or refuse the subsystem request.
async fn await_subsystem_reply(channel: &mut Channel<client::Msg>) -> UploadResult<()> {
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Success) => return Ok(()),
            Some(ChannelMsg::Failure) => {
                return Err(UploadError::Session(
                    "server refused the sftp subsystem".into(),
                ));
            }
            Some(ChannelMsg::Eof | ChannelMsg::Close) | None => {
                return Err(UploadError::Session(
                    "channel closed before the sftp subsystem started".into(),
                ));
            }
            Some(_) => {}
        }
    }
}

/// Creates (or truncates) the remote file and streams the local archive into it.
///
/// A failed copy leaves whatever was written on the server.
async fn copy_to_remote(sftp: &SftpSession, local_path: &Path, remote: &str) -> UploadResult<u64> {
    let mut remote_file = sftp
        .create(remote)
        .await
        .map_err(|e| UploadError::Transfer(format!("cannot create remote file {remote}: {e}")))?;

    let mut local_file = tokio::fs::File::open(local_path).await.map_err(|e| {
        UploadError::Transfer(format!(
            "cannot open local archive {}: {e}",
            local_path.display()
        ))
    })?;

    let bytes = tokio::io::copy(&mut local_file, &mut remote_file)
        .await
        .map_err(|e| UploadError::Transfer(format!("copy to {remote} failed: {e}")))?;
    drop(local_file);

    remote_file
        .shutdown()
        .await
        .map_err(|e| UploadError::Transfer(format!("closing {remote} failed: {e}")))?;

    Ok(bytes)
}
