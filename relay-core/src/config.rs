//! Relay configuration, loaded from `RELAY_*` environment variables.

use crate::error::{RelayError, RelayResult};
use crate::path_filter::NameTrim;
use ::config::{Config, Environment};
use relay_archive::EncryptionMethod;
use relay_sftp::{HostKeyPolicy, SftpSettings};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secret value that is wiped on drop and never printed.
#[derive(Clone, Default, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(***)")
    }
}

/// Configuration for one relay deployment.
#[derive(Clone, Debug, Deserialize)]
pub struct RelayConfig {
    /// Bucket the relay is bound to; events from other buckets are ignored.
    pub bucket: String,

    /// Object name prefix that gates processing.
    #[serde(default = "default_watched_folder")]
    pub watched_folder: String,

    /// How the folder prefix and `.csv` suffix are stripped from object names.
    #[serde(default)]
    pub name_trim: NameTrim,

    /// Directory the local archive is written to.
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,

    pub archive_password: SecretString,

    #[serde(default)]
    pub archive_encryption: EncryptionMethod,

    pub sftp_host: String,

    #[serde(default = "default_sftp_port")]
    pub sftp_port: u16,

    pub sftp_user: String,

    pub sftp_password: SecretString,

    /// Remote directory receiving `<base_name>.zip`.
    #[serde(default = "default_remote_dir")]
    pub remote_dir: String,

    /// Pinned SHA-256 host key fingerprint (`SHA256:...`).
    #[serde(default)]
    pub sftp_host_fingerprint: Option<String>,

    /// OpenSSH known_hosts file to verify the host key against.
    #[serde(default)]
    pub sftp_known_hosts: Option<PathBuf>,

    /// Trust any host key. Only honoured when no other verification is set.
    #[serde(default)]
    pub sftp_accept_any_host_key: bool,

    #[serde(default = "default_s3_region")]
    pub s3_region: String,

    /// Endpoint override, e.g. `https://storage.googleapis.com` or MinIO.
    #[serde(default)]
    pub s3_endpoint: Option<String>,

    /// Static HMAC credentials; the default AWS chain is used when unset.
    #[serde(default)]
    pub s3_access_key_id: Option<String>,

    #[serde(default)]
    pub s3_secret_access_key: Option<SecretString>,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Deadline for the whole invocation.
    #[serde(default = "default_invocation_timeout_secs")]
    pub invocation_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_watched_folder() -> String {
    "reporting/sik".to_string()
}

fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir()
}

fn default_sftp_port() -> u16 {
    22
}

fn default_remote_dir() -> String {
    "in".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_invocation_timeout_secs() -> u64 {
    540
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RelayConfig {
    /// Loads and validates configuration from `RELAY_*` variables.
    pub fn from_env() -> RelayResult<Self> {
        Self::from_environment(Environment::with_prefix("RELAY"))
    }

    /// Loads and validates configuration from an explicit environment source.
    pub fn from_environment(environment: Environment) -> RelayResult<Self> {
        let config: Self = Config::builder()
            .add_source(environment)
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RelayResult<()> {
        let required = [
            ("bucket", self.bucket.is_empty()),
            ("watched_folder", self.watched_folder.is_empty()),
            ("archive_password", self.archive_password.is_empty()),
            ("sftp_host", self.sftp_host.is_empty()),
            ("sftp_user", self.sftp_user.is_empty()),
            ("sftp_password", self.sftp_password.is_empty()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, empty)| *empty) {
            return Err(RelayError::Config(format!("{field} must not be empty")));
        }
        if self.sftp_port == 0 {
            return Err(RelayError::Config("sftp_port must not be 0".into()));
        }
        if self.s3_access_key_id.is_some() != self.s3_secret_access_key.is_some() {
            return Err(RelayError::Config(
                "s3_access_key_id and s3_secret_access_key must be set together".into(),
            ));
        }
        self.host_key_policy()?;
        Ok(())
    }

    /// Resolves host identity verification: pinned fingerprint, then
    /// known_hosts, then the explicit accept-any opt-in.
    pub fn host_key_policy(&self) -> RelayResult<HostKeyPolicy> {
        if let Some(fingerprint) = self.sftp_host_fingerprint.as_deref().filter(|f| !f.is_empty()) {
            return Ok(HostKeyPolicy::Fingerprint(fingerprint.to_string()));
        }
        if let Some(path) = &self.sftp_known_hosts {
            return Ok(HostKeyPolicy::KnownHosts(path.clone()));
        }
        if self.sftp_accept_any_host_key {
            warn!("RELAY_SFTP_ACCEPT_ANY_HOST_KEY is set; SFTP host identity will not be verified");
            return Ok(HostKeyPolicy::AcceptAny);
        }
        Err(RelayError::Config(
            "no SFTP host key verification configured: set sftp_host_fingerprint, \
             sftp_known_hosts, or opt in with sftp_accept_any_host_key"
                .into(),
        ))
    }

    pub fn sftp_settings(&self) -> RelayResult<SftpSettings> {
        Ok(SftpSettings {
            host: self.sftp_host.clone(),
            port: self.sftp_port,
            username: self.sftp_user.clone(),
            password: self.sftp_password.expose().to_string(),
            host_key_policy: self.host_key_policy()?,
            connect_timeout: self.connect_timeout(),
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn invocation_timeout(&self) -> Duration {
        Duration::from_secs(self.invocation_timeout_secs)
    }

    /// Creates a config for tests with a pinned fingerprint and a scratch tmp dir.
    pub fn test(tmp_dir: PathBuf) -> Self {
        Self {
            bucket: "s-cactus".to_string(),
            watched_folder: default_watched_folder(),
            name_trim: NameTrim::CharacterSet,
            tmp_dir,
            archive_password: SecretString::new("test-archive-password"),
            archive_encryption: EncryptionMethod::Aes256,
            sftp_host: "127.0.0.1".to_string(),
            sftp_port: 2222,
            sftp_user: "foo".to_string(),
            sftp_password: SecretString::new("pass"),
            remote_dir: default_remote_dir(),
            sftp_host_fingerprint: Some(
                "SHA256:nThbg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8".to_string(),
            ),
            sftp_known_hosts: None,
            sftp_accept_any_host_key: false,
            s3_region: default_s3_region(),
            s3_endpoint: Some("http://localhost:9000".to_string()),
            s3_access_key_id: None,
            s3_secret_access_key: None,
            connect_timeout_secs: 5,
            invocation_timeout_secs: 60,
            log_level: "debug".to_string(),
        }
    }
}
