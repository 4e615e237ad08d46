//! Relay error types.

use relay_archive::ArchiveError;
use relay_sftp::UploadError;
use thiserror::Error;

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that abort a relay invocation. None are retried internally.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("archive encryption failed: {0}")]
    Encryption(#[from] ArchiveError),

    #[error("SSH authentication failed: {0}")]
    Auth(String),

    #[error("SFTP session failed: {0}")]
    Session(String),

    #[error("file transfer failed: {0}")]
    Transfer(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invocation cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<UploadError> for RelayError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Auth(msg) => RelayError::Auth(msg),
            UploadError::Session(msg) => RelayError::Session(msg),
            UploadError::Transfer(msg) => RelayError::Transfer(msg),
        }
    }
}

impl From<::config::ConfigError> for RelayError {
    fn from(err: ::config::ConfigError) -> Self {
        RelayError::Config(err.to_string())
    }
}
