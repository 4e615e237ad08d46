//! Upload error types.

use thiserror::Error;

/// Result type for upload operations.
pub type UploadResult<T> = Result<T, UploadError>;

/// Errors that can occur while delivering an archive.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Dial, handshake, host key or credential failure.
    #[error("SSH authentication failed: {0}")]
    Auth(String),

    /// The SFTP subsystem could not be negotiated.
    #[error("SFTP session failed: {0}")]
    Session(String),

    /// Local open, remote create or copy failure.
    #[error("file transfer failed: {0}")]
    Transfer(String),
}
