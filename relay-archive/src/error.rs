//! Archive error types.

use thiserror::Error;

/// Result type for archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while building or reading an encrypted archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("archive I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("invalid entry name: {0:?}")]
    InvalidEntryName(String),

    #[error("archive password must not be empty")]
    EmptyPassword,
}
