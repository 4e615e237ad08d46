//! Encrypted archive construction for the bucket relay.
//!
//! Wraps a raw payload into a zip container holding exactly one entry,
//! protected with a password:
//! - AES-256 (WinZip AE-2) by default, readable by 7-Zip, WinZip and `unzip`
//!   builds with AES support
//! - Legacy "standard" ZipCrypto as an opt-in for consumers that cannot read
//!   AES entries. ZipCrypto is weak and should only be used for parity with
//!   existing downstream readers.
//!
//! Archives are written to `<tmp_dir>/<entry_name>.zip`.

mod encryptor;
mod error;

pub use encryptor::{archive_path, read_entry, ArchiveEncryptor, EncryptionMethod};
pub use error::{ArchiveError, ArchiveResult};
