//! Single-entry encrypted zip writer.

use crate::error::{ArchiveError, ArchiveResult};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use zip::unstable::write::FileOptionsExt;
use zip::write::SimpleFileOptions;
use zip::{AesMode, CompressionMethod, ZipArchive, ZipWriter};

/// Password-based encryption applied to the archive entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncryptionMethod {
    /// WinZip AES-256 (AE-2).
    #[default]
    Aes256,
    /// Traditional PKWARE encryption. Weak; kept for legacy readers.
    ZipCrypto,
}

/// Builds password-protected archives holding a single entry.
#[derive(Clone, Debug, Default)]
pub struct ArchiveEncryptor {
    method: EncryptionMethod,
}

impl ArchiveEncryptor {
    pub fn new(method: EncryptionMethod) -> Self {
        if method == EncryptionMethod::ZipCrypto {
            warn!("archives will use legacy ZipCrypto encryption, which is easily broken");
        }
        Self { method }
    }

    pub fn method(&self) -> EncryptionMethod {
        self.method
    }

    /// Writes `payload` as entry `entry_name` into `<tmp_dir>/<entry_name>.zip`,
    /// creating or truncating the file. Returns the archive path.
    ///
    /// A partially written file may remain on disk when this fails.
    pub fn encrypt(
        &self,
        tmp_dir: &Path,
        entry_name: &str,
        payload: &[u8],
        password: &str,
    ) -> ArchiveResult<PathBuf> {
        validate_entry_name(entry_name)?;
        if password.is_empty() {
            return Err(ArchiveError::EmptyPassword);
        }

        let path = archive_path(tmp_dir, entry_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = open_truncated(&path)?;
        let file = self.encrypt_to(file, entry_name, payload, password)?;
        file.sync_all()?;

        debug!(
            path = %path.display(),
            entry = entry_name,
            bytes = payload.len(),
            "wrote encrypted archive"
        );
        Ok(path)
    }

    /// Writes the single-entry archive into an arbitrary seekable sink and
    /// hands the sink back once the central directory is flushed.
    ///
    /// The zip writer is dropped on every error path, which releases the sink.
    pub fn encrypt_to<W: Write + Seek>(
        &self,
        sink: W,
        entry_name: &str,
        payload: &[u8],
        password: &str,
    ) -> ArchiveResult<W> {
        validate_entry_name(entry_name)?;
        if password.is_empty() {
            return Err(ArchiveError::EmptyPassword);
        }

        let base = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(0o644);
        let options = match self.method {
            EncryptionMethod::Aes256 => base.with_aes_encryption(AesMode::Aes256, password),
            EncryptionMethod::ZipCrypto => {
                FileOptionsExt::with_deprecated_encryption(base, password.as_bytes())
            }
        };

        let mut writer = ZipWriter::new(sink);
        writer.start_file(entry_name, options)?;
        writer.write_all(payload)?;
        Ok(writer.finish()?)
    }
}

/// Deterministic local path of the archive for `entry_name`.
pub fn archive_path(tmp_dir: &Path, entry_name: &str) -> PathBuf {
    tmp_dir.join(format!("{entry_name}.zip"))
}

/// Decrypts and returns the contents of `entry_name` from an archive.
///
/// Fails with [`ArchiveError::Zip`] on a wrong password or a missing entry.
pub fn read_entry<R: Read + Seek>(
    reader: R,
    entry_name: &str,
    password: &str,
) -> ArchiveResult<Vec<u8>> {
    let mut archive = ZipArchive::new(reader)?;
    let mut entry = archive.by_name_decrypt(entry_name, password.as_bytes())?;
    // The declared size comes from the archive header and is not trusted.
    let mut contents = Vec::new();
    entry.read_to_end(&mut contents)?;
    Ok(contents)
}

/// Rejects names that would escape the temp directory or produce an unnamed member.
fn validate_entry_name(entry_name: &str) -> ArchiveResult<()> {
    let path = Path::new(entry_name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if entry_name.is_empty() || entry_name.ends_with('/') || escapes {
        return Err(ArchiveError::InvalidEntryName(entry_name.to_string()));
    }
    Ok(())
}

#[cfg(unix)]
fn open_truncated(path: &Path) -> std::io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o644)
        .open(path)
}

#[cfg(not(unix))]
fn open_truncated(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
