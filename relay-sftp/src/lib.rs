//! Secure delivery of encrypted archives for the bucket relay.
//!
//! One upload is one SSH connection:
//! 1. Dial and handshake, verifying the host identity per [`HostKeyPolicy`]
//! 2. Password authentication
//! 3. Open the `sftp` subsystem on a session channel
//! 4. Create `<remote_dir>/<base_name>.zip` and stream the local archive into it
//!
//! Every layer is released in reverse order of acquisition, whether the
//! copy succeeded or not. Nothing is retried.

mod error;
mod host_key;
mod uploader;

pub use error::{UploadError, UploadResult};
pub use host_key::HostKeyPolicy;
pub use uploader::{remote_path, ArchiveUploader, SftpSettings, SftpUploader};
