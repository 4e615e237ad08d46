//! Bucket relay core.
//!
//! Reacts to a single "object created" notification:
//! - Filters by container and watched folder
//! - Fetches the object from the store
//! - Wraps it into a password-protected zip under `tmp_dir`
//! - Pushes the archive to the SFTP server
//!
//! One event per invocation, no state kept between invocations.

pub mod config;
pub mod error;
pub mod object_source;
pub mod path_filter;
pub mod pipeline;
pub mod types;

pub use config::{RelayConfig, SecretString};
pub use error::{RelayError, RelayResult};
pub use path_filter::NameTrim;
pub use pipeline::Relay;
pub use types::*;
