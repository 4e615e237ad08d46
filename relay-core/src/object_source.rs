//! Object-store read access.
//!
//! The store is reached through the S3 API. Google Cloud Storage serves the
//! same API at `https://storage.googleapis.com` with HMAC keys, MinIO is used
//! in testing.

use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::types::ObjectReference;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client as S3Client;
use aws_types::region::Region;
use tracing::debug;

/// Reads whole objects from the store.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Returns the full contents of `object`, or [`RelayError::Fetch`].
    async fn open(&self, object: &ObjectReference) -> RelayResult<Vec<u8>>;
}

/// S3-compatible object source.
pub struct S3ObjectSource {
    client: S3Client,
}

impl S3ObjectSource {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Builds a client from the relay configuration.
    ///
    /// Static credentials win when configured, otherwise the default AWS
    /// provider chain is used.
    pub async fn from_config(config: &RelayConfig) -> Self {
        let region = Region::new(config.s3_region.clone());

        let mut builder = match (&config.s3_access_key_id, &config.s3_secret_access_key) {
            (Some(access_key_id), Some(secret)) => {
                let credentials = aws_credential_types::Credentials::new(
                    access_key_id,
                    secret.expose(),
                    None,
                    None,
                    "relay-static",
                );
                aws_sdk_s3::Config::builder()
                    .region(region)
                    .credentials_provider(credentials)
                    .behavior_version_latest()
            }
            _ => {
                let shared = aws_config::defaults(BehaviorVersion::latest())
                    .region(region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&shared)
            }
        };

        if let Some(ref endpoint) = config.s3_endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(S3Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectSource for S3ObjectSource {
    async fn open(&self, object: &ObjectReference) -> RelayResult<Vec<u8>> {
        let resp = self
            .client
            .get_object()
            .bucket(&object.container)
            .key(&object.name)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    RelayError::Fetch(format!("{object} not found"))
                } else {
                    RelayError::Fetch(format!("read failed for {object}: {service_err}"))
                }
            })?;

        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| RelayError::Fetch(format!("failed to read body for {object}: {e}")))?;

        let bytes = body.into_bytes().to_vec();
        debug!(object = %object, bytes = bytes.len(), "fetched object");
        Ok(bytes)
    }
}
