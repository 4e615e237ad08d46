//! Hosting entrypoint: one storage event in on stdin, exit status out.
//!
//! Configuration comes from `RELAY_*` environment variables. Exit code 0 means
//! the event was relayed or deliberately ignored; any other code means the
//! hosting runtime should treat the invocation as failed.

use anyhow::{Context, Result};
use relay_core::object_source::S3ObjectSource;
use relay_core::{Relay, RelayConfig, RunOutcome, StorageEvent};
use relay_sftp::SftpUploader;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "info";

#[tokio::main]
async fn main() -> ExitCode {
    // Logging comes up before configuration so warnings raised while loading
    // it are not lost. The configured level is applied once it is known.
    let (filter, explicit_filter) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => (EnvFilter::new(DEFAULT_LOG_LEVEL), false),
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_filter_reloading();
    let filter_handle = builder.reload_handle();
    let _ = builder.try_init();

    let config = match RelayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("failed to load configuration: {e}");
            return ExitCode::from(2);
        }
    };

    if !explicit_filter {
        if let Err(e) = filter_handle.reload(EnvFilter::new(&config.log_level)) {
            warn!("could not apply log level {:?}: {e}", config.log_level);
        }
    }

    match run(config).await {
        Ok(RunOutcome::Ignored { reason }) => {
            info!("event ignored: {reason}");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Delivered { remote_path, .. }) => {
            info!(remote_path = %remote_path, "event relayed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("relay failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: RelayConfig) -> Result<RunOutcome> {
    let event = read_event(tokio::io::stdin()).await?;

    let source = S3ObjectSource::from_config(&config).await;
    let uploader = SftpUploader::new(config.sftp_settings()?);
    let deadline = config.invocation_timeout();
    let relay = Relay::new(config, Arc::new(source), Arc::new(uploader));

    let cancel = CancellationToken::new();
    let watchdog = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::select! {
                _ = tokio::time::sleep(deadline) => {
                    warn!("invocation deadline of {deadline:?} reached, cancelling");
                }
                _ = tokio::signal::ctrl_c() => {
                    warn!("interrupted, cancelling");
                }
                _ = cancel.cancelled() => return,
            }
            cancel.cancel();
        }
    });

    let outcome = relay.run(&event, &cancel).await;
    cancel.cancel();
    let _ = watchdog.await;

    Ok(outcome?)
}

/// Reads the whole notification payload and decodes it.
async fn read_event<R: AsyncRead + Unpin>(mut reader: R) -> Result<StorageEvent> {
    let mut input = Vec::new();
    reader
        .read_to_end(&mut input)
        .await
        .context("reading storage event from stdin")?;
    StorageEvent::from_json(&input).context("decoding storage event")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn event_is_read_to_the_end_of_input() {
        let payload = br#"{"bucket":"s-cactus","name":"reporting/sik/data.csv","generation":"17","size":"7"}"#;

        let event = read_event(&payload[..]).await.unwrap();

        assert_eq!(
            event,
            StorageEvent {
                bucket: "s-cactus".into(),
                name: "reporting/sik/data.csv".into(),
                generation: Some("17".into()),
            }
        );
    }

    #[tokio::test]
    async fn malformed_event_reports_decoding_context() {
        let err = read_event(&b"{\"bucket\":"[..]).await.unwrap_err();
        assert_eq!(err.to_string(), "decoding storage event");
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        assert!(read_event(&b""[..]).await.is_err());
    }
}
