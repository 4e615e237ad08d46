//! Failure-path tests for the SFTP uploader against local TCP endpoints.
//!
//! No SSH server is involved: each test stands up a listener that misbehaves
//! in a specific way and checks the uploader reports it as an auth failure.

use relay_sftp::{ArchiveUploader, HostKeyPolicy, SftpSettings, SftpUploader, UploadError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;

fn settings(port: u16, connect_timeout: Duration) -> SftpSettings {
    SftpSettings {
        host: "127.0.0.1".into(),
        port,
        username: "foo".into(),
        password: "pass".into(),
        host_key_policy: HostKeyPolicy::Fingerprint(
            "SHA256:nThbg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8".into(),
        ),
        connect_timeout,
    }
}

fn local_archive() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv.zip");
    std::fs::write(&path, b"PK\x05\x06").unwrap();
    (dir, path)
}

#[tokio::test]
async fn refused_connection_is_auth_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let (_dir, archive) = local_archive();
    let uploader = SftpUploader::new(settings(port, Duration::from_secs(5)));

    let result = uploader.upload(&archive, "in", "data").await;
    assert!(matches!(result, Err(UploadError::Auth(_))), "got {result:?}");
}

#[tokio::test]
async fn non_ssh_server_is_auth_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        if let Ok((mut socket, _)) = listener.accept().await {
            let _ = socket.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
    });

    let (_dir, archive) = local_archive();
    let uploader = SftpUploader::new(settings(port, Duration::from_secs(5)));

    let result = uploader.upload(&archive, "in", "data").await;
    assert!(matches!(result, Err(UploadError::Auth(_))), "got {result:?}");
}

#[tokio::test]
async fn silent_server_times_out_as_auth_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        if let Ok((socket, _)) = listener.accept().await {
            // Hold the socket open without ever sending an SSH banner.
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        }
    });

    let (_dir, archive) = local_archive();
    let uploader = SftpUploader::new(settings(port, Duration::from_millis(300)));

    let result = uploader.upload(&archive, "in", "data").await;
    match result {
        Err(UploadError::Auth(msg)) => assert!(msg.contains("timed out"), "unexpected: {msg}"),
        other => panic!("expected timeout auth error, got {other:?}"),
    }
}

#[test]
fn error_display() {
    assert_eq!(
        UploadError::Auth("bad password".into()).to_string(),
        "SSH authentication failed: bad password"
    );
    assert_eq!(
        UploadError::Session("no subsystem".into()).to_string(),
        "SFTP session failed: no subsystem"
    );
    assert_eq!(
        UploadError::Transfer("disk full".into()).to_string(),
        "file transfer failed: disk full"
    );
}
