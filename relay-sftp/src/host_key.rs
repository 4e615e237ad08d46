//! Host identity verification for the SSH handshake.

use russh_keys::key::PublicKey;
use russh_keys::PublicKeyBase64;
use std::path::PathBuf;
use tracing::{debug, warn};

/// How the server's host key is checked during the handshake.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostKeyPolicy {
    /// Accept only a key whose SHA-256 fingerprint matches, as printed by
    /// `ssh-keygen -lf` (the `SHA256:` prefix is optional).
    Fingerprint(String),
    /// Accept keys recorded for the host in an OpenSSH known_hosts file.
    KnownHosts(PathBuf),
    /// Accept any key. Unsafe: the connection can be intercepted.
    AcceptAny,
}

impl HostKeyPolicy {
    pub fn is_verifying(&self) -> bool {
        !matches!(self, HostKeyPolicy::AcceptAny)
    }

    /// Returns whether `key`, presented by `host:port`, is trusted.
    pub fn verify(&self, host: &str, port: u16, key: &PublicKey) -> bool {
        match self {
            HostKeyPolicy::AcceptAny => {
                warn!(host, port, "accepting host key without verification");
                true
            }
            HostKeyPolicy::Fingerprint(expected) => {
                let actual = key.fingerprint();
                let trusted = fingerprints_match(expected, &actual);
                if !trusted {
                    warn!(host, port, actual = %actual, "host key fingerprint mismatch");
                }
                trusted
            }
            HostKeyPolicy::KnownHosts(path) => {
                match russh_keys::check_known_hosts_path(host, port, key, path) {
                    Ok(true) => {
                        debug!(host, port, "host key found in known_hosts");
                        true
                    }
                    Ok(false) => {
                        warn!(
                            host,
                            port,
                            key = %key.public_key_base64(),
                            "host not present in {}",
                            path.display()
                        );
                        false
                    }
                    Err(e) => {
                        warn!(host, port, "known_hosts check failed: {e}");
                        false
                    }
                }
            }
        }
    }
}

/// Compares fingerprints ignoring the `SHA256:` prefix and base64 padding.
pub(crate) fn fingerprints_match(expected: &str, actual: &str) -> bool {
    let normalize = |s: &str| {
        s.trim()
            .trim_start_matches("SHA256:")
            .trim_end_matches('=')
            .to_string()
    };
    let expected = normalize(expected);
    !expected.is_empty() && expected == normalize(actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FP: &str = "nThbg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8";

    #[test]
    fn fingerprint_prefix_is_optional() {
        assert!(fingerprints_match(&format!("SHA256:{FP}"), FP));
        assert!(fingerprints_match(FP, FP));
    }

    #[test]
    fn fingerprint_padding_is_ignored() {
        assert!(fingerprints_match(&format!("{FP}="), FP));
        assert!(fingerprints_match(&format!(" SHA256:{FP}\n"), &format!("{FP}=")));
    }

    #[test]
    fn different_fingerprints_do_not_match() {
        assert!(!fingerprints_match(
            "SHA256:AAAAg6kXUpJWGl7E1IGOCspRomTxdCARLviKw6E5SY8",
            FP
        ));
    }

    #[test]
    fn empty_expected_fingerprint_never_matches() {
        assert!(!fingerprints_match("", ""));
        assert!(!fingerprints_match("SHA256:", FP));
    }

    #[test]
    fn accept_any_is_not_verifying() {
        assert!(!HostKeyPolicy::AcceptAny.is_verifying());
        assert!(HostKeyPolicy::Fingerprint(FP.into()).is_verifying());
        assert!(HostKeyPolicy::KnownHosts("/etc/ssh/ssh_known_hosts".into()).is_verifying());
    }
}
