//! Credential material for the object store.
//!
//! Keys live encrypted on disk and are unlocked with a passphrase supplied by
//! the user. Neither the passphrase nor the secret key ever reaches a log line:
//! both are kept in zeroizing buffers with redacted `Debug` output.

use thiserror::Error;
use zeroize::Zeroizing;

pub mod gpg;

pub use gpg::GpgCredentialProvider;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to decrypt credentials: {0}")]
    DecryptionFailed(String),
    #[error("decrypted credentials are malformed: expected 2 lines, found {lines}")]
    MalformedCredentials { lines: usize },
}

/// User-supplied passphrase. Cleared from memory on drop.
pub struct Passphrase(Zeroizing<String>);

impl Passphrase {
    pub fn new(value: String) -> Self {
        Self(Zeroizing::new(value))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for Passphrase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Passphrase(<redacted>)")
    }
}

pub struct AccessKeyPair {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
}

impl AccessKeyPair {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.as_str()
    }
}

impl std::fmt::Debug for AccessKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessKeyPair")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .finish()
    }
}

/// Turns a passphrase into a key pair.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn credentials(&self, passphrase: &Passphrase) -> Result<AccessKeyPair, CredentialError>;
}

/// Parse a decrypted payload: access key on the first line, secret on the second.
pub fn parse_credentials(payload: &str) -> Result<AccessKeyPair, CredentialError> {
    let lines: Vec<&str> = payload.trim().lines().map(str::trim).collect();
    match lines.as_slice() {
        [access, secret] if !access.is_empty() && !secret.is_empty() => {
            Ok(AccessKeyPair::new(*access, *secret))
        }
        _ => Err(CredentialError::MalformedCredentials {
            lines: if payload.trim().is_empty() {
                0
            } else {
                lines.len()
            },
        }),
    }
}
