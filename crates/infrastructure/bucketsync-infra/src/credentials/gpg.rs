use super::{parse_credentials, AccessKeyPair, CredentialError, CredentialProvider, Passphrase};
use camino::Utf8PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Decrypts a credentials file by piping the passphrase into `gpg`.
pub struct GpgCredentialProvider {
    program: String,
    encrypted_path: Utf8PathBuf,
}

impl GpgCredentialProvider {
    pub fn new(program: impl Into<String>, encrypted_path: Utf8PathBuf) -> Self {
        Self {
            program: program.into(),
            encrypted_path,
        }
    }

    fn args(&self) -> [&str; 9] {
        [
            "--batch",
            "--yes",
            "--quiet",
            "--pinentry-mode",
            "loopback",
            "--passphrase-fd",
            "0",
            "--decrypt",
            self.encrypted_path.as_str(),
        ]
    }
}

#[async_trait::async_trait]
impl CredentialProvider for GpgCredentialProvider {
    async fn credentials(&self, passphrase: &Passphrase) -> Result<AccessKeyPair, CredentialError> {
        debug!("decrypting {} with {}", self.encrypted_path, self.program);

        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CredentialError::DecryptionFailed(format!("could not run {}: {e}", self.program))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading; its exit status carries the real error.
            let _ = stdin.write_all(passphrase.expose().as_bytes()).await;
            let _ = stdin.write_all(b"\n").await;
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(|e| {
            CredentialError::DecryptionFailed(format!("{} did not finish: {e}", self.program))
        })?;

        if !output.status.success() {
            let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let diagnostic = if diagnostic.is_empty() {
                format!("{} exited with {}", self.program, output.status)
            } else {
                diagnostic
            };
            return Err(CredentialError::DecryptionFailed(diagnostic));
        }

        let payload = zeroize::Zeroizing::new(String::from_utf8_lossy(&output.stdout).into_owned());
        parse_credentials(&payload)
    }
}
