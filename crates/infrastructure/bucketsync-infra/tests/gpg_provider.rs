#![cfg(unix)]

use bucketsync_infra::credentials::{CredentialError, CredentialProvider, Passphrase};
use bucketsync_infra::GpgCredentialProvider;
use camino::Utf8PathBuf;
use std::os::unix::fs::PermissionsExt;
use tempfile::TempDir;

/// Stand-in for gpg: ignores its arguments, reads the passphrase from stdin and
/// prints `payload` when it matches, otherwise fails like gpg does.
fn fake_decryptor(dir: &TempDir, payload: &str) -> String {
    let script = dir.path().join("fake-gpg");
    let body = format!(
        "#!/bin/sh\nread -r pass\nif [ \"$pass\" = \"open sesame\" ]; then\n  printf '{payload}'\n  exit 0\nfi\necho 'gpg: decryption failed: Bad session key' >&2\nexit 2\n"
    );
    std::fs::write(&script, body).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script.to_string_lossy().into_owned()
}

fn blob_path(dir: &TempDir) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join("creds.gpg")).unwrap();
    std::fs::write(&path, b"ciphertext").unwrap();
    path
}

#[tokio::test]
async fn correct_passphrase_yields_key_pair() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_decryptor(&dir, "AKIAEXAMPLE\\nsecretkey\\n");
    let provider = GpgCredentialProvider::new(program, blob_path(&dir));

    let keys = provider
        .credentials(&Passphrase::new("open sesame".into()))
        .await
        .unwrap();
    assert_eq!(keys.access_key_id(), "AKIAEXAMPLE");
    assert_eq!(keys.secret_access_key(), "secretkey");
}

#[tokio::test]
async fn wrong_passphrase_is_decryption_failure_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_decryptor(&dir, "AKIAEXAMPLE\\nsecretkey\\n");
    let provider = GpgCredentialProvider::new(program, blob_path(&dir));

    let err = provider
        .credentials(&Passphrase::new("wrong".into()))
        .await
        .unwrap_err();
    match err {
        CredentialError::DecryptionFailed(msg) => assert!(msg.contains("Bad session key")),
        other => panic!("expected DecryptionFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn three_line_payload_is_malformed() {
    let dir = tempfile::tempdir().unwrap();
    let program = fake_decryptor(&dir, "a\\nb\\nc\\n");
    let provider = GpgCredentialProvider::new(program, blob_path(&dir));

    let err = provider
        .credentials(&Passphrase::new("open sesame".into()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CredentialError::MalformedCredentials { lines: 3 }
    ));
}

#[tokio::test]
async fn missing_program_is_decryption_failure() {
    let dir = tempfile::tempdir().unwrap();
    let provider =
        GpgCredentialProvider::new("/nonexistent/bucketsync-gpg", blob_path(&dir));

    let err = provider
        .credentials(&Passphrase::new("open sesame".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, CredentialError::DecryptionFailed(_)));
}
