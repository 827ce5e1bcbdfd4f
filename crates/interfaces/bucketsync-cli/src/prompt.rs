use anyhow::{Context, Result};
use bucketsync_infra::Passphrase;
use camino::Utf8Path;
use dialoguer::Password;

/// Ask for the passphrase on the terminal without echoing it.
pub fn read_passphrase(encrypted_path: &Utf8Path) -> Result<Passphrase> {
    let value = Password::new()
        .with_prompt(format!("Passphrase for {encrypted_path}"))
        .allow_empty_password(true)
        .interact()
        .context("Failed to read passphrase")?;
    Ok(Passphrase::new(value))
}
