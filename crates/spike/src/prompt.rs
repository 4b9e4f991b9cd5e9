// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shard acquisition via the SPIKE_SHARD environment variable or a TTY prompt.

use secrecy::SecretString;
use spike_core::SpikeError;
use zeroize::Zeroizing;

/// Environment variable carrying a shard for `spike operator restore`.
pub const SHARD_ENV_VAR: &str = "SPIKE_SHARD";

/// Read one encoded shard.
///
/// `SPIKE_SHARD` wins when set and non-empty; otherwise the shard is read
/// from the terminal without echo.
pub fn read_shard() -> Result<SecretString, SpikeError> {
    if let Some(shard) = shard_from_env() {
        return Ok(shard);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        eprint!("Shard: ");
        let typed = Zeroizing::new(
            rpassword::read_password()
                .map_err(|e| SpikeError::Input(format!("failed to read shard: {e}")))?,
        );
        return trimmed_secret(&typed)
            .ok_or_else(|| SpikeError::Input("empty shard not allowed".to_string()));
    }

    Err(SpikeError::Input(format!(
        "No shard provided. Set {SHARD_ENV_VAR} or run interactively."
    )))
}

fn shard_from_env() -> Option<SecretString> {
    let value = Zeroizing::new(std::env::var(SHARD_ENV_VAR).ok()?);
    trimmed_secret(&value)
}

/// Trimmed copy of `raw`, or `None` when only whitespace was entered.
fn trimmed_secret(raw: &Zeroizing<String>) -> Option<SecretString> {
    let value = raw.trim();
    if value.is_empty() {
        None
    } else {
        Some(SecretString::from(value.to_string()))
    }
}
