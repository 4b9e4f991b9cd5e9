// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Canonical text form of a shard: `spike:<index>:<base64(value)>`.
//!
//! This is the only representation that crosses process or storage
//! boundaries. Raw opaque strings are not accepted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use spike_core::{Shard, SpikeError, SCALAR_LEN};
use zeroize::Zeroizing;

/// Literal prefix of every encoded shard.
pub const SHARD_PREFIX: &str = "spike";

/// Encode a shard. The returned string is zeroed on drop.
pub fn encode(shard: &Shard) -> Zeroizing<String> {
    let value = Zeroizing::new(STANDARD.encode(shard.value()));
    Zeroizing::new(format!("{SHARD_PREFIX}:{}:{}", shard.index(), value.as_str()))
}

/// Decode a shard, rejecting anything that is not exactly the canonical form.
///
/// Surrounding whitespace (a trailing newline from a file or terminal) is
/// ignored. Every failure is a [`SpikeError::Input`].
pub fn decode(text: &str) -> Result<Shard, SpikeError> {
    let mut parts = text.trim().splitn(3, ':');
    let (Some(prefix), Some(index), Some(value)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(SpikeError::Input(format!(
            "shard must have the form `{SHARD_PREFIX}:<index>:<base64>`"
        )));
    };

    if prefix != SHARD_PREFIX {
        return Err(SpikeError::Input(format!(
            "shard must start with `{SHARD_PREFIX}:`"
        )));
    }

    let index = parse_index(index)?;

    let bytes = Zeroizing::new(
        STANDARD
            .decode(value)
            .map_err(|_| SpikeError::Input("shard value is not valid base64".to_string()))?,
    );
    if bytes.len() != SCALAR_LEN {
        return Err(SpikeError::Input(format!(
            "shard value must decode to {SCALAR_LEN} bytes, got {}",
            bytes.len()
        )));
    }

    let mut fixed = [0u8; SCALAR_LEN];
    fixed.copy_from_slice(&bytes);
    let shard = Shard::new(index, fixed);
    zeroize::Zeroize::zeroize(&mut fixed);
    Ok(shard)
}

/// Digits only; signs, whitespace and empty strings are rejected.
fn parse_index(text: &str) -> Result<u64, SpikeError> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SpikeError::Input(format!(
            "shard index `{text}` is not a non-negative integer"
        )));
    }
    text.parse::<u64>()
        .map_err(|_| SpikeError::Input(format!("shard index `{text}` is out of range")))
}
