// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the Spike crates.

use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Width of the root key and of every shard value, in bytes.
pub const SCALAR_LEN: usize = 32;

/// Permission grants evaluated against a caller's verified identity.
///
/// `Lock` and `Unlock` are deliberately separate from the recovery roles.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Recover,
    Restore,
    Lock,
    Unlock,
}

/// Verified identity of the party invoking an operation (for example a
/// SPIFFE ID established by the transport layer).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallerIdentity(pub String);

impl CallerIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One `(index, value)` point on the sharing polynomial.
///
/// The value is the canonical little-endian encoding of a group scalar.
/// Memory is zeroed on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Shard {
    index: u64,
    value: [u8; SCALAR_LEN],
}

impl Shard {
    pub fn new(index: u64, value: [u8; SCALAR_LEN]) -> Self {
        Self { index, value }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn value(&self) -> &[u8; SCALAR_LEN] {
        &self.value
    }

    /// An all-zero value is the corruption sentinel and never a valid shard.
    pub fn is_zero(&self) -> bool {
        self.value.iter().fold(0u8, |acc, b| acc | b) == 0
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("index", &self.index)
            .field("value", &"[REDACTED]")
            .finish()
    }
}

/// The symmetric key at the root of the trust chain. Memory only.
pub struct RootKey(SecretBox<[u8; SCALAR_LEN]>);

impl RootKey {
    /// Take ownership of key bytes, zeroing the caller's buffer.
    pub fn from_bytes(bytes: &mut [u8; SCALAR_LEN]) -> Self {
        let key = Self(SecretBox::new(Box::new(*bytes)));
        bytes.zeroize();
        key
    }

    pub fn expose(&self) -> &[u8; SCALAR_LEN] {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootKey([REDACTED])")
    }
}

/// Progress of the cross-invocation restore protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestoreStatus {
    pub shards_collected: usize,
    pub shards_remaining: usize,
    pub restored: bool,
}
