// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Receiver for a freshly generated or reconstructed root key.

use crate::error::SpikeError;
use crate::types::RootKey;

/// Consumes a root key, derives whatever it needs (active KEK, custodial
/// shards), and flips the system to ready.
///
/// Implementations take the key by value and must let it drop (zeroing it)
/// before returning.
pub trait RootKeySink: Send + Sync + 'static {
    fn install_root_key(&self, root: RootKey) -> Result<(), SpikeError>;

    /// Whether a root key has been installed.
    fn is_ready(&self) -> bool;
}
