// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-side custody of the root key's derived state.
//!
//! The root key itself is never retained. On install it is split into the
//! custodial shard set (served to `recover`) and used to activate the
//! keyring, then dropped.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use rand::rngs::OsRng;
use spike_core::{RootKey, RootKeySink, Shard, ShardSource, SpikeError};
use spike_kek::KeyRing;
use tracing::info;

/// Holds the N shards derived from the installed root key.
#[derive(Default)]
pub struct ShardCustodian {
    shards: RwLock<Option<Vec<Shard>>>,
}

impl ShardCustodian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_loaded(&self) -> bool {
        self.shards
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn replace(&self, shards: Vec<Shard>) {
        *self.shards.write().unwrap_or_else(PoisonError::into_inner) = Some(shards);
    }
}

#[async_trait]
impl ShardSource for ShardCustodian {
    async fn fetch_shards(&self, count: usize) -> Result<Vec<Shard>, SpikeError> {
        let guard = self.shards.read().unwrap_or_else(PoisonError::into_inner);
        let shards = guard.as_ref().ok_or(SpikeError::NotReady)?;
        Ok(shards.iter().take(count).cloned().collect())
    }
}

impl std::fmt::Debug for ShardCustodian {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardCustodian")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Receives the root key (from bootstrap or restore) and makes the instance
/// ready.
#[derive(Debug)]
pub struct RootKeyKeeper {
    keyring: Arc<KeyRing>,
    custodian: Arc<ShardCustodian>,
    shares: usize,
    threshold: usize,
}

impl RootKeyKeeper {
    pub fn new(
        keyring: Arc<KeyRing>,
        custodian: Arc<ShardCustodian>,
        shares: usize,
        threshold: usize,
    ) -> Self {
        Self {
            keyring,
            custodian,
            shares,
            threshold,
        }
    }

    /// First start: generate a fresh root key and install it.
    pub fn bootstrap(&self) -> Result<(), SpikeError> {
        let root = spike_shamir::generate_root_key(&mut OsRng);
        info!("generated new root key");
        self.install_root_key(root)
    }

    pub fn keyring(&self) -> &Arc<KeyRing> {
        &self.keyring
    }

    pub fn custodian(&self) -> &Arc<ShardCustodian> {
        &self.custodian
    }
}

impl RootKeySink for RootKeyKeeper {
    /// Every fallible step runs before the custodian changes, so a failed
    /// install leaves the previous shard set and keyring in place.
    fn install_root_key(&self, root: RootKey) -> Result<(), SpikeError> {
        let shards = spike_shamir::split_deterministic(&root, self.shares, self.threshold)?;
        let kek = self.keyring.activate(&root)?;
        drop(root);
        self.custodian.replace(shards);

        info!(
            kek_id = kek.id,
            shares = self.shares,
            threshold = self.threshold,
            "root key installed, instance ready"
        );
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.keyring.is_ready()
    }
}
