// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator restore: rebuild the root key from shards submitted one at a
//! time across independent invocations.
//!
//! State lives in the long-running server. Submissions are keyed by shard
//! index, so resubmitting an index never advances the count. Reaching the
//! threshold reconstructs the key exactly once and hands it to the
//! [`RootKeySink`].

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use spike_core::{
    authorize, CallerIdentity, Capability, CapabilityChecker, RestoreStatus, RootKeySink, Shard,
    SpikeError,
};
use spike_lock::LockGate;
use spike_shamir::MIN_THRESHOLD;
use tracing::{debug, error, info, warn};

#[derive(Default)]
struct RestoreState {
    shards: BTreeMap<u64, Shard>,
    restored: bool,
}

/// Accumulates restore submissions until the threshold is met.
pub struct RestoreCoordinator {
    checker: Arc<dyn CapabilityChecker>,
    gate: Arc<LockGate>,
    sink: Arc<dyn RootKeySink>,
    shares: usize,
    threshold: usize,
    state: Mutex<RestoreState>,
}

impl RestoreCoordinator {
    pub fn new(
        checker: Arc<dyn CapabilityChecker>,
        gate: Arc<LockGate>,
        sink: Arc<dyn RootKeySink>,
        shares: usize,
        threshold: usize,
    ) -> Result<Self, SpikeError> {
        if threshold < MIN_THRESHOLD || threshold > shares {
            return Err(SpikeError::Config(format!(
                "restore threshold {threshold} must satisfy {MIN_THRESHOLD} <= threshold <= {shares}"
            )));
        }
        Ok(Self {
            checker,
            gate,
            sink,
            shares,
            threshold,
            state: Mutex::new(RestoreState::default()),
        })
    }

    /// Submit one shard in its canonical text form.
    pub fn submit_encoded(
        &self,
        caller: &CallerIdentity,
        encoded: &str,
    ) -> Result<RestoreStatus, SpikeError> {
        authorize(self.checker.as_ref(), caller, Capability::Restore)?;
        self.gate.ensure_unlocked("restore")?;
        let shard = spike_shamir::decode(encoded)?;
        self.accept(caller, shard)
    }

    /// Submit one already-decoded shard.
    pub fn submit(&self, caller: &CallerIdentity, shard: Shard) -> Result<RestoreStatus, SpikeError> {
        authorize(self.checker.as_ref(), caller, Capability::Restore)?;
        self.gate.ensure_unlocked("restore")?;
        self.accept(caller, shard)
    }

    /// Current progress. Read-only and always permitted.
    pub fn status(&self) -> RestoreStatus {
        let state = self.lock_state();
        self.status_of(&state)
    }

    fn accept(&self, caller: &CallerIdentity, shard: Shard) -> Result<RestoreStatus, SpikeError> {
        spike_shamir::check_shard(&shard)?;
        if shard.index() > self.shares as u64 {
            return Err(SpikeError::Input(format!(
                "shard index {} is outside 1..={}",
                shard.index(),
                self.shares
            )));
        }

        let mut state = self.lock_state();
        if state.restored || self.sink.is_ready() {
            return Err(SpikeError::AlreadyRestored);
        }

        let index = shard.index();
        match state.shards.get(&index) {
            Some(existing) if *existing != shard => {
                warn!(caller = %caller, index, "conflicting resubmission ignored");
            }
            Some(_) => debug!(caller = %caller, index, "duplicate shard ignored"),
            None => {
                state.shards.insert(index, shard);
                debug!(caller = %caller, index, "shard accepted");
            }
        }

        if state.shards.len() < self.threshold {
            let status = self.status_of(&state);
            info!(
                collected = status.shards_collected,
                remaining = status.shards_remaining,
                "restore in progress"
            );
            return Ok(status);
        }

        let collected: Vec<Shard> = std::mem::take(&mut state.shards).into_values().collect();
        let root = match spike_shamir::reconstruct(&collected, self.threshold) {
            Ok(root) => root,
            Err(e) => {
                error!(error = %e, "restore reconstruction failed, submissions discarded");
                return Err(e);
            }
        };
        drop(collected);

        if let Err(e) = self.sink.install_root_key(root) {
            error!(error = %e, "restored key could not be installed, submissions discarded");
            return Err(e);
        }

        state.restored = true;
        info!(caller = %caller, "root key restored");
        Ok(self.status_of(&state))
    }

    fn status_of(&self, state: &RestoreState) -> RestoreStatus {
        if state.restored || self.sink.is_ready() {
            return RestoreStatus {
                shards_collected: self.threshold,
                shards_remaining: 0,
                restored: true,
            };
        }
        let collected = state.shards.len();
        RestoreStatus {
            shards_collected: collected,
            shards_remaining: self.threshold.saturating_sub(collected),
            restored: false,
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RestoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
