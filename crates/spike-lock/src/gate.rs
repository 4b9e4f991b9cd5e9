// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The lock gate: a durable switch consulted by every mutating operation.
//!
//! Reads are a single atomic load. Writers are serialized by a mutex and
//! persist the new state before publishing it, so a crash between the two
//! leaves the durable record authoritative on the next start.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use spike_core::{authorize, CallerIdentity, Capability, CapabilityChecker, LockStore, SpikeError};
use tracing::{debug, info};

/// Administrative lock shared by the restore path, rotation, and any other
/// mutation.
pub struct LockGate {
    locked: AtomicBool,
    writer: Mutex<()>,
    store: Arc<dyn LockStore>,
    checker: Arc<dyn CapabilityChecker>,
}

impl LockGate {
    /// Open the gate in whatever state the store last recorded.
    pub fn open(
        store: Arc<dyn LockStore>,
        checker: Arc<dyn CapabilityChecker>,
    ) -> Result<Self, SpikeError> {
        let locked = store.load()?;
        if locked {
            info!("lock gate opened in locked state");
        } else {
            debug!("lock gate opened unlocked");
        }
        Ok(Self {
            locked: AtomicBool::new(locked),
            writer: Mutex::new(()),
            store,
            checker,
        })
    }

    /// Current state. Never blocks.
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    /// Lock the system. Locking an already-locked system is a no-op.
    pub fn lock(&self, caller: &CallerIdentity) -> Result<(), SpikeError> {
        authorize(self.checker.as_ref(), caller, Capability::Lock)?;
        self.transition(caller, true)
    }

    /// Unlock the system. Unlocking an already-unlocked system is a no-op.
    pub fn unlock(&self, caller: &CallerIdentity) -> Result<(), SpikeError> {
        authorize(self.checker.as_ref(), caller, Capability::Unlock)?;
        self.transition(caller, false)
    }

    /// Refuse `operation` while the system is locked.
    pub fn ensure_unlocked(&self, operation: &str) -> Result<(), SpikeError> {
        if self.is_locked() {
            debug!(operation, "refused by lock gate");
            return Err(SpikeError::Locked {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    fn transition(&self, caller: &CallerIdentity, target: bool) -> Result<(), SpikeError> {
        // The mutex guards no data, so a poisoned guard is still usable.
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);

        if self.locked.load(Ordering::Acquire) == target {
            debug!(caller = %caller, locked = target, "lock state unchanged");
            return Ok(());
        }

        self.store.store(target)?;
        self.locked.store(target, Ordering::Release);
        info!(caller = %caller, locked = target, "lock state changed");
        Ok(())
    }
}

impl std::fmt::Debug for LockGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockGate")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}
