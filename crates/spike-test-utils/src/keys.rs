// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root key sink that remembers what it was given.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};

use spike_core::{RootKey, RootKeySink, SpikeError, SCALAR_LEN};
use zeroize::Zeroizing;

/// Keeps a copy of the last installed key so tests can compare it.
#[derive(Debug, Default)]
pub struct CapturingRootKeySink {
    last: Mutex<Option<Zeroizing<[u8; SCALAR_LEN]>>>,
    installs: AtomicUsize,
}

impl CapturingRootKeySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the last installed key bytes.
    pub fn installed(&self) -> Option<[u8; SCALAR_LEN]> {
        self.last.lock().unwrap_or_else(PoisonError::into_inner).as_deref().copied()
    }

    pub fn install_count(&self) -> usize {
        self.installs.load(Ordering::SeqCst)
    }
}

impl RootKeySink for CapturingRootKeySink {
    fn install_root_key(&self, root: RootKey) -> Result<(), SpikeError> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(Zeroizing::new(*root.expose()));
        self.installs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.install_count() > 0
    }
}
