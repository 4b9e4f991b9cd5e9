// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable backend for the administrative lock state.

use crate::error::SpikeError;

/// Persists the single `locked` bit so it survives process restarts.
pub trait LockStore: Send + Sync + 'static {
    /// Read the persisted state. Absence of any record means unlocked.
    fn load(&self) -> Result<bool, SpikeError>;

    /// Durably record the new state before it becomes visible.
    fn store(&self, locked: bool) -> Result<(), SpikeError>;
}
