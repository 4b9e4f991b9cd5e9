// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Administrative lock gate for Spike.
//!
//! The gate is a durable two-state switch. Every mutating entry point calls
//! [`LockGate::ensure_unlocked`]; read-only status queries never consult it.

pub mod gate;
pub mod store;

pub use gate::LockGate;
pub use store::{FileLockStore, MemoryLockStore};
