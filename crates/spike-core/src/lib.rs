// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Spike root-key lifecycle.
//!
//! This crate provides the error taxonomy, the shared key and shard types,
//! and the collaborator traits every other Spike crate is written against.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, SpikeError};
pub use types::{CallerIdentity, Capability, RestoreStatus, RootKey, Shard, SCALAR_LEN};

pub use traits::{authorize, CapabilityChecker, LockStore, RootKeySink, ShardSource};
