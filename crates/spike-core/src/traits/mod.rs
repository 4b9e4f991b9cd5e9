// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborator traits at the seams of the root-key lifecycle.
//!
//! Coordinators depend on these narrow interfaces so production backends
//! (files, HTTP peers) and in-memory test doubles are interchangeable.

pub mod authz;
pub mod keys;
pub mod lock;
pub mod source;

pub use authz::{authorize, CapabilityChecker};
pub use keys::RootKeySink;
pub use lock::LockStore;
pub use source::ShardSource;
