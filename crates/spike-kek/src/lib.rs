// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key-encryption keys for Spike.
//!
//! The root key protects exactly one Active KEK, which wraps data keys with
//! AES-256-GCM. When rotation is enabled the Active KEK is periodically
//! retired; Retiring KEKs still decrypt until their grace window closes, and
//! reads that touch them can trigger a throttled rewrap under the Active KEK.

pub mod crypto;
pub mod keyring;
pub mod rewrap;
pub mod scheduler;

pub use keyring::{KekStatus, KekVersion, KeyRing, UnwrappedKey, WrappedKey};
pub use rewrap::{RewrapDecision, RewrapSink, RewrapThrottler, RateWindow};
pub use scheduler::KekRotationScheduler;
