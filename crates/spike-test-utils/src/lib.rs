// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test doubles for Spike integration tests.
//!
//! # Components
//!
//! - [`MockShardSource`] - shard source with canned shards, failures, or delay
//! - [`StaticCapabilities`], [`AllowAll`] - capability checkers
//! - [`CapturingRootKeySink`] - records the last installed root key
//! - [`RecordingRewrapSink`] - records (or rejects) lazy rewrap results

pub mod caps;
pub mod keys;
pub mod rewrap;
pub mod source;

pub use caps::{AllowAll, StaticCapabilities};
pub use keys::CapturingRootKeySink;
pub use rewrap::RecordingRewrapSink;
pub use source::MockShardSource;
