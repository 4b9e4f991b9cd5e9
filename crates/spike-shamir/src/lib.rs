// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shamir secret sharing for the Spike root key.
//!
//! [`shamir`] splits and reconstructs the key over the Ed25519 scalar field;
//! [`codec`] converts shards to and from their canonical text form.

pub mod codec;
pub mod shamir;

pub use codec::{decode, encode, SHARD_PREFIX};
pub use shamir::{
    check_shard, generate_root_key, reconstruct, split, split_deterministic, MIN_THRESHOLD,
};
