// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root key recovery for Spike.
//!
//! `recover` pulls the shard set from a live instance and writes one file per
//! shard for offline custody. `restore` runs inside a server awaiting its
//! root key: operators submit shards one at a time until the threshold is
//! met and the key is rebuilt.

pub mod keeper;
pub mod recover;
pub mod restore;
pub mod store;

pub use keeper::{RootKeyKeeper, ShardCustodian};
pub use recover::{fetch_with_deadline, validate_batch, RecoveryCoordinator};
pub use restore::RestoreCoordinator;
pub use store::FileShardStore;
