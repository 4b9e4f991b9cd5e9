// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel used by operator recover to obtain shards from a live instance.

use async_trait::async_trait;

use crate::error::SpikeError;
use crate::types::Shard;

/// A healthy instance that currently holds the live root key.
#[async_trait]
pub trait ShardSource: Send + Sync + 'static {
    /// Request `count` shards. Transport failures surface as
    /// [`SpikeError::Connectivity`].
    async fn fetch_shards(&self, count: usize) -> Result<Vec<Shard>, SpikeError>;
}
