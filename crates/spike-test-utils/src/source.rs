// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock shard source for recover tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use spike_core::{Shard, ShardSource, SpikeError};

enum Reply {
    Shards(Vec<Shard>),
    Unreachable(String),
}

/// Returns canned shards (truncated to the requested count), or a
/// connectivity failure, optionally after a delay.
pub struct MockShardSource {
    reply: Reply,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockShardSource {
    pub fn with_shards(shards: Vec<Shard>) -> Self {
        Self {
            reply: Reply::Shards(shards),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// A peer that cannot be reached.
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self {
            reply: Reply::Unreachable(message.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShardSource for MockShardSource {
    async fn fetch_shards(&self, count: usize) -> Result<Vec<Shard>, SpikeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Reply::Shards(shards) => Ok(shards.iter().take(count).cloned().collect()),
            Reply::Unreachable(message) => Err(SpikeError::Connectivity {
                message: message.clone(),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn truncates_to_requested_count() {
        let shards = (1..=4).map(|i| Shard::new(i, [i as u8; 32])).collect();
        let source = MockShardSource::with_shards(shards);
        let got = source.fetch_shards(2).await.unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[1].index(), 2);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn unreachable_peer_reports_connectivity() {
        let source = MockShardSource::unreachable("connection refused");
        let err = source.fetch_shards(3).await.unwrap_err();
        assert!(matches!(err, SpikeError::Connectivity { .. }));
    }
}
