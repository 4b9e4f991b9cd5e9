// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator recover: obtain the full shard set from a live instance.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use spike_core::{authorize, CallerIdentity, Capability, CapabilityChecker, Shard, ShardSource, SpikeError};
use spike_shamir::MIN_THRESHOLD;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Serves `recover` requests against a shard source.
pub struct RecoveryCoordinator {
    source: Arc<dyn ShardSource>,
    checker: Arc<dyn CapabilityChecker>,
    shares: usize,
    timeout: Duration,
}

impl RecoveryCoordinator {
    /// `shares` is the configured N; every request asks for exactly that many.
    pub fn new(
        source: Arc<dyn ShardSource>,
        checker: Arc<dyn CapabilityChecker>,
        shares: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            checker,
            shares,
            timeout,
        }
    }

    /// Authorize `caller`, fetch N shards, and vet the batch.
    ///
    /// The returned shards zero themselves when dropped, on every path.
    pub async fn recover(
        &self,
        caller: &CallerIdentity,
        cancel: &CancellationToken,
    ) -> Result<Vec<Shard>, SpikeError> {
        authorize(self.checker.as_ref(), caller, Capability::Recover)?;

        let shards = fetch_with_deadline(self.source.as_ref(), self.shares, self.timeout, cancel).await?;
        validate_batch(&shards)?;

        info!(caller = %caller, count = shards.len(), "recover served");
        Ok(shards)
    }
}

/// Fetch `count` shards, giving up after `timeout` or on cancellation.
pub async fn fetch_with_deadline(
    source: &dyn ShardSource,
    count: usize,
    timeout: Duration,
    cancel: &CancellationToken,
) -> Result<Vec<Shard>, SpikeError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(SpikeError::Cancelled),
        result = tokio::time::timeout(timeout, source.fetch_shards(count)) => match result {
            Ok(fetched) => fetched,
            Err(_) => Err(SpikeError::Timeout { duration: timeout }),
        },
    }
}

/// Reject a batch that could never rebuild the key or contains corrupt
/// material. All or nothing.
pub fn validate_batch(shards: &[Shard]) -> Result<(), SpikeError> {
    if shards.len() < MIN_THRESHOLD {
        warn!(received = shards.len(), "recover batch too small");
        return Err(SpikeError::Quorum {
            collected: shards.len(),
            required: MIN_THRESHOLD,
        });
    }

    let mut seen = HashSet::with_capacity(shards.len());
    for shard in shards {
        spike_shamir::check_shard(shard)?;
        if !seen.insert(shard.index()) {
            return Err(SpikeError::Integrity(format!(
                "recover batch repeats shard index {}",
                shard.index()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use spike_test_utils::{AllowAll, MockShardSource, StaticCapabilities};

    fn live_shards(n: u64) -> Vec<Shard> {
        (1..=n)
            .map(|i| {
                let mut value = [0u8; 32];
                value[0] = i as u8;
                Shard::new(i, value)
            })
            .collect()
    }

    fn coordinator(source: MockShardSource) -> (RecoveryCoordinator, Arc<MockShardSource>) {
        let source = Arc::new(source);
        let coordinator = RecoveryCoordinator::new(
            source.clone(),
            Arc::new(AllowAll),
            3,
            Duration::from_secs(5),
        );
        (coordinator, source)
    }

    fn operator() -> CallerIdentity {
        CallerIdentity::new("spiffe://spike/pilot-recover")
    }

    #[tokio::test]
    async fn returns_configured_count() {
        let (coordinator, _) = coordinator(MockShardSource::with_shards(live_shards(5)));
        let shards = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(shards.len(), 3);
    }

    #[tokio::test]
    async fn unauthorized_caller_never_reaches_source() {
        let source = Arc::new(MockShardSource::with_shards(live_shards(3)));
        let caps = StaticCapabilities::new().grant("spiffe://spike/pilot-recover", Capability::Restore);
        let coordinator =
            RecoveryCoordinator::new(source.clone(), Arc::new(caps), 3, Duration::from_secs(5));

        let err = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpikeError::Authorization { .. }));
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn single_shard_batch_is_rejected() {
        let (coordinator, _) = coordinator(MockShardSource::with_shards(live_shards(1)));
        let err = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpikeError::Quorum { collected: 1, required: 2 }));
    }

    #[tokio::test]
    async fn zero_shard_rejects_whole_batch() {
        let mut shards = live_shards(3);
        shards[1] = Shard::new(2, [0u8; 32]);
        let (coordinator, _) = coordinator(MockShardSource::with_shards(shards));
        let err = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpikeError::Integrity(_)));
    }

    #[tokio::test]
    async fn unreachable_peer_surfaces_connectivity() {
        let (coordinator, _) = coordinator(MockShardSource::unreachable("connection refused"));
        let err = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpikeError::Connectivity { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_peer_times_out() {
        let slow = MockShardSource::with_shards(live_shards(3)).with_delay(Duration::from_secs(60));
        let (coordinator, _) = coordinator(slow);
        let err = coordinator
            .recover(&operator(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, SpikeError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_aborts_fetch() {
        let slow = MockShardSource::with_shards(live_shards(3)).with_delay(Duration::from_secs(60));
        let (coordinator, _) = coordinator(slow);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = coordinator.recover(&operator(), &cancel).await.unwrap_err();
        assert!(matches!(err, SpikeError::Cancelled));
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let mut shards = live_shards(2);
        shards.push(live_shards(1).remove(0));
        assert!(matches!(validate_batch(&shards), Err(SpikeError::Integrity(_))));
    }
}
