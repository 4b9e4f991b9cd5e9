// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rate-limited lazy rewrap.
//!
//! A read that decrypts under a Retiring KEK offers the item for migration.
//! A shared rate window admits at most `max_rewrap_qps` migrations in any
//! one-second span; anything over budget is deferred and simply offered again on its
//! next read. Migration runs in the background and its failures are logged,
//! never returned to the reader.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use spike_core::SpikeError;
use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::keyring::{KeyRing, UnwrappedKey, WrappedKey};

/// Persists an item's new wrapping after a successful rewrap.
#[async_trait]
pub trait RewrapSink: Send + Sync + 'static {
    async fn store_rewrapped(&self, item_id: &str, wrapped: WrappedKey) -> Result<(), SpikeError>;
}

/// Outcome of offering an item for migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewrapDecision {
    /// Already under the Active KEK.
    NotNeeded,
    /// Lazy rewrap is turned off.
    Disabled,
    /// Over budget; the item stays eligible.
    Deferred,
    /// A background migration was started.
    Scheduled,
}

/// Non-blocking sliding-window limiter: at most `rate` admissions in any
/// one-second span.
#[derive(Debug)]
pub struct RateWindow {
    rate: usize,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    const SPAN: Duration = Duration::from_secs(1);

    pub fn new(rate: u32) -> Self {
        let rate = usize::try_from(rate.max(1)).unwrap_or(usize::MAX);
        Self {
            rate,
            admitted: Mutex::new(VecDeque::with_capacity(rate.min(1024))),
        }
    }

    pub fn try_acquire(&self) -> bool {
        self.try_acquire_at(Instant::now())
    }

    /// Admit one request at `now` unless `rate` were admitted during the
    /// preceding second. Never waits.
    pub fn try_acquire_at(&self, now: Instant) -> bool {
        let mut admitted = self.admitted.lock().unwrap_or_else(PoisonError::into_inner);

        while admitted
            .front()
            .is_some_and(|&t| now.saturating_duration_since(t) >= Self::SPAN)
        {
            admitted.pop_front();
        }

        if admitted.len() < self.rate {
            admitted.push_back(now);
            true
        } else {
            false
        }
    }
}

/// Schedules background migrations from Retiring KEKs to the Active KEK.
pub struct RewrapThrottler {
    keyring: Arc<KeyRing>,
    sink: Arc<dyn RewrapSink>,
    window: RateWindow,
    enabled: bool,
    tasks: TaskTracker,
}

impl RewrapThrottler {
    /// Build from the keyring's own policy (`lazy_rewrap_enabled`,
    /// `max_rewrap_qps`).
    pub fn new(keyring: Arc<KeyRing>, sink: Arc<dyn RewrapSink>) -> Self {
        let policy = *keyring.scheduler().policy();
        Self {
            keyring,
            sink,
            window: RateWindow::new(policy.max_rewrap_qps),
            enabled: policy.lazy_rewrap_enabled,
            tasks: TaskTracker::new(),
        }
    }

    /// Read path: unwrap `wrapped` and, if it sits under a Retiring KEK,
    /// offer it for migration. Only unwrap failures reach the caller.
    pub fn unwrap_for_read(
        &self,
        item_id: &str,
        wrapped: &WrappedKey,
    ) -> Result<Zeroizing<Vec<u8>>, SpikeError> {
        let unwrapped = self.keyring.unwrap(wrapped)?;
        self.offer(item_id, wrapped, &unwrapped);
        Ok(unwrapped.plaintext)
    }

    /// Offer an item that was just read. Must be called inside a Tokio
    /// runtime.
    pub fn offer(
        &self,
        item_id: &str,
        wrapped: &WrappedKey,
        unwrapped: &UnwrappedKey,
    ) -> RewrapDecision {
        if !unwrapped.needs_rewrap {
            return RewrapDecision::NotNeeded;
        }
        if !self.enabled {
            return RewrapDecision::Disabled;
        }
        if !self.window.try_acquire() {
            debug!(item_id, kek_id = wrapped.kek_id, "rewrap deferred, over budget");
            return RewrapDecision::Deferred;
        }

        let keyring = Arc::clone(&self.keyring);
        let sink = Arc::clone(&self.sink);
        let item_id = item_id.to_string();
        let wrapped = wrapped.clone();
        self.tasks.spawn(async move {
            let from = wrapped.kek_id;
            let result = match keyring.rewrap_at(&wrapped, chrono::Utc::now()) {
                Ok(rewrapped) => {
                    let to = rewrapped.kek_id;
                    sink.store_rewrapped(&item_id, rewrapped)
                        .await
                        .map(|()| to)
                }
                Err(e) => Err(e),
            };
            match result {
                Ok(to) => debug!(item_id = %item_id, from, to, "item rewrapped"),
                Err(e) => warn!(item_id = %item_id, from, error = %e, "lazy rewrap failed, item stays eligible"),
            }
        });
        RewrapDecision::Scheduled
    }

    /// Number of migrations still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every scheduled migration to finish.
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
        self.tasks.reopen();
    }
}
