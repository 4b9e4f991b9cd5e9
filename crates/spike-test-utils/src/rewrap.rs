// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rewrap sink that records results in memory.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use spike_core::SpikeError;
use spike_kek::{RewrapSink, WrappedKey};
use tokio::sync::Mutex;

/// Records every stored rewrap, or rejects them all when failing.
#[derive(Debug, Default)]
pub struct RecordingRewrapSink {
    stored: Mutex<Vec<(String, WrappedKey)>>,
    failing: AtomicBool,
}

impl RecordingRewrapSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every write fails with a storage error.
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub async fn stored(&self) -> Vec<(String, WrappedKey)> {
        self.stored.lock().await.clone()
    }
}

#[async_trait]
impl RewrapSink for RecordingRewrapSink {
    async fn store_rewrapped(&self, item_id: &str, wrapped: WrappedKey) -> Result<(), SpikeError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SpikeError::Storage {
                message: format!("rewrap sink rejected {item_id}"),
                source: None,
            });
        }
        self.stored.lock().await.push((item_id.to_string(), wrapped));
        Ok(())
    }
}
