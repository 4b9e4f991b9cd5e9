// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rotation and expiry decisions for KEK versions.
//!
//! Pure functions of the policy, a KEK's metadata, and the current time. The
//! keyring acts on the answers.

use chrono::{DateTime, Duration, Utc};
use spike_config::KekRotationPolicy;

use crate::keyring::KekVersion;

/// Applies a [`KekRotationPolicy`] to KEK metadata.
#[derive(Debug, Clone, Copy)]
pub struct KekRotationScheduler {
    policy: KekRotationPolicy,
}

impl KekRotationScheduler {
    pub fn new(policy: KekRotationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &KekRotationPolicy {
        &self.policy
    }

    pub fn enabled(&self) -> bool {
        self.policy.enabled
    }

    /// Rotation is due once the KEK is older than `rotation_days` or has
    /// wrapped more than `max_wraps` keys. Both bounds are strict.
    pub fn is_due(&self, kek: &KekVersion, now: DateTime<Utc>) -> bool {
        let too_old = Duration::try_days(i64::from(self.policy.rotation_days))
            .is_some_and(|max_age| now.signed_duration_since(kek.created_at) > max_age);
        too_old || kek.wrap_count > self.policy.max_wraps
    }

    /// Last instant a KEK retired at `retired_at` may still decrypt. A window
    /// past the representable range never closes.
    pub fn grace_deadline(&self, retired_at: DateTime<Utc>) -> DateTime<Utc> {
        Duration::try_days(i64::from(self.policy.grace_days))
            .and_then(|grace| retired_at.checked_add_signed(grace))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Whether a KEK retired at `retired_at` is past its grace window.
    pub fn is_expired(&self, retired_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now > self.grace_deadline(retired_at)
    }
}
