// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory KEK keyring.
//!
//! All KEK material sits behind one reader/writer lock. Wrap and unwrap take
//! the read side; activation, rotation, and expiry sweeps take the write
//! side. Wrap counts are atomics so wraps never need the write side.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use spike_config::KekRotationPolicy;
use spike_core::{RootKey, SpikeError};
use strum::Display;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto::{self, KEY_LEN, NONCE_LEN};
use crate::scheduler::KekRotationScheduler;

/// Lifecycle stage of a KEK version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum KekStatus {
    /// Wraps new keys and decrypts. Exactly one at a time.
    Active,
    /// Decrypts only, until its grace window closes.
    Retiring,
    /// Material destroyed. Ciphertext under it is unreadable.
    Expired,
}

/// Public metadata for one KEK version. Never carries key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KekVersion {
    pub id: u32,
    pub created_at: DateTime<Utc>,
    pub retired_at: Option<DateTime<Utc>>,
    pub wrap_count: u64,
    pub status: KekStatus,
}

/// A data key encrypted under a specific KEK version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrappedKey {
    pub kek_id: u32,
    pub nonce: [u8; NONCE_LEN],
    pub ciphertext: Vec<u8>,
}

/// Result of a successful unwrap.
pub struct UnwrappedKey {
    pub plaintext: Zeroizing<Vec<u8>>,
    pub kek_id: u32,
    /// The KEK is Retiring; the item should migrate to the Active KEK.
    pub needs_rewrap: bool,
}

impl std::fmt::Debug for UnwrappedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnwrappedKey")
            .field("plaintext", &"[REDACTED]")
            .field("kek_id", &self.kek_id)
            .field("needs_rewrap", &self.needs_rewrap)
            .finish()
    }
}

struct KekEntry {
    id: u32,
    created_at: DateTime<Utc>,
    retired_at: Option<DateTime<Utc>>,
    status: KekStatus,
    wraps: AtomicU64,
    material: Option<Zeroizing<[u8; KEY_LEN]>>,
}

impl KekEntry {
    fn new(id: u32, material: Zeroizing<[u8; KEY_LEN]>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            retired_at: None,
            status: KekStatus::Active,
            wraps: AtomicU64::new(0),
            material: Some(material),
        }
    }

    fn version(&self) -> KekVersion {
        KekVersion {
            id: self.id,
            created_at: self.created_at,
            retired_at: self.retired_at,
            wrap_count: self.wraps.load(Ordering::Relaxed),
            status: self.status,
        }
    }

    fn material(&self) -> Result<&[u8; KEY_LEN], SpikeError> {
        self.material
            .as_deref()
            .ok_or(SpikeError::KekExpired { kek_id: self.id })
    }
}

struct RingState {
    active: KekEntry,
    retired: Vec<KekEntry>,
}

impl RingState {
    fn find(&self, id: u32) -> Option<&KekEntry> {
        if self.active.id == id {
            return Some(&self.active);
        }
        self.retired.iter().find(|e| e.id == id)
    }

    fn next_id(&self) -> Result<u32, SpikeError> {
        self.active
            .id
            .checked_add(1)
            .ok_or_else(|| SpikeError::Internal("KEK id space exhausted".to_string()))
    }
}

/// Holds the Active KEK and every Retiring or Expired predecessor.
pub struct KeyRing {
    state: RwLock<Option<RingState>>,
    scheduler: KekRotationScheduler,
}

impl KeyRing {
    pub fn new(policy: KekRotationPolicy) -> Self {
        Self {
            state: RwLock::new(None),
            scheduler: KekRotationScheduler::new(policy),
        }
    }

    pub fn scheduler(&self) -> &KekRotationScheduler {
        &self.scheduler
    }

    /// Whether a root key has activated the keyring.
    pub fn is_ready(&self) -> bool {
        self.read().is_some()
    }

    /// Derive the initial KEK from `root` and make it Active.
    ///
    /// Replaces any previous state. The caller remains responsible for
    /// dropping `root`.
    pub fn activate(&self, root: &RootKey) -> Result<KekVersion, SpikeError> {
        let material = crypto::derive_initial_kek(root)?;
        let entry = KekEntry::new(1, material, Utc::now());
        let version = entry.version();

        *self.write() = Some(RingState {
            active: entry,
            retired: Vec::new(),
        });
        info!(kek_id = version.id, "keyring activated");
        Ok(version)
    }

    pub fn wrap(&self, data_key: &[u8]) -> Result<WrappedKey, SpikeError> {
        self.wrap_at(data_key, Utc::now())
    }

    /// Wrap `data_key` under the Active KEK, rotating first when the policy
    /// is enabled and rotation is due.
    pub fn wrap_at(&self, data_key: &[u8], now: DateTime<Utc>) -> Result<WrappedKey, SpikeError> {
        if self.scheduler.enabled() && self.rotation_due(now) {
            self.rotate_if_due(now)?;
        }

        let guard = self.read();
        let state = guard.as_ref().ok_or(SpikeError::NotReady)?;
        let active = &state.active;
        let (ciphertext, nonce) = crypto::seal(active.material()?, &aad(active.id), data_key)?;
        active.wraps.fetch_add(1, Ordering::Relaxed);

        Ok(WrappedKey {
            kek_id: active.id,
            nonce,
            ciphertext,
        })
    }

    pub fn unwrap(&self, wrapped: &WrappedKey) -> Result<UnwrappedKey, SpikeError> {
        self.unwrap_at(wrapped, Utc::now())
    }

    /// Decrypt a wrapped key.
    ///
    /// Retiring KEKs decrypt until their grace deadline even if no sweep has
    /// run yet; past it the result is [`SpikeError::KekExpired`].
    pub fn unwrap_at(
        &self,
        wrapped: &WrappedKey,
        now: DateTime<Utc>,
    ) -> Result<UnwrappedKey, SpikeError> {
        let guard = self.read();
        let state = guard.as_ref().ok_or(SpikeError::NotReady)?;
        let entry = state.find(wrapped.kek_id).ok_or(SpikeError::KekUnknown {
            kek_id: wrapped.kek_id,
        })?;

        let needs_rewrap = match entry.status {
            KekStatus::Active => false,
            KekStatus::Retiring => {
                let expired = entry
                    .retired_at
                    .is_some_and(|at| self.scheduler.is_expired(at, now));
                if expired {
                    return Err(SpikeError::KekExpired { kek_id: entry.id });
                }
                true
            }
            KekStatus::Expired => return Err(SpikeError::KekExpired { kek_id: entry.id }),
        };

        let plaintext = crypto::open(
            entry.material()?,
            &aad(entry.id),
            &wrapped.nonce,
            &wrapped.ciphertext,
        )?;

        Ok(UnwrappedKey {
            plaintext,
            kek_id: entry.id,
            needs_rewrap,
        })
    }

    /// Re-encrypt `wrapped` under the Active KEK. Already-current items are
    /// returned unchanged.
    pub fn rewrap_at(
        &self,
        wrapped: &WrappedKey,
        now: DateTime<Utc>,
    ) -> Result<WrappedKey, SpikeError> {
        let unwrapped = self.unwrap_at(wrapped, now)?;
        if !unwrapped.needs_rewrap {
            return Ok(wrapped.clone());
        }
        self.wrap_at(&unwrapped.plaintext, now)
    }

    /// Sweep expired KEKs, then rotate if the policy is enabled and due.
    ///
    /// Returns the new Active version when a rotation happened.
    pub fn rotate_if_due(&self, now: DateTime<Utc>) -> Result<Option<KekVersion>, SpikeError> {
        if !self.scheduler.enabled() {
            return Ok(None);
        }

        let mut guard = self.write();
        let state = guard.as_mut().ok_or(SpikeError::NotReady)?;
        self.sweep_state(state, now);

        // Re-check under the write lock; a concurrent wrap may have rotated.
        if !self.scheduler.is_due(&state.active.version(), now) {
            return Ok(None);
        }
        rotate_state(state, now).map(Some)
    }

    /// Rotate unconditionally.
    pub fn rotate_at(&self, now: DateTime<Utc>) -> Result<KekVersion, SpikeError> {
        let mut guard = self.write();
        let state = guard.as_mut().ok_or(SpikeError::NotReady)?;
        rotate_state(state, now)
    }

    /// Move Retiring KEKs past their grace window to Expired and destroy
    /// their material. Returns how many expired.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let mut guard = self.write();
        match guard.as_mut() {
            Some(state) => self.sweep_state(state, now),
            None => 0,
        }
    }

    /// Metadata for every version, Active first.
    pub fn versions(&self) -> Vec<KekVersion> {
        let guard = self.read();
        match guard.as_ref() {
            Some(state) => std::iter::once(&state.active)
                .chain(state.retired.iter())
                .map(KekEntry::version)
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn active_version(&self) -> Option<KekVersion> {
        self.read().as_ref().map(|s| s.active.version())
    }

    fn rotation_due(&self, now: DateTime<Utc>) -> bool {
        self.read()
            .as_ref()
            .is_some_and(|s| self.scheduler.is_due(&s.active.version(), now))
    }

    fn sweep_state(&self, state: &mut RingState, now: DateTime<Utc>) -> usize {
        let mut expired = 0;
        for entry in &mut state.retired {
            if entry.status != KekStatus::Retiring {
                continue;
            }
            let past_grace = entry
                .retired_at
                .is_some_and(|at| self.scheduler.is_expired(at, now));
            if past_grace {
                entry.status = KekStatus::Expired;
                entry.material = None;
                expired += 1;
                info!(kek_id = entry.id, "KEK expired, material destroyed");
            }
        }
        expired
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<RingState>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<RingState>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for KeyRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyRing")
            .field("versions", &self.versions())
            .finish_non_exhaustive()
    }
}

fn rotate_state(state: &mut RingState, now: DateTime<Utc>) -> Result<KekVersion, SpikeError> {
    let next_id = state.next_id()?;
    let fresh = KekEntry::new(next_id, crypto::generate_random_key()?, now);

    let mut previous = std::mem::replace(&mut state.active, fresh);
    previous.status = KekStatus::Retiring;
    previous.retired_at = Some(now);
    debug!(
        kek_id = previous.id,
        wrap_count = previous.wraps.load(Ordering::Relaxed),
        "KEK retiring"
    );
    info!(retired = previous.id, active = next_id, "KEK rotated");
    state.retired.push(previous);

    Ok(state.active.version())
}

fn aad(kek_id: u32) -> [u8; 4] {
    kek_id.to_be_bytes()
}
