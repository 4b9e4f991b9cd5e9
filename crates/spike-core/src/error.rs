// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Spike root-key lifecycle.

use strum::{Display, EnumString};
use thiserror::Error;

use crate::types::Capability;

/// The primary error type used across coordinators, the lock gate, and the keyring.
#[derive(Debug, Error)]
pub enum SpikeError {
    /// Malformed shard encoding, wrong byte length, or non-numeric index.
    /// Safe to retry with corrected input; accumulated state is untouched.
    #[error("invalid input: {0}")]
    Input(String),

    /// Too few distinct shards, or duplicate indices, at reconstruction time.
    #[error("quorum not met: {collected} distinct shard(s), {required} required")]
    Quorum { collected: usize, required: usize },

    /// Key material failed verification (all-zero shard, failed self-check,
    /// inconsistent shard set). The operation is aborted.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// The caller does not hold the capability the operation requires.
    #[error("caller `{caller}` is not authorized for `{capability}`")]
    Authorization {
        caller: String,
        capability: Capability,
    },

    /// Filesystem or backend failure (unwritable directory, path traversal,
    /// listing failure).
    #[error("storage error: {message}")]
    Storage {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The system is administratively locked; mutations are refused.
    #[error("system is locked: {operation} refused until an operator unlocks it")]
    Locked { operation: String },

    /// No root key has been installed yet (awaiting bootstrap or restore).
    #[error("root key not available: system is awaiting restore")]
    NotReady,

    /// A restore submission arrived after the root key was already rebuilt.
    #[error("system already restored: submission ignored")]
    AlreadyRestored,

    /// The KEK that wrapped this data is past its grace window.
    #[error("key-encryption key {kek_id} has expired and can no longer decrypt")]
    KekExpired { kek_id: u32 },

    /// The wrapped data references a KEK this keyring has never seen.
    #[error("unknown key-encryption key {kek_id}")]
    KekUnknown { kek_id: u32 },

    /// AEAD or randomness failure.
    #[error("cryptographic failure: {0}")]
    Crypto(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Failure talking to a peer instance over the trusted channel.
    #[error("connectivity error: {message}")]
    Connectivity {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A peer instance refused the request and reported why.
    #[error("peer refused request ({kind}): {message}")]
    Remote { kind: ErrorKind, message: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`SpikeError`] for boundary layers (HTTP status
/// mapping, CLI exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Quorum,
    Integrity,
    Authorization,
    Storage,
    Locked,
    NotReady,
    Conflict,
    Expired,
    Connectivity,
    Timeout,
    Internal,
}

impl SpikeError {
    /// Convenience constructor for storage errors wrapping an I/O failure.
    pub fn storage(message: impl Into<String>, source: std::io::Error) -> Self {
        SpikeError::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Convenience constructor for connectivity errors.
    pub fn connectivity<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        SpikeError::Connectivity {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SpikeError::Input(_) => ErrorKind::Input,
            SpikeError::Quorum { .. } => ErrorKind::Quorum,
            SpikeError::Integrity(_) | SpikeError::Crypto(_) => ErrorKind::Integrity,
            SpikeError::Authorization { .. } => ErrorKind::Authorization,
            SpikeError::Storage { .. } => ErrorKind::Storage,
            SpikeError::Locked { .. } => ErrorKind::Locked,
            SpikeError::NotReady => ErrorKind::NotReady,
            SpikeError::AlreadyRestored => ErrorKind::Conflict,
            SpikeError::KekExpired { .. } | SpikeError::KekUnknown { .. } => ErrorKind::Expired,
            SpikeError::Connectivity { .. } => ErrorKind::Connectivity,
            SpikeError::Remote { kind, .. } => *kind,
            SpikeError::Timeout { .. } | SpikeError::Cancelled => ErrorKind::Timeout,
            SpikeError::Config(_) | SpikeError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether resubmitting (possibly with different input) can succeed
    /// without operator intervention on the server.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Input
                | ErrorKind::Quorum
                | ErrorKind::Locked
                | ErrorKind::Connectivity
                | ErrorKind::Timeout
        )
    }
}
