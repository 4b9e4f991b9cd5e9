// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and response bodies shared by the server and [`crate::HttpPeer`].

use serde::{Deserialize, Serialize};
use spike_core::RestoreStatus;
use zeroize::Zeroizing;

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Response body for GET /v1/status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    /// A root key is installed and the keyring is active.
    pub ready: bool,
    pub locked: bool,
    pub restore: RestoreStatus,
    /// Id of the Active KEK, once ready.
    pub active_kek: Option<u32>,
}

/// Response body for POST /v1/operator/recover. Each entry is an encoded
/// shard, wiped when the body is dropped.
#[derive(Serialize, Deserialize)]
pub struct RecoverResponse {
    pub shards: Vec<Zeroizing<String>>,
}

impl std::fmt::Debug for RecoverResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoverResponse")
            .field("shards", &self.shards.len())
            .finish()
    }
}

/// Request body for POST /v1/operator/restore.
#[derive(Serialize, Deserialize)]
pub struct RestoreRequest {
    pub shard: Zeroizing<String>,
}

impl std::fmt::Debug for RestoreRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RestoreRequest([REDACTED])")
    }
}

/// Response body for POST /v1/operator/lock and /unlock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LockResponse {
    pub locked: bool,
}

/// Error body for every non-2xx response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Snake-case error kind (see `spike_core::ErrorKind`).
    pub kind: String,
    pub message: String,
}
