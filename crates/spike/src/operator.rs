// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spike operator` command implementations.
//!
//! Every command talks to the server at `operator.server_url` with the
//! operator's bearer token. Shard text is never printed or logged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use spike_config::SpikeConfig;
use spike_core::{Shard, SpikeError};
use spike_gateway::HttpPeer;
use spike_recovery::{fetch_with_deadline, validate_batch, FileShardStore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::prompt::read_shard;

/// Build the client for the configured server.
pub(crate) fn operator_peer(config: &SpikeConfig) -> Result<HttpPeer, SpikeError> {
    let token = config.operator.token.as_deref().filter(|t| !t.is_empty()).ok_or_else(|| {
        SpikeError::Config(
            "no operator token: set operator.token or SPIKE_OPERATOR_TOKEN".to_string(),
        )
    })?;
    HttpPeer::new(
        config.operator.server_url.as_str(),
        SecretString::from(token.to_string()),
        Duration::from_secs(config.recovery.request_timeout_secs),
    )
}

/// Run `spike operator recover`: fetch all N shards and write one file each.
pub async fn run_recover(config: &SpikeConfig, dir: Option<PathBuf>) -> Result<(), SpikeError> {
    let peer = operator_peer(config)?;
    let dir = dir.unwrap_or_else(|| config.recovery.resolved_directory());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let files = recover_to_dir(
        &peer,
        config.shamir.shares,
        Duration::from_secs(config.recovery.request_timeout_secs),
        &dir,
        &cancel,
    )
    .await?;

    println!("Wrote {} recovery shards to {}", files.len(), dir.display());
    for file in &files {
        println!("  {}", file.display());
    }
    println!("Store each file with a different custodian, then delete this directory.");
    Ok(())
}

/// Fetch, vet and persist. Files are only touched once the batch passed
/// validation, so a failed run leaves earlier exports intact.
async fn recover_to_dir(
    peer: &HttpPeer,
    shares: usize,
    timeout: Duration,
    dir: &Path,
    cancel: &CancellationToken,
) -> Result<Vec<PathBuf>, SpikeError> {
    let shards: Vec<Shard> = fetch_with_deadline(peer, shares, timeout, cancel).await?;
    validate_batch(&shards)?;

    let store = FileShardStore::new(dir)?;
    let files = store.replace_all(&shards)?;
    info!(count = files.len(), dir = %store.dir().display(), "recovery shards written");
    Ok(files)
}

/// Run `spike operator restore`: submit one shard and report progress.
pub async fn run_restore(config: &SpikeConfig) -> Result<(), SpikeError> {
    let peer = operator_peer(config)?;
    let shard = read_shard()?;
    let status = submit_shard(&peer, &shard).await?;

    if status.restored {
        println!("Root key restored. The server is ready.");
    } else {
        println!(
            "Shard accepted ({} collected, {} more needed).",
            status.shards_collected, status.shards_remaining
        );
    }
    Ok(())
}

async fn submit_shard(
    peer: &HttpPeer,
    shard: &SecretString,
) -> Result<spike_core::RestoreStatus, SpikeError> {
    peer.restore(shard.expose_secret()).await
}

/// Run `spike operator lock` or `spike operator unlock`. Repeating the
/// current state succeeds.
pub async fn run_set_lock(config: &SpikeConfig, locked: bool) -> Result<(), SpikeError> {
    let peer = operator_peer(config)?;
    let now_locked = if locked {
        peer.lock().await?
    } else {
        peer.unlock().await?
    };
    println!(
        "Server is {}.",
        if now_locked { "locked" } else { "unlocked" }
    );
    Ok(())
}
