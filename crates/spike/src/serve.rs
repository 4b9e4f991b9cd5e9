// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `spike serve` command implementation.
//!
//! Wires the key ring, shard custodian, lock gate and coordinators into the
//! gateway, then serves until SIGTERM/SIGINT. A background task sweeps
//! expired KEKs and performs scheduled rotation.
//!
//! The server starts without a root key and waits for restore. Generating a
//! new key needs `--bootstrap` and a recovery directory with no shard files.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use spike_config::SpikeConfig;
use spike_core::{CapabilityChecker, SpikeError};
use spike_gateway::{start_server, AuthConfig, GatewayState, ServerConfig};
use spike_kek::KeyRing;
use spike_lock::{FileLockStore, LockGate};
use spike_recovery::{
    FileShardStore, RecoveryCoordinator, RestoreCoordinator, RootKeyKeeper, ShardCustodian,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::shutdown::install_signal_handler;

const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(3600);

/// Run `spike serve`.
pub async fn run_serve(config: SpikeConfig, bootstrap: bool) -> Result<(), SpikeError> {
    init_tracing(&config.server.log_level);

    let shares = config.shamir.shares;
    let threshold = config.shamir.threshold;
    let checker: Arc<dyn CapabilityChecker> = Arc::new(config.capabilities.clone());

    let keyring = Arc::new(KeyRing::new(config.kek.policy()));
    let custodian = Arc::new(ShardCustodian::new());
    let keeper = Arc::new(RootKeyKeeper::new(
        keyring.clone(),
        custodian.clone(),
        shares,
        threshold,
    ));

    let lock_store = Arc::new(FileLockStore::new(&config.lock.sentinel_path));
    let gate = Arc::new(LockGate::open(lock_store, checker.clone())?);
    if gate.is_locked() {
        warn!(sentinel = %config.lock.sentinel_path, "starting in locked state");
    }

    prepare_root_key(&keeper, bootstrap, &config.recovery.resolved_directory())?;

    let recovery = Arc::new(RecoveryCoordinator::new(
        custodian,
        checker.clone(),
        shares,
        Duration::from_secs(config.recovery.request_timeout_secs),
    ));
    let restore = Arc::new(RestoreCoordinator::new(
        checker,
        gate.clone(),
        keeper.clone(),
        shares,
        threshold,
    )?);

    let auth = AuthConfig::new(
        config
            .clients
            .iter()
            .map(|c| (c.token.clone(), c.identity.clone())),
    );
    if auth.is_empty() {
        warn!("no clients configured, every API request will be rejected");
    }

    let shutdown = install_signal_handler();
    let maintenance = spawn_maintenance(keyring, gate.clone(), shutdown.clone());

    let state = GatewayState {
        keeper,
        gate,
        recovery,
        restore,
        auth,
        shutdown: shutdown.clone(),
        start_time: Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.server.bind_address.clone(),
        port: config.server.port,
    };

    let result = start_server(&server_config, state).await;

    shutdown.cancel();
    if let Err(e) = maintenance.await {
        warn!(error = %e, "maintenance task ended abnormally");
    }
    info!("spike stopped");
    result
}

/// Generate a root key only on explicit request, and never while shard files
/// from an earlier key are on disk.
fn prepare_root_key(
    keeper: &RootKeyKeeper,
    bootstrap: bool,
    recovery_dir: &Path,
) -> Result<(), SpikeError> {
    if !bootstrap {
        info!("awaiting restore, submit shards with `spike operator restore`");
        return Ok(());
    }

    if recovery_dir.is_dir() {
        let existing = FileShardStore::new(recovery_dir)?.list()?;
        if !existing.is_empty() {
            return Err(SpikeError::Config(format!(
                "refusing to bootstrap: {} holds {} recovery shard files from an earlier root key; \
                 restore from them or remove them first",
                recovery_dir.display(),
                existing.len()
            )));
        }
    }

    warn!("bootstrapping a new root key, data wrapped under any earlier key is unrecoverable");
    keeper.bootstrap()
}

fn spawn_maintenance(
    keyring: Arc<KeyRing>,
    gate: Arc<LockGate>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => run_maintenance(&keyring, &gate, Utc::now()),
            }
        }
        debug!("maintenance task stopped");
    })
}

/// One maintenance pass. Expired material is always destroyed; rotation
/// mutates the key ring and is skipped while the lock is held.
fn run_maintenance(keyring: &KeyRing, gate: &LockGate, now: DateTime<Utc>) {
    if !keyring.is_ready() {
        return;
    }

    let expired = keyring.sweep(now);
    if expired > 0 {
        info!(expired, "expired KEK material destroyed");
    }

    if gate.is_locked() {
        debug!("locked, rotation check skipped");
        return;
    }
    match keyring.rotate_if_due(now) {
        Ok(Some(version)) => info!(kek_id = version.id, "scheduled KEK rotation"),
        Ok(None) => {}
        Err(e) => warn!(error = %e, "KEK rotation check failed"),
    }
}

/// Initialize tracing. `RUST_LOG` overrides the configured level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("spike={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();
}
