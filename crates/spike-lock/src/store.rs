// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lock state backends.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use spike_core::{LockStore, SpikeError};
use tracing::debug;

/// Sentinel-file backend: the file's presence means locked.
///
/// The file body is informational only (a timestamp for operators).
#[derive(Debug, Clone)]
pub struct FileLockStore {
    path: PathBuf,
}

impl FileLockStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_sentinel(&self) -> Result<(), SpikeError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .map_err(|e| SpikeError::storage(format!("cannot create {}", parent.display()), e))?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)
            .map_err(|e| SpikeError::storage("cannot create lock sentinel", e))?;
        writeln!(tmp, "locked at {}", chrono::Utc::now().to_rfc3339())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| SpikeError::storage("cannot write lock sentinel", e))?;
        tmp.persist(&self.path)
            .map_err(|e| SpikeError::storage("cannot persist lock sentinel", e.error))?;
        Ok(())
    }
}

impl LockStore for FileLockStore {
    fn load(&self) -> Result<bool, SpikeError> {
        self.path
            .try_exists()
            .map_err(|e| SpikeError::storage(format!("cannot read {}", self.path.display()), e))
    }

    fn store(&self, locked: bool) -> Result<(), SpikeError> {
        if locked {
            self.write_sentinel()?;
        } else {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(SpikeError::storage("cannot remove lock sentinel", e)),
            }
        }
        debug!(path = %self.path.display(), locked, "lock sentinel updated");
        Ok(())
    }
}

/// In-memory backend for tests and ephemeral deployments.
#[derive(Debug, Default)]
pub struct MemoryLockStore {
    locked: AtomicBool,
    writes: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously persisted state.
    pub fn with_state(locked: bool) -> Self {
        let store = Self::default();
        store.locked.store(locked, Ordering::SeqCst);
        store
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail with a storage error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl LockStore for MemoryLockStore {
    fn load(&self) -> Result<bool, SpikeError> {
        Ok(self.locked.load(Ordering::SeqCst))
    }

    fn store(&self, locked: bool) -> Result<(), SpikeError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SpikeError::Storage {
                message: "memory lock store rejected write".into(),
                source: None,
            });
        }
        self.locked.store(locked, Ordering::SeqCst);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
