// SPDX-FileCopyrightText: 2026 Spike Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk custody of recovery shards.
//!
//! Layout: one `spike.recovery.<n>.txt` file per shard, where `<n>` is the
//! shard's zero-based position in the batch. Files are owner-only and the
//! directory is owner-only.

use std::io::Write;
use std::path::{Component, Path, PathBuf};

use spike_core::{Shard, SpikeError};
use tracing::{debug, info};

const FILE_PREFIX: &str = "spike.recovery.";
const FILE_SUFFIX: &str = ".txt";

/// Name of the file holding the shard at `position` within a batch.
pub fn file_name(position: usize) -> String {
    format!("{FILE_PREFIX}{position}{FILE_SUFFIX}")
}

/// Whether `name` is a recovery shard file (`spike.recovery.<digits>.txt`).
pub fn is_shard_file(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_SUFFIX))
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// A recovery directory.
#[derive(Debug, Clone)]
pub struct FileShardStore {
    dir: PathBuf,
}

impl FileShardStore {
    /// Refuses paths containing `..` components.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SpikeError> {
        let dir = dir.as_ref();
        if dir.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(SpikeError::Storage {
                message: format!(
                    "recovery directory {} must not contain `..`",
                    dir.display()
                ),
                source: None,
            });
        }
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replace the directory's shard files with `shards`.
    ///
    /// Stale shard files are removed before the first write; each new file
    /// appears atomically, so an interrupted run never leaves a truncated
    /// shard behind.
    pub fn replace_all(&self, shards: &[Shard]) -> Result<Vec<PathBuf>, SpikeError> {
        self.ensure_dir()?;
        let removed = self.clean()?;
        if removed > 0 {
            debug!(removed, dir = %self.dir.display(), "removed stale shard files");
        }

        let mut written = Vec::with_capacity(shards.len());
        for (position, shard) in shards.iter().enumerate() {
            let encoded = spike_shamir::encode(shard);
            let path = self.dir.join(file_name(position));
            self.write_atomic(&path, encoded.as_bytes())?;
            written.push(path);
        }

        info!(count = written.len(), dir = %self.dir.display(), "recovery shards written");
        Ok(written)
    }

    /// Delete every shard file in the directory. Other files are untouched.
    pub fn clean(&self) -> Result<usize, SpikeError> {
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => {
                return Err(SpikeError::storage(
                    format!("cannot list {}", self.dir.display()),
                    e,
                ));
            }
        };

        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| SpikeError::storage("cannot read directory entry", e))?;
            let name = entry.file_name();
            if !name.to_str().is_some_and(is_shard_file) {
                continue;
            }
            std::fs::remove_file(entry.path()).map_err(|e| {
                SpikeError::storage(format!("cannot remove {}", entry.path().display()), e)
            })?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Shard files currently present, sorted by position.
    pub fn list(&self) -> Result<Vec<PathBuf>, SpikeError> {
        let entries = std::fs::read_dir(&self.dir)
            .map_err(|e| SpikeError::storage(format!("cannot list {}", self.dir.display()), e))?;

        let mut found: Vec<(usize, PathBuf)> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SpikeError::storage("cannot read directory entry", e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str().filter(|n| is_shard_file(n)) else {
                continue;
            };
            let position = name[FILE_PREFIX.len()..name.len() - FILE_SUFFIX.len()]
                .parse()
                .unwrap_or(usize::MAX);
            found.push((position, entry.path()));
        }
        found.sort();
        Ok(found.into_iter().map(|(_, path)| path).collect())
    }

    fn ensure_dir(&self) -> Result<(), SpikeError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| SpikeError::storage(format!("cannot create {}", self.dir.display()), e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.dir, std::fs::Permissions::from_mode(0o700)).map_err(
                |e| SpikeError::storage(format!("cannot restrict {}", self.dir.display()), e),
            )?;
        }
        Ok(())
    }

    fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<(), SpikeError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| SpikeError::storage("cannot create temporary shard file", e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o600))
                .map_err(|e| SpikeError::storage("cannot restrict shard file", e))?;
        }

        tmp.write_all(contents)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| SpikeError::storage("cannot write shard file", e))?;
        tmp.persist(path).map_err(|e| {
            SpikeError::storage(format!("cannot persist {}", path.display()), e.error)
        })?;
        Ok(())
    }
}
