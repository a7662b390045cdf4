// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: PID lock and state-directory housekeeping.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not prepare state directory {0}: {1}")]
    StateDir(PathBuf, std::io::Error),
    #[error("another kilnd is already running (lock held on {0})")]
    AlreadyRunning(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive advisory lock plus PID file. Held for the process lifetime;
/// the lock releases when dropped.
pub struct PidLock {
    path: PathBuf,
    // NOTE(lifetime): held to maintain the exclusive lock; released on drop
    #[allow(dead_code)]
    file: File,
}

impl PidLock {
    pub fn acquire(path: &Path) -> Result<Self, LifecycleError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LifecycleError::StateDir(parent.to_path_buf(), e))?;
        }
        let mut file = OpenOptions::new().create(true).write(true).truncate(false).open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| LifecycleError::AlreadyRunning(path.to_path_buf()))?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.sync_data()?;
        Ok(Self { path: path.to_path_buf(), file })
    }
}

impl Drop for PidLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove PID file");
        }
    }
}

/// Touch the update-check marker so external tooling can tell when the
/// daemon last started.
pub fn touch_update_check(path: &Path) {
    let result = OpenOptions::new().create(true).write(true).truncate(false).open(path);
    match result {
        Ok(file) => {
            if let Err(e) = file.set_modified(std::time::SystemTime::now()) {
                tracing::debug!(error = %e, "failed to update update-check mtime");
            }
        }
        Err(e) => tracing::debug!(error = %e, "failed to touch update-check"),
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
