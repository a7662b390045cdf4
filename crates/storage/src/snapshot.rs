// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Compressed state snapshots.
//!
//! A snapshot bounds WAL replay time: the store checkpoints after replay at
//! startup and periodically while running. Written atomically via a temp
//! file rename.

use crate::migration::{MigrationError, MigrationRegistry};
use crate::state::StoreState;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Current snapshot schema version.
pub const SNAPSHOT_VERSION: u32 = 1;

const ZSTD_LEVEL: i32 = 3;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u32,
    seq: u64,
    state: Value,
}

/// Result of a successful checkpoint.
#[derive(Debug)]
pub struct CheckpointResult {
    pub seq: u64,
    pub size_bytes: u64,
}

/// Writes and loads snapshots at a fixed path.
pub struct Checkpointer {
    path: PathBuf,
}

impl Checkpointer {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Persist `state` as of WAL sequence `seq`.
    pub fn checkpoint(&self, seq: u64, state: &StoreState) -> Result<CheckpointResult, SnapshotError> {
        let envelope = Envelope { v: SNAPSHOT_VERSION, seq, state: serde_json::to_value(state)? };
        let json = serde_json::to_vec(&envelope)?;
        let compressed = zstd::encode_all(json.as_slice(), ZSTD_LEVEL)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &compressed)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(CheckpointResult { seq, size_bytes: compressed.len() as u64 })
    }

    /// Load the snapshot, migrating forward if it is from an older version.
    ///
    /// Returns `None` when no snapshot exists yet.
    pub fn load(
        &self,
        registry: &MigrationRegistry,
    ) -> Result<Option<(u64, StoreState)>, SnapshotError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let compressed = std::fs::read(&self.path)?;
        let json = zstd::decode_all(compressed.as_slice())?;
        let raw: Value = serde_json::from_slice(&json)?;
        let migrated = registry.migrate_to(raw, SNAPSHOT_VERSION)?;
        let envelope: Envelope = serde_json::from_value(migrated)?;
        let state: StoreState = serde_json::from_value(envelope.state)?;
        Ok(Some((envelope.seq, state)))
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
