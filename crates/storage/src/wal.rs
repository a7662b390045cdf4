// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only op log.
//!
//! One JSON object per line. Appends are flushed and fsynced before the op
//! is applied to the in-memory state, so a crash never loses an
//! acknowledged mutation. A trailing partial line (torn write) is ignored
//! on replay.

use crate::ops::StoreOp;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalEntry {
    pub seq: u64,
    pub op: StoreOp,
}

pub struct Wal {
    path: PathBuf,
    file: File,
    write_seq: u64,
}

impl Wal {
    /// Open the WAL for appending.
    ///
    /// `base_seq` is the sequence the last snapshot was taken at; the write
    /// sequence continues from whichever is later, the base or the last
    /// intact entry on disk.
    pub fn open(path: &Path, base_seq: u64) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let last_seq = Self::read_entries(path)?.last().map(|e| e.seq).unwrap_or(0);
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { path: path.to_path_buf(), file, write_seq: base_seq.max(last_seq) })
    }

    /// Read all intact entries; a torn trailing line is skipped.
    pub fn read_entries(path: &Path) -> std::io::Result<Vec<WalEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<WalEntry>(&line) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping torn WAL line");
                    break;
                }
            }
        }
        Ok(entries)
    }

    /// Append one op, flush, and fsync. Returns the assigned sequence.
    pub fn append(&mut self, op: &StoreOp) -> std::io::Result<u64> {
        self.write_seq += 1;
        let entry = WalEntry { seq: self.write_seq, op: op.clone() };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(self.write_seq)
    }

    /// Truncate the log after a checkpoint; the sequence keeps advancing.
    pub fn reset(&mut self) -> std::io::Result<()> {
        self.file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&self.path)?;
        self.file.sync_data()?;
        // Reopen in append mode for subsequent writes.
        self.file = OpenOptions::new().append(true).open(&self.path)?;
        Ok(())
    }

    pub fn write_seq(&self) -> u64 {
        self.write_seq
    }
}

#[cfg(test)]
#[path = "wal_tests.rs"]
mod tests;
