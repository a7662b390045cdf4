// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The public store facade.
//!
//! Single writer: all access goes through one mutex held for the duration
//! of a call. Mutations append to the WAL (fsync) before touching state, so
//! every call is transactional at its own granularity.

use crate::migration::MigrationRegistry;
use crate::ops::StoreOp;
use crate::snapshot::{Checkpointer, SnapshotError};
use crate::state::{issue_key, ProcessingComment, StoreState};
use crate::wal::Wal;
use chrono::{DateTime, Utc};
use kiln_core::{IssueRecord, RepoId, RunOutcome, RunRecord, Stage, UsageMetrics};
use parking_lot::Mutex;
use std::path::Path;
use thiserror::Error;

/// Ops between automatic checkpoints.
const CHECKPOINT_INTERVAL: u64 = 512;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

struct Inner {
    wal: Wal,
    state: StoreState,
    checkpointer: Checkpointer,
    ops_since_checkpoint: u64,
}

impl Inner {
    fn commit(&mut self, op: StoreOp) -> Result<(), StoreError> {
        self.wal.append(&op)?;
        self.state.apply(&op);
        self.ops_since_checkpoint += 1;
        if self.ops_since_checkpoint >= CHECKPOINT_INTERVAL {
            self.checkpoint()?;
        }
        Ok(())
    }

    fn checkpoint(&mut self) -> Result<(), StoreError> {
        let result = self.checkpointer.checkpoint(self.wal.write_seq(), &self.state)?;
        self.wal.reset()?;
        self.ops_since_checkpoint = 0;
        tracing::debug!(seq = result.seq, size_bytes = result.size_bytes, "store checkpoint");
        Ok(())
    }
}

/// Durable per-issue bookkeeping (see crate docs).
pub struct Store {
    inner: Mutex<Inner>,
}

impl Store {
    /// Open (or create) the store rooted at `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let wal_path = dir.join("events.wal");
        let snapshot_path = dir.join("snapshot.json.zst");
        let registry = MigrationRegistry::new();
        let checkpointer = Checkpointer::new(snapshot_path);

        let (snap_seq, mut state) =
            checkpointer.load(&registry)?.unwrap_or((0, StoreState::default()));

        let mut replayed = 0u64;
        let mut last_seq = snap_seq;
        for entry in Wal::read_entries(&wal_path)? {
            if entry.seq > snap_seq {
                state.apply(&entry.op);
                replayed += 1;
            }
            last_seq = last_seq.max(entry.seq);
        }
        if replayed > 0 {
            tracing::info!(replayed, "replayed WAL tail into snapshot state");
        }

        let wal = Wal::open(&wal_path, last_seq)?;
        let mut inner = Inner { wal, state, checkpointer, ops_since_checkpoint: 0 };
        // Fold the replayed tail into a fresh snapshot so the next startup
        // starts from an empty log.
        inner.checkpoint()?;
        Ok(Self { inner: Mutex::new(inner) })
    }

    // === Issue records ===

    pub fn get_issue_record(&self, repo: &RepoId, issue_number: u64) -> Option<IssueRecord> {
        self.inner.lock().state.issue_records.get(&issue_key(repo, issue_number)).cloned()
    }

    pub fn upsert_issue_record(&self, record: IssueRecord) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::UpsertIssueRecord { record: Box::new(record) })
    }

    /// Every issue whose last observed status is a workflow column.
    pub fn list_in_progress(&self) -> Vec<(RepoId, u64, Stage)> {
        let inner = self.inner.lock();
        let mut out: Vec<_> = inner
            .state
            .issue_records
            .values()
            .filter_map(|rec| {
                Stage::for_status(&rec.last_observed_status)
                    .map(|stage| (rec.repo.clone(), rec.issue_number, stage))
            })
            .collect();
        out.sort();
        out
    }

    // === Run ledger ===

    pub fn insert_run_record(
        &self,
        repo: &RepoId,
        issue_number: u64,
        stage: Stage,
        started_at: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock();
        let id = inner.state.next_run_id.max(1);
        let record = RunRecord {
            id,
            repo: repo.clone(),
            issue_number,
            stage,
            started_at,
            finished_at: None,
            outcome: None,
            session_id: None,
            metrics: UsageMetrics::default(),
        };
        inner.commit(StoreOp::InsertRun { record: Box::new(record) })?;
        Ok(id)
    }

    pub fn finish_run_record(
        &self,
        id: u64,
        finished_at: DateTime<Utc>,
        outcome: RunOutcome,
        session_id: Option<String>,
        metrics: UsageMetrics,
    ) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::FinishRun {
            id,
            finished_at,
            outcome,
            session_id,
            metrics: Box::new(metrics),
        })
    }

    pub fn get_run_record(&self, id: u64) -> Option<RunRecord> {
        self.inner.lock().state.runs.get(&id).cloned()
    }

    pub fn run_records_for(&self, repo: &RepoId, issue_number: u64) -> Vec<RunRecord> {
        let inner = self.inner.lock();
        inner
            .state
            .runs
            .values()
            .filter(|run| &run.repo == repo && run.issue_number == issue_number)
            .cloned()
            .collect()
    }

    // === Processing-comment set ===

    pub fn add_processing_comment(
        &self,
        repo: &RepoId,
        issue_number: u64,
        comment_handle: &str,
    ) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::AddProcessingComment {
            repo: repo.clone(),
            issue_number,
            comment_handle: comment_handle.to_string(),
        })
    }

    pub fn remove_processing_comment(
        &self,
        repo: &RepoId,
        issue_number: u64,
        comment_handle: &str,
    ) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::RemoveProcessingComment {
            repo: repo.clone(),
            issue_number,
            comment_handle: comment_handle.to_string(),
        })
    }

    pub fn list_processing_comments(&self) -> Vec<ProcessingComment> {
        self.inner.lock().state.processing_comments.iter().cloned().collect()
    }

    // === Session handles ===

    pub fn get_session_handle(
        &self,
        repo: &RepoId,
        issue_number: u64,
        stage: Stage,
    ) -> Option<String> {
        self.inner
            .lock()
            .state
            .issue_records
            .get(&issue_key(repo, issue_number))
            .and_then(|rec| rec.session_handles.get(&stage).cloned())
    }

    pub fn set_session_handle(
        &self,
        repo: &RepoId,
        issue_number: u64,
        stage: Stage,
        handle: &str,
    ) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::SetSessionHandle {
            repo: repo.clone(),
            issue_number,
            stage,
            handle: handle.to_string(),
        })
    }

    pub fn clear_session_handle(
        &self,
        repo: &RepoId,
        issue_number: u64,
        stage: Stage,
    ) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::ClearSessionHandle {
            repo: repo.clone(),
            issue_number,
            stage,
        })
    }

    pub fn clear_all_session_handles(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .commit(StoreOp::ClearAllSessionHandles { repo: repo.clone(), issue_number })
    }

    // === Failure tracking ===

    /// Increment the consecutive-failure counter; returns the new count.
    pub fn touch_failure(&self, repo: &RepoId, issue_number: u64) -> Result<u32, StoreError> {
        let mut inner = self.inner.lock();
        inner.commit(StoreOp::TouchFailure { repo: repo.clone(), issue_number })?;
        Ok(inner
            .state
            .issue_records
            .get(&issue_key(repo, issue_number))
            .map(|rec| rec.consecutive_failures)
            .unwrap_or(0))
    }

    pub fn clear_failure(&self, repo: &RepoId, issue_number: u64) -> Result<(), StoreError> {
        self.inner.lock().commit(StoreOp::ClearFailure { repo: repo.clone(), issue_number })
    }

    // === Retry suppression ===

    pub fn set_hidden_until(
        &self,
        repo: &RepoId,
        issue_number: u64,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), StoreError> {
        self.inner
            .lock()
            .commit(StoreOp::SetHiddenUntil { repo: repo.clone(), issue_number, until })
    }

    pub fn get_hidden_until(&self, repo: &RepoId, issue_number: u64) -> Option<DateTime<Utc>> {
        self.inner
            .lock()
            .state
            .issue_records
            .get(&issue_key(repo, issue_number))
            .and_then(|rec| rec.hidden_until)
    }

    /// Force a checkpoint (shutdown path).
    pub fn checkpoint(&self) -> Result<(), StoreError> {
        self.inner.lock().checkpoint()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
