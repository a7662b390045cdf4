// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay

use crate::ops::StoreOp;
use kiln_core::{IssueRecord, RepoId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Stable map key for one issue: `host/owner/name#number`.
pub fn issue_key(repo: &RepoId, issue_number: u64) -> String {
    format!("{repo}#{issue_number}")
}

/// One entry of the in-flight comment set.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ProcessingComment {
    pub repo: RepoId,
    pub issue_number: u64,
    pub comment_handle: String,
}

/// Materialized store state built from op replay.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StoreState {
    pub issue_records: HashMap<String, IssueRecord>,
    pub runs: BTreeMap<u64, kiln_core::RunRecord>,
    pub next_run_id: u64,
    pub processing_comments: BTreeSet<ProcessingComment>,
}

impl StoreState {
    fn record_mut(&mut self, repo: &RepoId, issue_number: u64) -> &mut IssueRecord {
        self.issue_records
            .entry(issue_key(repo, issue_number))
            .or_insert_with(|| IssueRecord::new(String::new(), repo.clone(), issue_number))
    }

    /// Apply one op. Ops are applied exactly once per replay.
    pub fn apply(&mut self, op: &StoreOp) {
        match op {
            StoreOp::UpsertIssueRecord { record } => {
                self.issue_records
                    .insert(issue_key(&record.repo, record.issue_number), (**record).clone());
            }
            StoreOp::SetSessionHandle { repo, issue_number, stage, handle } => {
                self.record_mut(repo, *issue_number)
                    .session_handles
                    .insert(*stage, handle.clone());
            }
            StoreOp::ClearSessionHandle { repo, issue_number, stage } => {
                self.record_mut(repo, *issue_number).session_handles.remove(stage);
            }
            StoreOp::ClearAllSessionHandles { repo, issue_number } => {
                self.record_mut(repo, *issue_number).session_handles.clear();
            }
            StoreOp::TouchFailure { repo, issue_number } => {
                let rec = self.record_mut(repo, *issue_number);
                rec.consecutive_failures = rec.consecutive_failures.saturating_add(1);
            }
            StoreOp::ClearFailure { repo, issue_number } => {
                self.record_mut(repo, *issue_number).consecutive_failures = 0;
            }
            StoreOp::SetHiddenUntil { repo, issue_number, until } => {
                self.record_mut(repo, *issue_number).hidden_until = *until;
            }
            StoreOp::InsertRun { record } => {
                self.next_run_id = self.next_run_id.max(record.id + 1);
                self.runs.insert(record.id, (**record).clone());
            }
            StoreOp::FinishRun { id, finished_at, outcome, session_id, metrics } => {
                if let Some(run) = self.runs.get_mut(id) {
                    // A run is finished exactly once; ignore late duplicates.
                    if run.finished_at.is_none() {
                        run.finished_at = Some(*finished_at);
                        run.outcome = Some(*outcome);
                        run.session_id = session_id.clone();
                        run.metrics = (**metrics).clone();
                    }
                }
            }
            StoreOp::AddProcessingComment { repo, issue_number, comment_handle } => {
                self.processing_comments.insert(ProcessingComment {
                    repo: repo.clone(),
                    issue_number: *issue_number,
                    comment_handle: comment_handle.clone(),
                });
            }
            StoreOp::RemoveProcessingComment { repo, issue_number, comment_handle } => {
                self.processing_comments.remove(&ProcessingComment {
                    repo: repo.clone(),
                    issue_number: *issue_number,
                    comment_handle: comment_handle.clone(),
                });
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
