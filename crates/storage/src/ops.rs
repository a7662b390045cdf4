// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store operations written to the WAL.

use chrono::{DateTime, Utc};
use kiln_core::{IssueRecord, RepoId, RunOutcome, RunRecord, Stage, UsageMetrics};
use serde::{Deserialize, Serialize};

/// One durable mutation.
///
/// Ops are facts: replaying the sequence from an empty (or snapshotted)
/// state reproduces the state at the time of the crash. Each op is applied
/// exactly once per replay, so counter increments are safe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoreOp {
    UpsertIssueRecord {
        record: Box<IssueRecord>,
    },
    SetSessionHandle {
        repo: RepoId,
        issue_number: u64,
        stage: Stage,
        handle: String,
    },
    ClearSessionHandle {
        repo: RepoId,
        issue_number: u64,
        stage: Stage,
    },
    ClearAllSessionHandles {
        repo: RepoId,
        issue_number: u64,
    },
    TouchFailure {
        repo: RepoId,
        issue_number: u64,
    },
    ClearFailure {
        repo: RepoId,
        issue_number: u64,
    },
    SetHiddenUntil {
        repo: RepoId,
        issue_number: u64,
        until: Option<DateTime<Utc>>,
    },
    InsertRun {
        record: Box<RunRecord>,
    },
    FinishRun {
        id: u64,
        finished_at: DateTime<Utc>,
        outcome: RunOutcome,
        session_id: Option<String>,
        metrics: Box<UsageMetrics>,
    },
    AddProcessingComment {
        repo: RepoId,
        issue_number: u64,
        comment_handle: String,
    },
    RemoveProcessingComment {
        repo: RepoId,
        issue_number: u64,
        comment_handle: String,
    },
}
