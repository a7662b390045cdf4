// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent bookkeeping records.

use crate::board::Status;
use crate::metrics::UsageMetrics;
use crate::repo::RepoId;
use crate::stage::Stage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The engine's durable memory for one issue on one board.
///
/// Created on first observation and kept forever; fields mutate as the
/// engine progresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub board_url: String,
    pub repo: RepoId,
    pub issue_number: u64,
    pub last_observed_status: Status,
    /// High-water mark for comment application; only ever advances.
    pub last_processed_comment_at: Option<DateTime<Utc>>,
    pub last_known_comment_count: u64,
    pub consecutive_failures: u32,
    /// Retry suppression: skipped until this instant when set.
    pub hidden_until: Option<DateTime<Utc>>,
    /// Stage → opaque agent session identifier for resumption.
    pub session_handles: BTreeMap<Stage, String>,
    /// PR URL this issue is linked to, once the implement stage opened one.
    pub linked_pr_url: Option<String>,
}

impl IssueRecord {
    pub fn new(board_url: impl Into<String>, repo: RepoId, issue_number: u64) -> Self {
        Self {
            board_url: board_url.into(),
            repo,
            issue_number,
            last_observed_status: Status::Unknown(String::new()),
            last_processed_comment_at: None,
            last_known_comment_count: 0,
            consecutive_failures: 0,
            hidden_until: None,
            session_handles: BTreeMap::new(),
            linked_pr_url: None,
        }
    }
}

/// Terminal outcome of one stage attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    AgentFailure,
    TimeoutTotal,
    TimeoutInactivity,
    InternalError,
    Cancelled,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "success",
            RunOutcome::AgentFailure => "agent_failure",
            RunOutcome::TimeoutTotal => "timeout_total",
            RunOutcome::TimeoutInactivity => "timeout_inactivity",
            RunOutcome::InternalError => "internal_error",
            RunOutcome::Cancelled => "cancelled",
        }
    }
}

/// One row of the append-only run ledger.
///
/// Inserted when a stage executor begins, finished exactly once, immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: u64,
    pub repo: RepoId,
    pub issue_number: u64,
    pub stage: Stage,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<RunOutcome>,
    pub session_id: Option<String>,
    pub metrics: UsageMetrics,
}

impl RunRecord {
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
