// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Board observations.
//!
//! A [`BoardItem`] is a snapshot of one issue on one board at one polling
//! instant. It carries everything the dispatcher needs to decide whether
//! the issue is eligible for work without further backend calls.

use crate::repo::{IssueKey, RepoId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A board "Status" column value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Backlog,
    Research,
    Plan,
    Implement,
    Validate,
    Done,
    /// Any column name the engine does not drive (kept verbatim for logs).
    Unknown(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Backlog => "Backlog",
            Status::Research => "Research",
            Status::Plan => "Plan",
            Status::Implement => "Implement",
            Status::Validate => "Validate",
            Status::Done => "Done",
            Status::Unknown(name) => name,
        }
    }

    /// Whether this column has a workflow stage attached.
    pub fn is_workflow_column(&self) -> bool {
        matches!(
            self,
            Status::Research | Status::Plan | Status::Implement | Status::Validate
        )
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Backlog" => Status::Backlog,
            "Research" => Status::Research,
            "Plan" => Status::Plan,
            "Implement" => Status::Implement,
            "Validate" => Status::Validate,
            "Done" => Status::Done,
            _ => Status::Unknown(s),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Status::from(s.to_string())
    }
}

impl From<Status> for String {
    fn from(status: Status) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open/closed state of the underlying issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueState {
    Open,
    Closed,
}

/// Why a closed issue was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateReason {
    Completed,
    NotPlanned,
    Reopened,
}

/// One issue as observed on one board during a poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardItem {
    /// Opaque item identifier on the board (project item node id).
    pub item_handle: String,
    pub board_url: String,
    pub repo: RepoId,
    pub issue_number: u64,
    pub status: Status,
    pub title: String,
    pub labels: BTreeSet<String>,
    pub state: IssueState,
    pub state_reason: Option<StateReason>,
    pub has_merged_changes: bool,
    pub comment_count: u64,
}

impl BoardItem {
    pub fn key(&self) -> IssueKey {
        IssueKey::new(self.repo.clone(), self.issue_number)
    }
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod tests;
