// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders and fixtures shared by tests across the workspace.

use crate::board::{BoardItem, IssueState, Status};
use crate::comment::Comment;
use crate::record::IssueRecord;
use crate::repo::RepoId;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// A board item with sensible defaults for tests.
pub fn board_item(host: &str, owner: &str, name: &str, number: u64, status: Status) -> BoardItem {
    BoardItem {
        item_handle: format!("PVTI_{owner}_{number}"),
        board_url: format!("https://{host}/orgs/{owner}/projects/1"),
        repo: RepoId::new(host, owner, name),
        issue_number: number,
        status,
        title: format!("Issue {number}"),
        labels: BTreeSet::new(),
        state: IssueState::Open,
        state_reason: None,
        has_merged_changes: false,
        comment_count: 0,
    }
}

/// An issue record matching [`board_item`]'s defaults.
pub fn issue_record(item: &BoardItem) -> IssueRecord {
    let mut rec = IssueRecord::new(item.board_url.clone(), item.repo.clone(), item.issue_number);
    rec.last_observed_status = item.status.clone();
    rec
}

/// A user comment with the given body and creation time.
pub fn user_comment(db_id: u64, author: &str, body: &str, created_at: DateTime<Utc>) -> Comment {
    Comment {
        handle: format!("IC_{db_id}"),
        db_id,
        body: body.to_string(),
        created_at,
        author: Some(author.to_string()),
        processed: false,
        in_flight: false,
    }
}
