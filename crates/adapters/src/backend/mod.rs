// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ticket backend facade.
//!
//! The engine consumes [`TicketBackend`]; the shipped implementation is
//! [`GithubBackend`], which speaks GraphQL/REST through the `gh` CLI and is
//! parameterized by a per-host [`BackendVersion`]. Call sites never match on
//! versions directly: they consult the capability flags and branch to the
//! documented fallback.

mod github;
mod version;

pub use github::{
    body_closes_issue, closing_keyword_regex, remove_closing_keywords, GithubBackend,
};
pub use version::BackendVersion;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use kiln_core::{BoardItem, Comment, Reaction, RepoId, Status};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Errors from backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transient connectivity problem; the supervisor hibernates on these.
    #[error("network failure: {0}")]
    Network(String),
    /// Token invalid or missing scopes; fatal at startup.
    #[error("authentication failure: {0}")]
    Auth(String),
    #[error("backend API error: {0}")]
    Api(String),
    #[error("unexpected backend response: {0}")]
    Parse(String),
    /// A pagination cursor failed to advance; the page loop bails.
    #[error("pagination cursor stuck at {0}")]
    StuckCursor(String),
}

impl BackendError {
    pub fn is_network(&self) -> bool {
        matches!(self, BackendError::Network(_))
    }
}

/// Result of a connectivity probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    Ok { login: String },
    AuthFailure(String),
    NetworkFailure(String),
}

/// Board-level metadata needed for status mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardMetadata {
    pub project_id: String,
    pub status_field_handle: String,
    /// Column name → opaque single-select option id.
    pub status_options: BTreeMap<String, String>,
}

/// A change-set (pull request) linked to an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRef {
    pub number: u64,
    pub url: String,
    pub body: String,
    pub state: String,
    pub merged: bool,
    pub branch_name: Option<String>,
}

/// Operations the engine needs from the ticket backend.
///
/// All methods are one round trip from the engine's point of view; network
/// errors surface as [`BackendError::Network`].
#[async_trait]
pub trait TicketBackend: Send + Sync {
    // Capability flags; older enterprise versions turn these off and call
    // sites branch to their documented fallback.
    fn supports_sub_issues(&self) -> bool {
        true
    }
    fn supports_linked_prs_first_class(&self) -> bool {
        true
    }
    fn supports_status_actor_check(&self) -> bool {
        true
    }
    fn description(&self) -> String;

    async fn validate_connection(&self, host: &str) -> ConnectionStatus;

    /// Check token scopes; no-op for fine-grained tokens which do not
    /// advertise scopes.
    async fn validate_scopes(&self, host: &str) -> Result<(), BackendError>;

    async fn get_board_items(&self, board_url: &str) -> Result<Vec<BoardItem>, BackendError>;

    async fn get_board_metadata(&self, board_url: &str) -> Result<BoardMetadata, BackendError>;

    async fn update_item_status(
        &self,
        board_url: &str,
        item_handle: &str,
        new_status: &Status,
    ) -> Result<(), BackendError>;

    async fn archive_item(&self, board_url: &str, item_handle: &str)
        -> Result<(), BackendError>;

    async fn get_issue_body(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError>;

    async fn get_issue_labels(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<BTreeSet<String>, BackendError>;

    /// All labels defined at repository scope.
    async fn get_repo_labels(&self, repo: &RepoId) -> Result<Vec<String>, BackendError>;

    /// Add a label, creating it at repository scope if absent.
    async fn add_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError>;

    async fn remove_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError>;

    /// All comments, cursor-paged.
    async fn get_comments(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<Comment>, BackendError>;

    /// Comments created after `since` (exclusive of older, inclusive of
    /// equal-or-newer per the backend's `since` semantics).
    async fn get_comments_since(
        &self,
        repo: &RepoId,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, BackendError>;

    async fn add_comment(
        &self,
        repo: &RepoId,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment, BackendError>;

    async fn update_comment(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        body: &str,
    ) -> Result<(), BackendError>;

    async fn add_reaction(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError>;

    async fn remove_reaction(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError>;

    /// Who most recently changed the Status field on this issue's board
    /// item. `None` when nobody did or the backend cannot tell.
    async fn get_last_status_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError>;

    /// Who added the given label, if anyone.
    async fn get_label_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<Option<String>, BackendError>;

    /// Change-sets that declare they close this issue.
    async fn get_linked_changes(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<ChangeRef>, BackendError>;

    async fn update_change_body(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<(), BackendError>;

    async fn close_change(&self, repo: &RepoId, number: u64) -> Result<(), BackendError>;

    /// Best-effort branch delete; names containing `/` are URL-encoded.
    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<(), BackendError>;
}
