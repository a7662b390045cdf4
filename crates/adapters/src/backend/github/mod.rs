// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GitHub implementation of [`TicketBackend`].

mod board;
mod gh;
mod issues;
mod prs;
mod queries;
mod timeline;

pub use prs::{body_closes_issue, closing_keyword_regex, remove_closing_keywords};

use crate::backend::{
    BackendError, BackendVersion, BoardMetadata, ChangeRef, ConnectionStatus, TicketBackend,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gh::GhClient;
use kiln_core::{BoardItem, Comment, Reaction, RepoId, Status};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Scopes a classic token must carry.
const REQUIRED_SCOPES: &[&str] = &["repo", "read:org", "project"];

/// Scopes that grant more than the daemon should ever hold; tokens carrying
/// any of these are rejected outright.
const EXCESSIVE_SCOPES: &[&str] = &[
    "admin:org",
    "delete_repo",
    "admin:org_hook",
    "admin:repo_hook",
    "admin:public_key",
    "admin:gpg_key",
    "write:org",
    "workflow",
    "delete:packages",
    "codespace",
    "user",
];

/// GitHub/GHES backend speaking through the `gh` CLI.
pub struct GithubBackend {
    gh: GhClient,
    version: BackendVersion,
    /// board_url → metadata, fetched once per process.
    board_meta: Mutex<HashMap<String, BoardMetadata>>,
    /// host → authenticated login, fetched once per process.
    viewer: Mutex<HashMap<String, String>>,
}

impl GithubBackend {
    pub fn new(tokens: HashMap<String, String>, version: BackendVersion) -> Self {
        Self {
            gh: GhClient::new(tokens),
            version,
            board_meta: Mutex::new(HashMap::new()),
            viewer: Mutex::new(HashMap::new()),
        }
    }

    pub fn version(&self) -> BackendVersion {
        self.version
    }

    /// The authenticated login for a host, cached after the first call.
    pub(crate) async fn viewer_login(&self, host: &str) -> Result<String, BackendError> {
        if let Some(login) = self.viewer.lock().get(host).cloned() {
            return Ok(login);
        }
        let data = self.gh.graphql(host, queries::VIEWER_QUERY, Value::Null).await?;
        let login = data
            .pointer("/viewer/login")
            .and_then(Value::as_str)
            .ok_or_else(|| BackendError::Parse("viewer query returned no login".into()))?
            .to_string();
        self.viewer.lock().insert(host.to_string(), login.clone());
        Ok(login)
    }

    async fn cached_board_metadata(&self, board_url: &str) -> Result<BoardMetadata, BackendError> {
        if let Some(meta) = self.board_meta.lock().get(board_url).cloned() {
            return Ok(meta);
        }
        let meta = board::fetch_board_metadata(self, board_url).await?;
        self.board_meta.lock().insert(board_url.to_string(), meta.clone());
        Ok(meta)
    }

    pub(crate) fn gh(&self) -> &GhClient {
        &self.gh
    }
}

#[async_trait]
impl TicketBackend for GithubBackend {
    fn supports_sub_issues(&self) -> bool {
        self.version.supports_sub_issues()
    }

    fn supports_linked_prs_first_class(&self) -> bool {
        self.version.supports_linked_prs_first_class()
    }

    fn supports_status_actor_check(&self) -> bool {
        self.version.supports_status_actor_check()
    }

    fn description(&self) -> String {
        self.version.to_string()
    }

    async fn validate_connection(&self, host: &str) -> ConnectionStatus {
        match self.gh.graphql(host, queries::VIEWER_QUERY, Value::Null).await {
            Ok(data) => match data.pointer("/viewer/login").and_then(Value::as_str) {
                Some(login) => {
                    self.viewer.lock().insert(host.to_string(), login.to_string());
                    ConnectionStatus::Ok { login: login.to_string() }
                }
                None => ConnectionStatus::AuthFailure(
                    "could not retrieve authenticated user".into(),
                ),
            },
            Err(BackendError::Network(msg)) => ConnectionStatus::NetworkFailure(msg),
            Err(err) => ConnectionStatus::AuthFailure(err.to_string()),
        }
    }

    async fn validate_scopes(&self, host: &str) -> Result<(), BackendError> {
        let response = self.gh.rest_with_headers(host, "user").await?;
        let Some(scopes) = parse_oauth_scopes(&response) else {
            // Fine-grained tokens advertise no scopes; nothing to check.
            tracing::debug!(host, "no X-OAuth-Scopes header; skipping scope validation");
            return Ok(());
        };

        for excessive in EXCESSIVE_SCOPES {
            if scopes.contains(*excessive) {
                return Err(BackendError::Auth(format!(
                    "token for {host} carries excessive scope '{excessive}'"
                )));
            }
        }
        for required in REQUIRED_SCOPES {
            if !scopes.contains(*required) {
                return Err(BackendError::Auth(format!(
                    "token for {host} is missing required scope '{required}'"
                )));
            }
        }
        Ok(())
    }

    async fn get_board_items(&self, board_url: &str) -> Result<Vec<BoardItem>, BackendError> {
        board::get_board_items(self, board_url).await
    }

    async fn get_board_metadata(&self, board_url: &str) -> Result<BoardMetadata, BackendError> {
        self.cached_board_metadata(board_url).await
    }

    async fn update_item_status(
        &self,
        board_url: &str,
        item_handle: &str,
        new_status: &Status,
    ) -> Result<(), BackendError> {
        let meta = self.cached_board_metadata(board_url).await?;
        board::update_item_status(self, board_url, &meta, item_handle, new_status).await
    }

    async fn archive_item(
        &self,
        board_url: &str,
        item_handle: &str,
    ) -> Result<(), BackendError> {
        let meta = self.cached_board_metadata(board_url).await?;
        board::archive_item(self, board_url, &meta, item_handle).await
    }

    async fn get_issue_body(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError> {
        issues::get_issue_body(self, repo, issue_number).await
    }

    async fn get_issue_labels(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<BTreeSet<String>, BackendError> {
        issues::get_issue_labels(self, repo, issue_number).await
    }

    async fn get_repo_labels(&self, repo: &RepoId) -> Result<Vec<String>, BackendError> {
        issues::get_repo_labels(self, repo).await
    }

    async fn add_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError> {
        issues::add_label(self, repo, issue_number, label).await
    }

    async fn remove_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError> {
        issues::remove_label(self, repo, issue_number, label).await
    }

    async fn get_comments(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<Comment>, BackendError> {
        issues::get_comments(self, repo, issue_number).await
    }

    async fn get_comments_since(
        &self,
        repo: &RepoId,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, BackendError> {
        issues::get_comments_since(self, repo, issue_number, since).await
    }

    async fn add_comment(
        &self,
        repo: &RepoId,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment, BackendError> {
        issues::add_comment(self, repo, issue_number, body).await
    }

    async fn update_comment(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        body: &str,
    ) -> Result<(), BackendError> {
        issues::update_comment(self, repo, comment_db_id, body).await
    }

    async fn add_reaction(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError> {
        issues::add_reaction(self, repo, comment_db_id, reaction).await
    }

    async fn remove_reaction(
        &self,
        repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError> {
        issues::remove_reaction(self, repo, comment_db_id, reaction).await
    }

    async fn get_last_status_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError> {
        if !self.version.supports_status_actor_check() {
            tracing::debug!(%repo, issue_number, "status actor check unsupported on this backend");
            return Ok(None);
        }
        timeline::get_last_status_actor(self, repo, issue_number).await
    }

    async fn get_label_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<Option<String>, BackendError> {
        timeline::get_label_actor(self, repo, issue_number, label).await
    }

    async fn get_linked_changes(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<ChangeRef>, BackendError> {
        if self.version.supports_linked_prs_first_class() {
            prs::get_linked_changes_first_class(self, repo, issue_number).await
        } else {
            prs::get_linked_changes_timeline(self, repo, issue_number).await
        }
    }

    async fn update_change_body(
        &self,
        repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<(), BackendError> {
        prs::update_change_body(self, repo, number, body).await
    }

    async fn close_change(&self, repo: &RepoId, number: u64) -> Result<(), BackendError> {
        prs::close_change(self, repo, number).await
    }

    async fn delete_branch(&self, repo: &RepoId, branch: &str) -> Result<(), BackendError> {
        prs::delete_branch(self, repo, branch).await
    }
}

/// Extract the scope set from a `gh api -i` response's headers.
fn parse_oauth_scopes(response: &str) -> Option<BTreeSet<String>> {
    for line in response.lines() {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.eq_ignore_ascii_case("x-oauth-scopes") {
            return Some(
                value
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
    }
    None
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
