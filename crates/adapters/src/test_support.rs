// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the backend and runner traits.
//!
//! `FakeBackend` models one board plus per-issue state and records every
//! mutation for assertions. `FakeRunner` replays scripted responses and
//! records the requests it received.

use crate::backend::{
    BackendError, BoardMetadata, ChangeRef, ConnectionStatus, TicketBackend,
};
use crate::runner::{AgentRunner, RunRequest, RunnerError, RunnerOutput};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use kiln_core::{BoardItem, Comment, Reaction, RepoId, Status, UsageMetrics};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;

fn key(repo: &RepoId, issue_number: u64) -> String {
    format!("{repo}#{issue_number}")
}

/// State behind a [`FakeBackend`].
pub struct FakeBackendState {
    pub bot_login: String,
    pub items: Vec<BoardItem>,
    pub issue_bodies: HashMap<String, String>,
    pub comments: HashMap<String, Vec<Comment>>,
    pub labels: HashMap<String, BTreeSet<String>>,
    pub status_actors: HashMap<String, String>,
    pub label_actors: HashMap<(String, String), String>,
    pub linked_changes: HashMap<String, Vec<ChangeRef>>,
    /// comment db id → reaction contents the engine currently holds.
    pub reactions: HashMap<u64, BTreeSet<String>>,
    pub connection_failures: HashMap<String, ConnectionStatus>,
    /// When set, the next `get_board_items` fails with a network error.
    pub fail_next_poll: Option<String>,
    /// How many times `get_board_items` was called.
    pub poll_count: usize,
    pub supports_status_actor_check: bool,
    pub supports_linked_prs_first_class: bool,

    // Recorded mutations.
    pub status_updates: Vec<(String, Status)>,
    pub archived: Vec<String>,
    pub comment_updates: Vec<(u64, String)>,
    pub closed_changes: Vec<u64>,
    pub deleted_branches: Vec<String>,
    pub change_bodies: HashMap<u64, String>,

    next_comment_db_id: u64,
    clock: DateTime<Utc>,
}

/// In-memory [`TicketBackend`].
#[derive(Clone)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeBackendState>>,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for FakeBackendState {
    fn default() -> Self {
        Self {
            bot_login: "kiln-bot".into(),
            items: Vec::new(),
            issue_bodies: HashMap::new(),
            comments: HashMap::new(),
            labels: HashMap::new(),
            status_actors: HashMap::new(),
            label_actors: HashMap::new(),
            linked_changes: HashMap::new(),
            reactions: HashMap::new(),
            connection_failures: HashMap::new(),
            fail_next_poll: None,
            poll_count: 0,
            supports_status_actor_check: true,
            supports_linked_prs_first_class: true,
            status_updates: Vec::new(),
            archived: Vec::new(),
            comment_updates: Vec::new(),
            closed_changes: Vec::new(),
            deleted_branches: Vec::new(),
            change_bodies: HashMap::new(),
            next_comment_db_id: 1000,
            clock: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).single().unwrap_or_else(Utc::now),
        }
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self { state: Arc::new(Mutex::new(FakeBackendState::default())) }
    }

    /// Direct access to the fake's state for setup and assertions.
    pub fn state(&self) -> Arc<Mutex<FakeBackendState>> {
        Arc::clone(&self.state)
    }

    pub fn set_items(&self, items: Vec<BoardItem>) {
        self.state.lock().items = items;
    }

    pub fn set_issue_body(&self, repo: &RepoId, issue_number: u64, body: &str) {
        self.state.lock().issue_bodies.insert(key(repo, issue_number), body.to_string());
    }

    pub fn set_status_actor(&self, repo: &RepoId, issue_number: u64, login: &str) {
        self.state.lock().status_actors.insert(key(repo, issue_number), login.to_string());
    }

    pub fn set_label_actor(&self, repo: &RepoId, issue_number: u64, label: &str, login: &str) {
        self.state
            .lock()
            .label_actors
            .insert((key(repo, issue_number), label.to_string()), login.to_string());
    }

    pub fn set_linked_changes(&self, repo: &RepoId, issue_number: u64, changes: Vec<ChangeRef>) {
        let mut state = self.state.lock();
        for change in &changes {
            state.change_bodies.insert(change.number, change.body.clone());
        }
        state.linked_changes.insert(key(repo, issue_number), changes);
    }

    pub fn push_comment(&self, repo: &RepoId, issue_number: u64, comment: Comment) {
        self.state.lock().comments.entry(key(repo, issue_number)).or_default().push(comment);
    }

    pub fn fail_next_poll(&self, message: &str) {
        self.state.lock().fail_next_poll = Some(message.to_string());
    }

    pub fn set_connection_failure(&self, host: &str, status: ConnectionStatus) {
        self.state.lock().connection_failures.insert(host.to_string(), status);
    }

    pub fn clear_connection_failures(&self) {
        self.state.lock().connection_failures.clear();
    }

    pub fn poll_count(&self) -> usize {
        self.state.lock().poll_count
    }

    pub fn reactions_on(&self, comment_db_id: u64) -> BTreeSet<String> {
        self.state.lock().reactions.get(&comment_db_id).cloned().unwrap_or_default()
    }

    pub fn status_updates(&self) -> Vec<(String, Status)> {
        self.state.lock().status_updates.clone()
    }

    pub fn archived(&self) -> Vec<String> {
        self.state.lock().archived.clone()
    }

    pub fn comments_for(&self, repo: &RepoId, issue_number: u64) -> Vec<Comment> {
        self.state.lock().comments.get(&key(repo, issue_number)).cloned().unwrap_or_default()
    }

    pub fn labels_for(&self, repo: &RepoId, issue_number: u64) -> BTreeSet<String> {
        self.state.lock().labels.get(&key(repo, issue_number)).cloned().unwrap_or_default()
    }

    pub fn comment_updates(&self) -> Vec<(u64, String)> {
        self.state.lock().comment_updates.clone()
    }

    pub fn closed_changes(&self) -> Vec<u64> {
        self.state.lock().closed_changes.clone()
    }

    pub fn deleted_branches(&self) -> Vec<String> {
        self.state.lock().deleted_branches.clone()
    }

    pub fn change_body(&self, number: u64) -> Option<String> {
        self.state.lock().change_bodies.get(&number).cloned()
    }

    /// Refresh a comment's viewer-reaction flags from the reaction map.
    fn flagged(state: &FakeBackendState, comment: &Comment) -> Comment {
        let mut out = comment.clone();
        if let Some(reactions) = state.reactions.get(&comment.db_id) {
            out.processed = reactions.contains("+1");
            out.in_flight = reactions.contains("eyes");
        } else {
            out.processed = false;
            out.in_flight = false;
        }
        out
    }
}

#[async_trait]
impl TicketBackend for FakeBackend {
    fn supports_status_actor_check(&self) -> bool {
        self.state.lock().supports_status_actor_check
    }

    fn supports_linked_prs_first_class(&self) -> bool {
        self.state.lock().supports_linked_prs_first_class
    }

    fn description(&self) -> String {
        "FakeBackend".into()
    }

    async fn validate_connection(&self, host: &str) -> ConnectionStatus {
        let state = self.state.lock();
        state
            .connection_failures
            .get(host)
            .cloned()
            .unwrap_or(ConnectionStatus::Ok { login: state.bot_login.clone() })
    }

    async fn validate_scopes(&self, _host: &str) -> Result<(), BackendError> {
        Ok(())
    }

    async fn get_board_items(&self, board_url: &str) -> Result<Vec<BoardItem>, BackendError> {
        let mut state = self.state.lock();
        state.poll_count += 1;
        if let Some(message) = state.fail_next_poll.take() {
            return Err(BackendError::Network(message));
        }
        Ok(state
            .items
            .iter()
            .filter(|item| item.board_url == board_url)
            .cloned()
            .collect())
    }

    async fn get_board_metadata(&self, board_url: &str) -> Result<BoardMetadata, BackendError> {
        let mut options = BTreeMap::new();
        for name in ["Backlog", "Research", "Plan", "Implement", "Validate", "Done"] {
            options.insert(name.to_string(), format!("opt-{}", name.to_lowercase()));
        }
        Ok(BoardMetadata {
            project_id: format!("proj-{board_url}"),
            status_field_handle: "field-status".into(),
            status_options: options,
        })
    }

    async fn update_item_status(
        &self,
        _board_url: &str,
        item_handle: &str,
        new_status: &Status,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.status_updates.push((item_handle.to_string(), new_status.clone()));
        let bot = state.bot_login.clone();
        let mut touched = Vec::new();
        for item in &mut state.items {
            if item.item_handle == item_handle {
                item.status = new_status.clone();
                touched.push(key(&item.repo, item.issue_number));
            }
        }
        // The mutation makes the engine itself the latest status actor,
        // exactly as the real backend's timeline would report.
        for k in touched {
            state.status_actors.insert(k, bot.clone());
        }
        Ok(())
    }

    async fn archive_item(
        &self,
        _board_url: &str,
        item_handle: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.archived.push(item_handle.to_string());
        state.items.retain(|item| item.item_handle != item_handle);
        Ok(())
    }

    async fn get_issue_body(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError> {
        Ok(self.state.lock().issue_bodies.get(&key(repo, issue_number)).cloned())
    }

    async fn get_issue_labels(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<BTreeSet<String>, BackendError> {
        Ok(self.labels_for(repo, issue_number))
    }

    async fn get_repo_labels(&self, _repo: &RepoId) -> Result<Vec<String>, BackendError> {
        let state = self.state.lock();
        let mut labels: BTreeSet<String> =
            state.labels.values().flatten().cloned().collect();
        labels.extend(["bug".to_string(), "enhancement".to_string()]);
        Ok(labels.into_iter().collect())
    }

    async fn add_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError> {
        self.state
            .lock()
            .labels
            .entry(key(repo, issue_number))
            .or_default()
            .insert(label.to_string());
        Ok(())
    }

    async fn remove_label(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<(), BackendError> {
        if let Some(labels) = self.state.lock().labels.get_mut(&key(repo, issue_number)) {
            labels.remove(label);
        }
        Ok(())
    }

    async fn get_comments(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<Comment>, BackendError> {
        let state = self.state.lock();
        Ok(state
            .comments
            .get(&key(repo, issue_number))
            .map(|comments| comments.iter().map(|c| Self::flagged(&state, c)).collect())
            .unwrap_or_default())
    }

    async fn get_comments_since(
        &self,
        repo: &RepoId,
        issue_number: u64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Comment>, BackendError> {
        let state = self.state.lock();
        let mut out: Vec<Comment> = state
            .comments
            .get(&key(repo, issue_number))
            .map(|comments| {
                comments
                    .iter()
                    .filter(|c| since.map_or(true, |since| c.created_at >= since))
                    .map(|c| Self::flagged(&state, c))
                    .collect()
            })
            .unwrap_or_default();
        out.sort_by_key(|c| c.created_at);
        Ok(out)
    }

    async fn add_comment(
        &self,
        repo: &RepoId,
        issue_number: u64,
        body: &str,
    ) -> Result<Comment, BackendError> {
        let mut state = self.state.lock();
        state.next_comment_db_id += 1;
        state.clock += ChronoDuration::seconds(1);
        let comment = Comment {
            handle: format!("IC_{}", state.next_comment_db_id),
            db_id: state.next_comment_db_id,
            body: body.to_string(),
            created_at: state.clock,
            author: Some(state.bot_login.clone()),
            processed: false,
            in_flight: false,
        };
        state
            .comments
            .entry(key(repo, issue_number))
            .or_default()
            .push(comment.clone());
        // Keep the observed comment count in step.
        for item in &mut state.items {
            if &item.repo == repo && item.issue_number == issue_number {
                item.comment_count += 1;
            }
        }
        Ok(comment)
    }

    async fn update_comment(
        &self,
        _repo: &RepoId,
        comment_db_id: u64,
        body: &str,
    ) -> Result<(), BackendError> {
        let mut state = self.state.lock();
        state.comment_updates.push((comment_db_id, body.to_string()));
        for comments in state.comments.values_mut() {
            for comment in comments.iter_mut() {
                if comment.db_id == comment_db_id {
                    comment.body = body.to_string();
                }
            }
        }
        Ok(())
    }

    async fn add_reaction(
        &self,
        _repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError> {
        self.state
            .lock()
            .reactions
            .entry(comment_db_id)
            .or_default()
            .insert(reaction.rest_content().to_string());
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _repo: &RepoId,
        comment_db_id: u64,
        reaction: Reaction,
    ) -> Result<(), BackendError> {
        if let Some(reactions) = self.state.lock().reactions.get_mut(&comment_db_id) {
            reactions.remove(reaction.rest_content());
        }
        Ok(())
    }

    async fn get_last_status_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Option<String>, BackendError> {
        let state = self.state.lock();
        if !state.supports_status_actor_check {
            return Ok(None);
        }
        Ok(state.status_actors.get(&key(repo, issue_number)).cloned())
    }

    async fn get_label_actor(
        &self,
        repo: &RepoId,
        issue_number: u64,
        label: &str,
    ) -> Result<Option<String>, BackendError> {
        Ok(self
            .state
            .lock()
            .label_actors
            .get(&(key(repo, issue_number), label.to_string()))
            .cloned())
    }

    async fn get_linked_changes(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Vec<ChangeRef>, BackendError> {
        Ok(self
            .state
            .lock()
            .linked_changes
            .get(&key(repo, issue_number))
            .cloned()
            .unwrap_or_default())
    }

    async fn update_change_body(
        &self,
        _repo: &RepoId,
        number: u64,
        body: &str,
    ) -> Result<(), BackendError> {
        self.state.lock().change_bodies.insert(number, body.to_string());
        Ok(())
    }

    async fn close_change(&self, _repo: &RepoId, number: u64) -> Result<(), BackendError> {
        self.state.lock().closed_changes.push(number);
        Ok(())
    }

    async fn delete_branch(&self, _repo: &RepoId, branch: &str) -> Result<(), BackendError> {
        self.state.lock().deleted_branches.push(branch.to_string());
        Ok(())
    }
}

/// Scripted response for [`FakeRunner`].
enum FakeResponse {
    Success(RunnerOutput),
    Failure(String),
    TimeoutTotal,
    TimeoutInactivity,
    /// Simulates resuming a session the runner no longer knows.
    SessionGone,
}

#[derive(Default)]
struct FakeRunnerState {
    responses: VecDeque<FakeResponse>,
    requests: Vec<RunRequest>,
    valid_sessions: BTreeSet<String>,
}

/// Scripted [`AgentRunner`].
#[derive(Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeRunnerState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_success(&self, text: &str, session_id: &str) {
        self.push_success_with_metrics(text, session_id, UsageMetrics::default());
    }

    pub fn push_success_with_metrics(
        &self,
        text: &str,
        session_id: &str,
        metrics: UsageMetrics,
    ) {
        let mut state = self.state.lock();
        state.valid_sessions.insert(session_id.to_string());
        state.responses.push_back(FakeResponse::Success(RunnerOutput {
            response_text: text.to_string(),
            metrics,
            session_id: session_id.to_string(),
        }));
    }

    pub fn push_failure(&self, message: &str) {
        self.state.lock().responses.push_back(FakeResponse::Failure(message.to_string()));
    }

    pub fn push_timeout_total(&self) {
        self.state.lock().responses.push_back(FakeResponse::TimeoutTotal);
    }

    pub fn push_timeout_inactivity(&self) {
        self.state.lock().responses.push_back(FakeResponse::TimeoutInactivity);
    }

    pub fn push_session_gone(&self) {
        self.state.lock().responses.push_back(FakeResponse::SessionGone);
    }

    pub fn set_valid_session(&self, session_id: &str, valid: bool) {
        let mut state = self.state.lock();
        if valid {
            state.valid_sessions.insert(session_id.to_string());
        } else {
            state.valid_sessions.remove(session_id);
        }
    }

    pub fn requests(&self) -> Vec<RunRequest> {
        self.state.lock().requests.clone()
    }

    pub fn run_count(&self) -> usize {
        self.state.lock().requests.len()
    }
}

#[async_trait]
impl AgentRunner for FakeRunner {
    async fn run(&self, request: RunRequest) -> Result<RunnerOutput, RunnerError> {
        let mut state = self.state.lock();
        state.requests.push(request);
        match state.responses.pop_front() {
            Some(FakeResponse::Success(output)) => Ok(output),
            Some(FakeResponse::Failure(message)) => Err(RunnerError::AgentFailure(message)),
            Some(FakeResponse::TimeoutTotal) => Err(RunnerError::TimeoutTotal(3600)),
            Some(FakeResponse::TimeoutInactivity) => Err(RunnerError::TimeoutInactivity(300)),
            Some(FakeResponse::SessionGone) => {
                Err(RunnerError::AgentFailure("session not found".into()))
            }
            None => Err(RunnerError::AgentFailure("FakeRunner: no scripted response".into())),
        }
    }

    async fn validate_session_exists(&self, _cwd: &Path, session_id: &str) -> bool {
        self.state.lock().valid_sessions.contains(session_id)
    }
}
