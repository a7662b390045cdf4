// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claim & dispatch: poll boards, diff against the store, gate, and route.
//!
//! Routing order per candidate: reset (status fell back to Backlog),
//! revision (newer allow-listed comments on a Research/Plan item with a
//! posted artifact), stage dispatch (authorized column change). Workers run
//! on a bounded pool; the per-issue lock drops duplicate dispatches from
//! overlapping polls.

use crate::{Engine, EngineError};
use kiln_adapters::{AgentRunner, TicketBackend};
use kiln_core::workflow::{is_kiln_post, is_kiln_response};
use kiln_core::{BoardItem, Clock, IssueRecord, IssueState, RunOutcome, Stage, Status};

/// Counters for one poll pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PollStats {
    pub observed: usize,
    pub stages_dispatched: usize,
    pub revisions_dispatched: usize,
    pub resets_dispatched: usize,
    pub skipped: usize,
}

enum Route {
    Stage(Stage, Option<String>),
    Revision,
    Reset,
    Skip,
}

impl<B, R, W, C> Engine<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: crate::worktree::WorktreeManager + 'static,
    C: Clock,
{
    /// One full poll over every configured board.
    ///
    /// Network errors propagate to the supervisor's health check; other
    /// per-item errors are logged and the poll continues.
    pub async fn poll_once(&self) -> Result<PollStats, EngineError> {
        let mut stats = PollStats::default();
        for board_url in self.config().boards.clone() {
            let items = self.backend().get_board_items(&board_url).await?;
            tracing::debug!(board = %board_url, items = items.len(), "polled board");
            for item in items {
                stats.observed += 1;
                match self.route_item(&item).await {
                    Ok(route) => self.dispatch_route(item, route, &mut stats),
                    Err(e) if e.is_network() => return Err(e),
                    Err(e) => {
                        tracing::warn!(
                            repo = %item.repo, issue = item.issue_number, error = %e,
                            "failed to route item"
                        );
                        stats.skipped += 1;
                    }
                }
            }
        }
        Ok(stats)
    }

    fn dispatch_route(&self, item: BoardItem, route: Route, stats: &mut PollStats) {
        match route {
            Route::Skip => stats.skipped += 1,
            Route::Stage(stage, actor) => {
                stats.stages_dispatched += 1;
                self.spawn_worker(item, WorkerKind::Stage(stage, actor));
            }
            Route::Revision => {
                stats.revisions_dispatched += 1;
                self.spawn_worker(item, WorkerKind::Revision);
            }
            Route::Reset => {
                stats.resets_dispatched += 1;
                self.spawn_worker(item, WorkerKind::Reset);
            }
        }
    }

    /// Decide what, if anything, to do with one observed item. Also keeps
    /// the issue record's observed fields current.
    async fn route_item(&self, item: &BoardItem) -> Result<Route, EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;
        let record = self.store().get_issue_record(&repo, issue);
        let prev_status = record.as_ref().map(|r| r.last_observed_status.clone());

        // Reset routing: a human pulled an active item back to Backlog.
        if item.status == Status::Backlog {
            let was_active = prev_status.as_ref().is_some_and(Status::is_workflow_column);
            let route = if was_active && self.reset_authorized(&repo, issue).await? {
                Route::Reset
            } else {
                Route::Skip
            };
            self.remember_observation(item, record)?;
            return Ok(route);
        }

        if !item.status.is_workflow_column() {
            self.remember_observation(item, record)?;
            return Ok(Route::Skip);
        }
        let Some(stage) = Stage::for_status(&item.status) else {
            self.remember_observation(item, record)?;
            return Ok(Route::Skip);
        };

        if item.state == IssueState::Closed {
            tracing::debug!(%repo, issue, "issue closed; skipping");
            self.remember_observation(item, record)?;
            return Ok(Route::Skip);
        }

        // Retry suppression.
        if let Some(hidden_until) = self.store().get_hidden_until(&repo, issue) {
            if hidden_until > self.clock().now_utc() {
                tracing::debug!(%repo, issue, %hidden_until, "issue hidden; skipping");
                self.remember_observation(item, record)?;
                return Ok(Route::Skip);
            }
        }

        // Revision routing: newer allow-listed comments on an item whose
        // stage artifact has been posted.
        if matches!(stage, Stage::Research | Stage::Plan)
            && self.stage_succeeded_before(&repo, issue, stage)
            && self.has_pending_revision_comments(item, record.as_ref()).await?
        {
            self.remember_observation(item, record)?;
            return Ok(Route::Revision);
        }

        // Authorization gate for stage work.
        let actor = self.backend().get_last_status_actor(&repo, issue).await?;
        if !self.stage_authorized(item, actor.as_deref()).await? {
            // Team members outside the allow-list are filtered silently.
            tracing::debug!(%repo, issue, ?actor, "status actor not authorized; skipping");
            self.remember_observation(item, record)?;
            return Ok(Route::Skip);
        }

        self.remember_observation(item, record)?;
        Ok(Route::Stage(stage, actor))
    }

    /// Whether the status fallback to Backlog came from an allow-listed
    /// actor.
    async fn reset_authorized(&self, repo: &kiln_core::RepoId, issue: u64) -> Result<bool, EngineError> {
        if !self.backend().supports_status_actor_check() {
            tracing::debug!(%repo, issue, "no status-actor capability; allowing reset");
            return Ok(true);
        }
        let actor = self.backend().get_last_status_actor(repo, issue).await?;
        Ok(actor.as_deref().is_some_and(|a| self.config().allow_list.contains(a)))
    }

    /// Authorization gate: allow-listed status actor, or the optional
    /// "proceed anyway" label added by an allow-listed actor. Backends
    /// without the capability degrade to allowing the dispatch.
    async fn stage_authorized(
        &self,
        item: &BoardItem,
        actor: Option<&str>,
    ) -> Result<bool, EngineError> {
        if !self.backend().supports_status_actor_check() {
            tracing::debug!(
                repo = %item.repo, issue = item.issue_number,
                "no status-actor capability; skipping authorization gate"
            );
            return Ok(true);
        }
        if actor.is_some_and(|a| self.config().allow_list.contains(a)) {
            return Ok(true);
        }
        if let Some(label) = &self.config().proceed_label {
            if item.labels.contains(label) {
                let adder = self
                    .backend()
                    .get_label_actor(&item.repo, item.issue_number, label)
                    .await?;
                if adder.is_some_and(|a| self.config().allow_list.contains(&a)) {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Whether this stage already produced a posted artifact for the issue.
    fn stage_succeeded_before(&self, repo: &kiln_core::RepoId, issue: u64, stage: Stage) -> bool {
        self.store()
            .run_records_for(repo, issue)
            .iter()
            .any(|run| run.stage == stage && run.outcome == Some(RunOutcome::Success))
    }

    /// Whether any unprocessed, allow-listed, human-authored comment newer
    /// than the high-water mark exists.
    async fn has_pending_revision_comments(
        &self,
        item: &BoardItem,
        record: Option<&IssueRecord>,
    ) -> Result<bool, EngineError> {
        let since = record.and_then(|r| r.last_processed_comment_at);
        let comments = self
            .backend()
            .get_comments_since(&item.repo, item.issue_number, since)
            .await?;
        let allow = &self.config().allow_list;
        let bot = &self.config().bot_login;
        Ok(comments.iter().any(|c| {
            c.author.as_deref().is_some_and(|a| allow.contains(a) && !a.eq_ignore_ascii_case(bot))
                && !is_kiln_post(&c.body)
                && !is_kiln_response(&c.body)
                && !c.processed
                && !c.in_flight
                && since.map_or(true, |s| c.created_at > s)
        }))
    }

    /// Update the record's observed fields after routing decisions used
    /// the previous values.
    fn remember_observation(
        &self,
        item: &BoardItem,
        record: Option<IssueRecord>,
    ) -> Result<(), EngineError> {
        let mut record = record.unwrap_or_else(|| {
            IssueRecord::new(item.board_url.clone(), item.repo.clone(), item.issue_number)
        });
        record.board_url = item.board_url.clone();
        record.last_observed_status = item.status.clone();
        record.last_known_comment_count = item.comment_count;
        self.store().upsert_issue_record(record)?;
        Ok(())
    }

    fn spawn_worker(&self, item: BoardItem, kind: WorkerKind) {
        let engine = self.clone();
        self.workers().spawn(async move {
            let repo = item.repo.clone();
            let issue = item.issue_number;

            let Ok(_permit) = engine.pool().acquire().await else {
                return;
            };
            // Single in-flight stage or revision per issue; a second
            // dispatch from this or an overlapping poll bows out here.
            let Some(_guard) = engine.locks().try_acquire(&repo, issue) else {
                tracing::debug!(%repo, issue, "issue already in flight; skipping dispatch");
                return;
            };
            if engine.shutdown_token().is_cancelled() {
                return;
            }

            let result = match kind {
                WorkerKind::Stage(stage, actor) => {
                    engine.execute_stage(item, stage, actor).await
                }
                WorkerKind::Revision => engine.process_revision_comments(item).await,
                WorkerKind::Reset => engine.handle_reset(item).await,
            };
            if let Err(e) = result {
                tracing::error!(%repo, issue, error = %e, "worker failed");
            }
        });
    }
}

enum WorkerKind {
    Stage(Stage, Option<String>),
    Revision,
    Reset,
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
