// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage executor: one workflow stage end-to-end.
//!
//! The dispatcher calls [`Engine::execute_stage`] with the per-issue lock
//! and a pool permit already held. Agent failures are handled here so one
//! bad issue cannot stall the pool; only pre-claim backend errors propagate
//! to the caller.

use crate::{Engine, EngineError};
use kiln_adapters::{chat, pager, telemetry, AgentRunner, RunRequest, RunnerError, TicketBackend};
use kiln_core::workflow::{self, StageContext};
use kiln_core::{BoardItem, Clock, RunOutcome, Stage, Status, UsageMetrics};

impl<B, R, W, C> Engine<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: crate::worktree::WorktreeManager + 'static,
    C: Clock,
{
    /// Run one stage for one issue.
    ///
    /// `expected_actor` is the status actor observed at dispatch time; the
    /// claim is re-checked against it before any mutation.
    pub async fn execute_stage(
        &self,
        item: BoardItem,
        stage: Stage,
        expected_actor: Option<String>,
    ) -> Result<(), EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;

        // Double-check the claim: if someone moved the column under us,
        // abort without mutating anything.
        if self.backend().supports_status_actor_check() {
            let actor_now = self.backend().get_last_status_actor(&repo, issue).await?;
            if actor_now != expected_actor {
                tracing::info!(
                    %repo, issue, ?actor_now, ?expected_actor,
                    "status changed under us; aborting stage"
                );
                return Ok(());
            }
        }

        let claim_label = self.config().claim_label.clone();
        self.backend().add_label(&repo, issue, &claim_label).await?;
        self.claims().mark_held(&repo, issue);

        let result = self.run_stage_inner(&item, stage).await;

        // Claim release runs on every path.
        if let Err(e) = self.backend().remove_label(&repo, issue, &claim_label).await {
            tracing::warn!(%repo, issue, error = %e, "failed to release claim label");
        }
        self.claims().mark_released(&repo, issue);

        result
    }

    async fn run_stage_inner(&self, item: &BoardItem, stage: Stage) -> Result<(), EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;
        tracing::info!(%repo, issue, %stage, "starting stage");

        // Pre-flight plugin health; on failure notify chat and run the
        // stage with the plugin config suppressed.
        let mut plugins_suppressed = false;
        if let Some(plugins) = self.plugins() {
            if plugins.has_config() {
                match plugins.probe_all().await {
                    Ok(results) => {
                        for probe in results.iter().filter(|p| !p.ok) {
                            tracing::warn!(plugin = %probe.name, detail = %probe.detail, "plugin preflight failed");
                            chat::send_plugin_warning(&probe.name, &probe.detail).await;
                            plugins_suppressed = true;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "plugin config unreadable; suppressing");
                        plugins_suppressed = true;
                    }
                }
            }
        }

        // Force-refresh downstream credentials so the resolved plugin
        // config carries a token valid for the whole stage.
        if let Some(oauth) = self.oauth() {
            oauth.clear_token().await;
        }

        let worktree = self
            .worktrees()
            .ensure_worktree(&repo, issue)
            .await
            .map_err(EngineError::Worktree)?;

        let mut plugin_config_path = None;
        if !plugins_suppressed {
            if let Some(plugins) = self.plugins() {
                match plugins.write_to_worktree(&worktree.path).await {
                    Ok(path) => plugin_config_path = path,
                    Err(e) => {
                        tracing::warn!(error = %e, "failed to write plugin config; continuing without")
                    }
                }
            }
        }
        if let Some(credentials) = self.credentials() {
            if let Err(e) = credentials.copy_into_worktree(&repo, &worktree.path) {
                tracing::warn!(%repo, issue, error = %e, "credential injection failed");
            }
        }

        // A recreated working copy invalidates any stored session handle.
        let mut resume_session = self.store().get_session_handle(&repo, issue, stage);
        if worktree.freshly_created {
            if let Some(handle) = resume_session.clone() {
                if !self.runner().validate_session_exists(&worktree.path, &handle).await {
                    tracing::info!(%repo, issue, "stored session is stale; clearing");
                    self.store().clear_session_handle(&repo, issue, stage)?;
                    resume_session = None;
                }
            }
        }

        let issue_body = self
            .backend()
            .get_issue_body(&repo, issue)
            .await?
            .unwrap_or_default();
        let mut linked_pr_url = self
            .store()
            .get_issue_record(&repo, issue)
            .and_then(|rec| rec.linked_pr_url);
        if linked_pr_url.is_none() && stage == Stage::Validate {
            linked_pr_url = self
                .backend()
                .get_linked_changes(&repo, issue)
                .await?
                .first()
                .map(|change| change.url.clone());
        }

        let ctx = StageContext {
            item: item.clone(),
            stage,
            worktree_path: worktree.path.clone(),
            issue_body,
            linked_pr_url,
            resume_session: resume_session.clone(),
        };
        let prompt = workflow::prompts(&ctx).join("\n\n");

        let run_id =
            self.store()
                .insert_run_record(&repo, issue, stage, self.clock().now_utc())?;

        let result = self
            .runner()
            .run(RunRequest {
                prompt,
                cwd: worktree.path.clone(),
                model: self.config().model.clone(),
                resume_session,
                plugin_config_path,
                telemetry_enabled: telemetry::is_enabled(),
            })
            .await;
        let finished_at = self.clock().now_utc();

        match result {
            Ok(output) => {
                let posted = self.conclude_success(item, stage, &output.response_text).await;
                let outcome =
                    if posted.is_ok() { RunOutcome::Success } else { RunOutcome::InternalError };
                self.store().set_session_handle(&repo, issue, stage, &output.session_id)?;
                self.store().finish_run_record(
                    run_id,
                    finished_at,
                    outcome,
                    Some(output.session_id.clone()),
                    output.metrics.clone(),
                )?;
                telemetry::record_run(stage, &repo, issue, outcome, &output.metrics);
                posted
            }
            Err(err) => {
                let outcome = self.conclude_failure(item, stage, &err).await;
                self.store().finish_run_record(
                    run_id,
                    finished_at,
                    outcome,
                    None,
                    UsageMetrics::default(),
                )?;
                telemetry::record_run(stage, &repo, issue, outcome, &UsageMetrics::default());
                Ok(())
            }
        }
    }

    /// Success path: post the marked result, advance the column, archive on
    /// the final column, remember the session.
    async fn conclude_success(
        &self,
        item: &BoardItem,
        stage: Stage,
        response_text: &str,
    ) -> Result<(), EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;

        let body = format!("{}\n\n{}", stage.output_marker(), response_text);
        self.backend().add_comment(&repo, issue, &body).await?;

        // The implement stage opens a PR; remember its URL for validation
        // prompts and the reset handler.
        let mut linked_pr_url = None;
        if stage == Stage::Implement {
            linked_pr_url = self
                .backend()
                .get_linked_changes(&repo, issue)
                .await
                .unwrap_or_default()
                .first()
                .map(|change| change.url.clone());
        }

        let next = stage.next_column();
        self.backend()
            .update_item_status(&item.board_url, &item.item_handle, &next)
            .await?;
        if next == Status::Done {
            self.backend().archive_item(&item.board_url, &item.item_handle).await?;
        }

        self.store().clear_failure(&repo, issue)?;
        let mut record = self
            .store()
            .get_issue_record(&repo, issue)
            .unwrap_or_else(|| kiln_core::IssueRecord::new(item.board_url.clone(), repo.clone(), issue));
        record.last_observed_status = next.clone();
        if let Some(url) = linked_pr_url {
            record.linked_pr_url = Some(url);
        }
        self.store().upsert_issue_record(record)?;

        chat::send_stage_completion(&repo, issue, stage, &next).await;
        tracing::info!(%repo, issue, %stage, next = %next, "stage complete");
        Ok(())
    }

    /// Failure path: count, maybe hide, page on inactivity stalls, post a
    /// neutral comment, label. The column is never advanced.
    async fn conclude_failure(
        &self,
        item: &BoardItem,
        stage: Stage,
        err: &RunnerError,
    ) -> RunOutcome {
        let repo = item.repo.clone();
        let issue = item.issue_number;
        let outcome = match err {
            RunnerError::TimeoutTotal(_) => RunOutcome::TimeoutTotal,
            RunnerError::TimeoutInactivity(_) => RunOutcome::TimeoutInactivity,
            RunnerError::AgentFailure(_) => RunOutcome::AgentFailure,
            RunnerError::Spawn(_) => RunOutcome::InternalError,
        };
        tracing::error!(%repo, issue, %stage, error = %err, "stage failed");

        match self.store().touch_failure(&repo, issue) {
            Ok(failures) if failures >= self.config().max_consecutive_failures => {
                let until = self.clock().now_utc()
                    + chrono::Duration::from_std(self.config().failure_cooldown)
                        .unwrap_or_else(|_| chrono::Duration::hours(1));
                if let Err(e) = self.store().set_hidden_until(&repo, issue, Some(until)) {
                    tracing::warn!(error = %e, "failed to hide issue after repeated failures");
                } else {
                    tracing::warn!(%repo, issue, failures, %until, "issue hidden after repeated failures");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "failed to record failure"),
        }

        if outcome == RunOutcome::TimeoutInactivity {
            let dedup = format!("kiln-stall-{repo}#{issue}");
            pager::trigger_stall_alert(
                &dedup,
                &format!("Kiln agent stalled on {repo}#{issue} during {stage}"),
            )
            .await;
        }

        let body = format!(
            "{}\n\nI hit a problem running the {} stage and need a human to take a look.\n\n> {}",
            stage.output_marker(),
            stage,
            err
        );
        if let Err(e) = self.backend().add_comment(&repo, issue, &body).await {
            tracing::warn!(error = %e, "failed to post failure comment");
        }
        if let Err(e) = self.backend().add_label(&repo, issue, &self.config().error_label).await {
            tracing::warn!(error = %e, "failed to attach error label");
        }
        outcome
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
