// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Comment-revision engine.
//!
//! When allow-listed users comment on an issue sitting in Research or
//! Plan, the engine resumes the stage's agent session, applies the
//! requested revision to its most recent posted artifact, and replies with
//! a diff. The EYES reaction is the soft in-flight sentinel; the persisted
//! ProcessingCommentSet is the hard one that survives crashes.

use crate::{diff_fmt, Engine, EngineError};
use kiln_adapters::{chat, AgentRunner, RunRequest, TicketBackend};
use kiln_core::workflow::{is_kiln_post, is_kiln_response, post_content, revision_prompt};
use kiln_core::{BoardItem, Clock, Comment, Reaction, Stage, Status};

impl<B, R, W, C> Engine<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: crate::worktree::WorktreeManager + 'static,
    C: Clock,
{
    /// Apply every pending revision comment on `item`, oldest first.
    pub async fn process_revision_comments(&self, item: BoardItem) -> Result<(), EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;

        // Backlog items are never touched: no reactions, no store writes.
        if item.status == Status::Backlog {
            return Ok(());
        }
        let Some(stage) = Stage::for_status(&item.status) else {
            return Ok(());
        };

        let record = self.store().get_issue_record(&repo, issue);
        let since = record.as_ref().and_then(|r| r.last_processed_comment_at);

        let comments = self.backend().get_comments_since(&repo, issue, since).await?;
        let allow = &self.config().allow_list;
        let bot = self.config().bot_login.clone();
        let eligible: Vec<Comment> = comments
            .into_iter()
            .filter(|c| {
                c.author
                    .as_deref()
                    .is_some_and(|a| allow.contains(a) && !a.eq_ignore_ascii_case(&bot))
                    && !is_kiln_post(&c.body)
                    && !is_kiln_response(&c.body)
                    && !c.processed
                    && !c.in_flight
                    && since.map_or(true, |s| c.created_at > s)
            })
            .collect();
        if eligible.is_empty() {
            return Ok(());
        }

        // Locate the artifact: the latest engine post carrying this
        // stage's marker. Nothing posted yet means nothing to revise.
        let marker = stage.output_marker();
        let all = self.backend().get_comments(&repo, issue).await?;
        let Some(target) = all.iter().rev().find(|c| post_content(&c.body, marker).is_some())
        else {
            tracing::debug!(%repo, issue, %stage, "no posted artifact; nothing to revise");
            return Ok(());
        };
        let target_db_id = target.db_id;
        let mut target_content = post_content(&target.body, marker).unwrap_or_default().to_string();

        for comment in eligible {
            // Hard sentinel first, then the visible acknowledgement.
            self.store().add_processing_comment(&repo, issue, &comment.handle)?;
            self.backend().add_reaction(&repo, comment.db_id, Reaction::Eyes).await?;

            let applied = self
                .apply_one_revision(&item, stage, target_db_id, &target_content, &comment)
                .await;

            match applied {
                Ok(revised) => {
                    target_content = revised;
                    self.backend()
                        .add_reaction(&repo, comment.db_id, Reaction::ThumbsUp)
                        .await?;
                    self.backend()
                        .remove_reaction(&repo, comment.db_id, Reaction::Eyes)
                        .await?;
                    self.store().remove_processing_comment(&repo, issue, &comment.handle)?;
                    self.advance_comment_watermark(&item, comment.created_at)?;
                    if self.config().notify_on_comment {
                        if let Some(author) = comment.author.as_deref() {
                            chat::send_comment_processed(&repo, issue, author).await;
                        }
                    }
                    tracing::info!(%repo, issue, comment = comment.db_id, "revision applied");
                }
                Err(e) => {
                    // Leave the comment unprocessed so a future poll
                    // retries; both sentinels come off.
                    if let Err(re) =
                        self.backend().remove_reaction(&repo, comment.db_id, Reaction::Eyes).await
                    {
                        tracing::warn!(error = %re, "failed to remove EYES after revision failure");
                    }
                    if let Err(se) =
                        self.store().remove_processing_comment(&repo, issue, &comment.handle)
                    {
                        tracing::warn!(error = %se, "failed to clear processing-comment entry");
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Run the agent once for one revision comment; returns the revised
    /// artifact content.
    async fn apply_one_revision(
        &self,
        item: &BoardItem,
        stage: Stage,
        target_db_id: u64,
        target_content: &str,
        comment: &Comment,
    ) -> Result<String, EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;

        let worktree = self
            .worktrees()
            .ensure_worktree(&repo, issue)
            .await
            .map_err(EngineError::Worktree)?;

        let mut plugin_config_path = None;
        if let Some(plugins) = self.plugins() {
            match plugins.write_to_worktree(&worktree.path).await {
                Ok(path) => plugin_config_path = path,
                Err(e) => tracing::warn!(error = %e, "failed to write plugin config; continuing"),
            }
        }

        // Resume the stage session when it still exists; a purged worktree
        // or expired session falls back to a fresh invocation.
        let mut resume_session = self.store().get_session_handle(&repo, issue, stage);
        if let Some(handle) = resume_session.clone() {
            if !self.runner().validate_session_exists(&worktree.path, &handle).await {
                tracing::info!(%repo, issue, "stored session gone; revising without resumption");
                self.store().clear_session_handle(&repo, issue, stage)?;
                resume_session = None;
            }
        }

        let prompt = revision_prompt(stage, target_content, &comment.body);
        let output = self
            .runner()
            .run(RunRequest {
                prompt,
                cwd: worktree.path.clone(),
                model: self.config().model.clone(),
                resume_session,
                plugin_config_path,
                telemetry_enabled: kiln_adapters::telemetry::is_enabled(),
            })
            .await?;

        let revised = output.response_text;
        let new_body = format!("{}\n\n{}", stage.output_marker(), revised);
        self.backend().update_comment(&repo, target_db_id, &new_body).await?;

        let reply = diff_fmt::revision_reply(target_content, &revised, self.config().diff_width);
        self.backend().add_comment(&repo, issue, &reply).await?;

        self.store().set_session_handle(&repo, issue, stage, &output.session_id)?;
        Ok(revised)
    }

    /// Advance `last_processed_comment_at`, which only ever moves forward.
    fn advance_comment_watermark(
        &self,
        item: &BoardItem,
        applied_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), EngineError> {
        let mut record = self
            .store()
            .get_issue_record(&item.repo, item.issue_number)
            .unwrap_or_else(|| {
                kiln_core::IssueRecord::new(
                    item.board_url.clone(),
                    item.repo.clone(),
                    item.issue_number,
                )
            });
        if record.last_processed_comment_at.map_or(true, |prev| applied_at > prev) {
            record.last_processed_comment_at = Some(applied_at);
            self.store().upsert_issue_record(record)?;
        }
        Ok(())
    }

    /// Startup resync of the in-flight sentinels: any comment still in the
    /// ProcessingCommentSet was interrupted mid-application. The hard
    /// sentinel wins: drop the entry and take the EYES reaction off so the
    /// next poll retries the comment.
    pub async fn resync_processing_comments(&self) {
        for entry in self.store().list_processing_comments() {
            let comments = match self.backend().get_comments(&entry.repo, entry.issue_number).await
            {
                Ok(comments) => comments,
                Err(e) => {
                    tracing::warn!(
                        repo = %entry.repo, issue = entry.issue_number, error = %e,
                        "resync: failed to list comments; leaving entry for next startup"
                    );
                    continue;
                }
            };
            if let Some(comment) = comments.iter().find(|c| c.handle == entry.comment_handle) {
                if let Err(e) = self
                    .backend()
                    .remove_reaction(&entry.repo, comment.db_id, Reaction::Eyes)
                    .await
                {
                    tracing::warn!(error = %e, "resync: failed to remove EYES");
                }
            }
            if let Err(e) = self.store().remove_processing_comment(
                &entry.repo,
                entry.issue_number,
                &entry.comment_handle,
            ) {
                tracing::warn!(error = %e, "resync: failed to drop processing-comment entry");
            } else {
                tracing::info!(
                    repo = %entry.repo, issue = entry.issue_number,
                    comment = %entry.comment_handle,
                    "resync: cleared interrupted comment application"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "revision_tests.rs"]
mod tests;
