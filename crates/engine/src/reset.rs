// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reset handler: a human pulled an active issue back to Backlog.
//!
//! Linked change-sets are unlinked (closing keywords rewritten to bare
//! references), closed, and their branches best-effort deleted. The
//! worktree is left in place; the next dispatch refreshes it.

use crate::{Engine, EngineError};
use kiln_adapters::backend::remove_closing_keywords;
use kiln_adapters::{AgentRunner, TicketBackend};
use kiln_core::{BoardItem, Clock};

impl<B, R, W, C> Engine<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: crate::worktree::WorktreeManager + 'static,
    C: Clock,
{
    pub async fn handle_reset(&self, item: BoardItem) -> Result<(), EngineError> {
        let repo = item.repo.clone();
        let issue = item.issue_number;
        tracing::info!(%repo, issue, "resetting issue");

        let changes = self.backend().get_linked_changes(&repo, issue).await?;
        for change in changes {
            let unlinked = remove_closing_keywords(&change.body, issue);
            if unlinked != change.body {
                self.backend().update_change_body(&repo, change.number, &unlinked).await?;
            }
            if change.state == "OPEN" {
                self.backend().close_change(&repo, change.number).await?;
            }
            if let Some(branch) = &change.branch_name {
                // Best-effort; a protected or already-deleted branch is
                // not a reset failure.
                if let Err(e) = self.backend().delete_branch(&repo, branch).await {
                    tracing::warn!(%repo, branch, error = %e, "branch delete failed");
                }
            }
            tracing::info!(%repo, issue, change = change.number, "unlinked and closed change-set");
        }

        self.store().clear_all_session_handles(&repo, issue)?;
        self.store().clear_failure(&repo, issue)?;
        self.store().set_hidden_until(&repo, issue, None)?;

        if let Some(mut record) = self.store().get_issue_record(&repo, issue) {
            record.last_processed_comment_at = None;
            record.linked_pr_url = None;
            self.store().upsert_issue_record(record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "reset_tests.rs"]
mod tests;
