// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow registry: per-stage prompt construction and post markers.
//!
//! Stages are pure data plus pure functions. They perform no I/O; the stage
//! executor supplies a [`StageContext`] and receives the prompt strings to
//! feed the agent runner.

use crate::board::BoardItem;
use crate::stage::Stage;
use std::path::PathBuf;

/// Marker embedded in engine-authored revision replies.
pub const RESPONSE_MARKER: &str = "<!-- kiln:response -->";

/// Everything a stage needs to produce its prompts.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub item: BoardItem,
    pub stage: Stage,
    pub worktree_path: PathBuf,
    pub issue_body: String,
    /// PR the issue is linked to, if a prior stage opened one.
    pub linked_pr_url: Option<String>,
    /// Session handle to resume, when still valid.
    pub resume_session: Option<String>,
}

/// Whether a comment body is an engine-authored stage post.
///
/// The marker must be the first non-whitespace token.
pub fn is_kiln_post(body: &str) -> bool {
    let trimmed = body.trim_start();
    Stage::ALL.iter().any(|stage| trimmed.starts_with(stage.output_marker()))
}

/// Whether a comment body is an engine-authored revision reply.
pub fn is_kiln_response(body: &str) -> bool {
    body.trim_start().starts_with(RESPONSE_MARKER)
}

/// Extract the markdown content following `marker` in an engine post.
pub fn post_content<'a>(body: &'a str, marker: &str) -> Option<&'a str> {
    let trimmed = body.trim_start();
    trimmed.strip_prefix(marker).map(str::trim_start)
}

/// Build the prompt sequence for one stage invocation.
///
/// Deterministic given the context: the same issue, body, and linked PR
/// always produce the same strings.
pub fn prompts(ctx: &StageContext) -> Vec<String> {
    let issue = format!(
        "Repository: {repo}\nIssue #{number}: {title}\n\n{body}",
        repo = ctx.item.repo,
        number = ctx.item.issue_number,
        title = ctx.item.title,
        body = ctx.issue_body,
    );

    match ctx.stage {
        Stage::Research => vec![format!(
            "You are working in {cwd}.\n\n{issue}\n\n\
             Research this issue. Read the relevant code and summarize: the \
             root cause or the change being requested, the files and modules \
             involved, existing patterns to follow, and any risks or open \
             questions. Do not modify any files. Reply with your findings as \
             markdown.",
            cwd = ctx.worktree_path.display(),
        )],
        Stage::Plan => vec![format!(
            "You are working in {cwd}.\n\n{issue}\n\n\
             Produce an implementation plan for this issue: an ordered list \
             of concrete steps, the files each step touches, and how the \
             change will be tested. Do not modify any files. Reply with the \
             plan as markdown.",
            cwd = ctx.worktree_path.display(),
        )],
        Stage::Implement => vec![format!(
            "You are working in {cwd}.\n\n{issue}\n\n\
             Implement this issue following the plan posted on the issue. \
             Create a branch named kiln/issue-{number}, commit your changes, \
             push the branch, and open a pull request whose description \
             contains \"Closes #{number}\". Reply with a summary of the \
             changes and the pull request URL.",
            cwd = ctx.worktree_path.display(),
            number = ctx.item.issue_number,
        )],
        Stage::Validate => {
            let pr = ctx.linked_pr_url.as_deref().unwrap_or("(no linked pull request found)");
            vec![format!(
                "You are working in {cwd}.\n\n{issue}\n\nPull request: {pr}\n\n\
                 Validate the pull request for this issue: check out the PR \
                 branch, run the test suite, and review the diff against the \
                 plan posted on the issue. Reply with a validation report \
                 listing what was checked and any problems found.",
                cwd = ctx.worktree_path.display(),
            )]
        }
    }
}

/// Build the prompt for applying a user revision comment to a prior stage
/// artifact.
///
/// Deterministic given `(target, user_comment)` so a retried application
/// sends the agent the same request.
pub fn revision_prompt(stage: Stage, target: &str, user_comment: &str) -> String {
    format!(
        "A reviewer commented on the {name} you produced earlier.\n\n\
         Current {name}:\n\n{target}\n\n\
         Reviewer comment:\n\n{comment}\n\n\
         Apply the requested revision and reply with the complete revised \
         {name} as markdown. Keep everything the reviewer did not ask to \
         change.",
        name = stage.name(),
        target = target,
        comment = user_comment,
    )
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
