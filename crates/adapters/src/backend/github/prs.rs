// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Linked pull requests and the reset handler's PR mutations.

use super::{queries, GithubBackend};
use crate::backend::{BackendError, ChangeRef};
use kiln_core::RepoId;
use regex::Regex;
use serde_json::{json, Value};

/// Pattern matching a closing keyword for one issue: keyword, optional
/// colon, whitespace, `#N`. Keywords: close/closes/closed, fix/fixes/fixed,
/// resolve/resolves/resolved.
#[allow(clippy::unwrap_used)] // pattern is static modulo an integer
pub fn closing_keyword_regex(issue_number: u64) -> Regex {
    Regex::new(&format!(
        r"(?i)\b(close[sd]?|fix(?:e[sd])?|resolve[sd]?):?\s*#{issue_number}\b"
    ))
    .unwrap()
}

/// Whether a PR body declares it closes the given issue.
pub fn body_closes_issue(body: &str, issue_number: u64) -> bool {
    closing_keyword_regex(issue_number).is_match(body)
}

/// Remove closing keywords for one issue, keeping the bare `#N` reference
/// as a breadcrumb.
pub fn remove_closing_keywords(body: &str, issue_number: u64) -> String {
    closing_keyword_regex(issue_number)
        .replace_all(body, format!("#{issue_number}").as_str())
        .into_owned()
}

fn parse_pr_node(node: &Value) -> Option<ChangeRef> {
    Some(ChangeRef {
        number: node.get("number").and_then(Value::as_u64)?,
        url: node.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
        body: node.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        state: node.get("state").and_then(Value::as_str).unwrap_or("OPEN").to_string(),
        merged: node.get("merged").and_then(Value::as_bool).unwrap_or(false),
        branch_name: node
            .get("headRefName")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// First-class linked-PR query (dotcom, GHES >= 3.18).
pub(crate) async fn get_linked_changes_first_class(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
) -> Result<Vec<ChangeRef>, BackendError> {
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "number": issue_number,
    });
    let data = backend
        .gh()
        .graphql(&repo.host, queries::LINKED_PRS_QUERY, variables)
        .await?;
    Ok(data
        .pointer("/repository/issue/closedByPullRequestsReferences/nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(parse_pr_node)
        .collect())
}

/// Timeline-scan substitute for older GHES: cross-referenced PRs whose body
/// carries a closing keyword for this issue.
pub(crate) async fn get_linked_changes_timeline(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
) -> Result<Vec<ChangeRef>, BackendError> {
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "number": issue_number,
    });
    let data = backend
        .gh()
        .graphql(&repo.host, queries::CROSS_REFERENCED_PRS_QUERY, variables)
        .await?;

    let mut changes: Vec<ChangeRef> = data
        .pointer("/repository/issue/timelineItems/nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|node| parse_pr_node(node.pointer("/source")?))
        .filter(|change| body_closes_issue(&change.body, issue_number))
        .collect();

    // A PR can cross-reference the issue more than once.
    changes.sort_by_key(|c| c.number);
    changes.dedup_by_key(|c| c.number);
    Ok(changes)
}

pub(crate) async fn update_change_body(
    backend: &GithubBackend,
    repo: &RepoId,
    number: u64,
    body: &str,
) -> Result<(), BackendError> {
    let path = format!("repos/{}/pulls/{}", repo.slug(), number);
    backend
        .gh()
        .rest(&repo.host, "PATCH", &path, Some(json!({ "body": body })))
        .await?;
    Ok(())
}

pub(crate) async fn close_change(
    backend: &GithubBackend,
    repo: &RepoId,
    number: u64,
) -> Result<(), BackendError> {
    let path = format!("repos/{}/pulls/{}", repo.slug(), number);
    backend
        .gh()
        .rest(&repo.host, "PATCH", &path, Some(json!({ "state": "closed" })))
        .await?;
    Ok(())
}

/// Delete a branch. Names containing `/` are URL-encoded so
/// `kiln/issue-42` round-trips through the refs endpoint.
pub(crate) async fn delete_branch(
    backend: &GithubBackend,
    repo: &RepoId,
    branch: &str,
) -> Result<(), BackendError> {
    let path = format!(
        "repos/{}/git/refs/heads/{}",
        repo.slug(),
        urlencoding::encode(branch)
    );
    match backend.gh().rest(&repo.host, "DELETE", &path, None).await {
        Ok(_) => Ok(()),
        // Branch already gone is success for a best-effort delete.
        Err(BackendError::Api(msg)) if msg.to_lowercase().contains("not found") => Ok(()),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
#[path = "prs_tests.rs"]
mod tests;
