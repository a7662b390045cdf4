// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue-level operations: bodies, labels, comments, reactions.

use super::{queries, GithubBackend};
use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use kiln_core::{Comment, Reaction, RepoId};
use serde_json::{json, Value};
use std::collections::BTreeSet;

/// Color for labels the engine creates on demand.
const CREATED_LABEL_COLOR: &str = "BFD4F2";

/// Normalize an RFC 3339 timestamp for use as a `since` query parameter.
///
/// A literal `+` in the query string decodes as a space on the server, so a
/// `+00:00` offset must be rewritten to the `Z` suffix.
pub(crate) fn normalize_since(timestamp: &str) -> String {
    match timestamp.strip_suffix("+00:00") {
        Some(prefix) => format!("{prefix}Z"),
        None => timestamp.to_string(),
    }
}

pub(crate) async fn get_issue_body(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
) -> Result<Option<String>, BackendError> {
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "number": issue_number,
    });
    let data = backend
        .gh()
        .graphql(&repo.host, queries::ISSUE_BODY_QUERY, variables)
        .await?;
    Ok(data
        .pointer("/repository/issue/body")
        .and_then(Value::as_str)
        .map(str::to_string))
}

pub(crate) async fn get_issue_labels(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
) -> Result<BTreeSet<String>, BackendError> {
    let path = format!("repos/{}/issues/{}/labels?per_page=100", repo.slug(), issue_number);
    let value = backend.gh().rest(&repo.host, "GET", &path, None).await?;
    Ok(value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|l| l.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

pub(crate) async fn get_repo_labels(
    backend: &GithubBackend,
    repo: &RepoId,
) -> Result<Vec<String>, BackendError> {
    let path = format!("repos/{}/labels?per_page=100", repo.slug());
    let value = backend.gh().rest(&repo.host, "GET", &path, None).await?;
    Ok(value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|l| l.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

pub(crate) async fn add_label(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
    label: &str,
) -> Result<(), BackendError> {
    let path = format!("repos/{}/issues/{}/labels", repo.slug(), issue_number);
    let body = json!({ "labels": [label] });
    match backend.gh().rest(&repo.host, "POST", &path, Some(body.clone())).await {
        Ok(_) => Ok(()),
        Err(BackendError::Api(msg)) if msg.to_lowercase().contains("not found") => {
            // Label missing at repository scope; create it, then retry.
            let create = json!({ "name": label, "color": CREATED_LABEL_COLOR });
            let create_path = format!("repos/{}/labels", repo.slug());
            backend.gh().rest(&repo.host, "POST", &create_path, Some(create)).await?;
            backend.gh().rest(&repo.host, "POST", &path, Some(body)).await?;
            Ok(())
        }
        Err(err) => Err(err),
    }
}

pub(crate) async fn remove_label(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
    label: &str,
) -> Result<(), BackendError> {
    let path = format!(
        "repos/{}/issues/{}/labels/{}",
        repo.slug(),
        issue_number,
        urlencoding::encode(label)
    );
    match backend.gh().rest(&repo.host, "DELETE", &path, None).await {
        Ok(_) => Ok(()),
        // Removing an already-absent label is a no-op.
        Err(BackendError::Api(msg)) if msg.to_lowercase().contains("not found") => Ok(()),
        Err(err) => Err(err),
    }
}

/// All comments on an issue, cursor-paged through GraphQL.
pub(crate) async fn get_comments(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
) -> Result<Vec<Comment>, BackendError> {
    let mut comments = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let variables = json!({
            "owner": repo.owner,
            "name": repo.name,
            "number": issue_number,
            "cursor": cursor,
        });
        let data = backend
            .gh()
            .graphql(&repo.host, queries::COMMENTS_QUERY, variables)
            .await?;
        let connection = data
            .pointer("/repository/issue/comments")
            .ok_or_else(|| BackendError::Parse(format!("issue {repo}#{issue_number} not found")))?;

        for node in connection
            .pointer("/nodes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(comment) = parse_comment_node(node) {
                comments.push(comment);
            }
        }

        let page = connection.pointer("/pageInfo");
        let has_next = page
            .and_then(|p| p.get("hasNextPage"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if !has_next {
            break;
        }
        let next = page
            .and_then(|p| p.get("endCursor"))
            .and_then(Value::as_str)
            .map(str::to_string);
        if next.is_none() || next == cursor {
            return Err(BackendError::StuckCursor(format!("{repo}#{issue_number} comments")));
        }
        cursor = next;
    }
    Ok(comments)
}

/// Comments created at or after `since`, via the REST `since` filter.
///
/// Viewer-reaction flags are resolved with one reactions call per returned
/// comment; the since filter keeps that set small.
pub(crate) async fn get_comments_since(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
    since: Option<DateTime<Utc>>,
) -> Result<Vec<Comment>, BackendError> {
    let mut path = format!("repos/{}/issues/{}/comments?per_page=100", repo.slug(), issue_number);
    if let Some(since) = since {
        path.push_str("&since=");
        path.push_str(&normalize_since(&since.to_rfc3339()));
    }
    let value = backend.gh().rest(&repo.host, "GET", &path, None).await?;
    let viewer = backend.viewer_login(&repo.host).await?;

    let mut comments = Vec::new();
    for raw in value.as_array().into_iter().flatten() {
        let Some(mut comment) = parse_rest_comment(raw) else {
            continue;
        };
        let (processed, in_flight) =
            viewer_reactions(backend, repo, comment.db_id, &viewer).await?;
        comment.processed = processed;
        comment.in_flight = in_flight;
        comments.push(comment);
    }
    comments.sort_by_key(|c| c.created_at);
    Ok(comments)
}

pub(crate) async fn add_comment(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
    body: &str,
) -> Result<Comment, BackendError> {
    let path = format!("repos/{}/issues/{}/comments", repo.slug(), issue_number);
    let value = backend
        .gh()
        .rest(&repo.host, "POST", &path, Some(json!({ "body": body })))
        .await?;
    parse_rest_comment(&value)
        .ok_or_else(|| BackendError::Parse("add_comment returned no comment".into()))
}

pub(crate) async fn update_comment(
    backend: &GithubBackend,
    repo: &RepoId,
    comment_db_id: u64,
    body: &str,
) -> Result<(), BackendError> {
    let path = format!("repos/{}/issues/comments/{}", repo.slug(), comment_db_id);
    backend
        .gh()
        .rest(&repo.host, "PATCH", &path, Some(json!({ "body": body })))
        .await?;
    Ok(())
}

pub(crate) async fn add_reaction(
    backend: &GithubBackend,
    repo: &RepoId,
    comment_db_id: u64,
    reaction: Reaction,
) -> Result<(), BackendError> {
    let path = format!("repos/{}/issues/comments/{}/reactions", repo.slug(), comment_db_id);
    backend
        .gh()
        .rest(&repo.host, "POST", &path, Some(json!({ "content": reaction.rest_content() })))
        .await?;
    Ok(())
}

pub(crate) async fn remove_reaction(
    backend: &GithubBackend,
    repo: &RepoId,
    comment_db_id: u64,
    reaction: Reaction,
) -> Result<(), BackendError> {
    let viewer = backend.viewer_login(&repo.host).await?;
    let list_path =
        format!("repos/{}/issues/comments/{}/reactions", repo.slug(), comment_db_id);
    let value = backend.gh().rest(&repo.host, "GET", &list_path, None).await?;

    for entry in value.as_array().into_iter().flatten() {
        let content = entry.get("content").and_then(Value::as_str);
        let login = entry.pointer("/user/login").and_then(Value::as_str);
        let id = entry.get("id").and_then(Value::as_u64);
        if content == Some(reaction.rest_content()) && login == Some(viewer.as_str()) {
            if let Some(id) = id {
                let delete_path = format!(
                    "repos/{}/issues/comments/{}/reactions/{}",
                    repo.slug(),
                    comment_db_id,
                    id
                );
                backend.gh().rest(&repo.host, "DELETE", &delete_path, None).await?;
            }
        }
    }
    Ok(())
}

/// Whether the viewer reacted THUMBS_UP / EYES on a comment.
async fn viewer_reactions(
    backend: &GithubBackend,
    repo: &RepoId,
    comment_db_id: u64,
    viewer: &str,
) -> Result<(bool, bool), BackendError> {
    let path = format!("repos/{}/issues/comments/{}/reactions", repo.slug(), comment_db_id);
    let value = backend.gh().rest(&repo.host, "GET", &path, None).await?;
    let mut processed = false;
    let mut in_flight = false;
    for entry in value.as_array().into_iter().flatten() {
        if entry.pointer("/user/login").and_then(Value::as_str) != Some(viewer) {
            continue;
        }
        match entry.get("content").and_then(Value::as_str) {
            Some("+1") => processed = true,
            Some("eyes") => in_flight = true,
            _ => {}
        }
    }
    Ok((processed, in_flight))
}

/// Parse one GraphQL comment node.
pub(crate) fn parse_comment_node(node: &Value) -> Option<Comment> {
    let mut processed = false;
    let mut in_flight = false;
    for group in node
        .pointer("/reactionGroups")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        let reacted = group
            .get("viewerHasReacted")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        match group.get("content").and_then(Value::as_str) {
            Some("THUMBS_UP") if reacted => processed = true,
            Some("EYES") if reacted => in_flight = true,
            _ => {}
        }
    }

    Some(Comment {
        handle: node.get("id")?.as_str()?.to_string(),
        db_id: node.get("databaseId").and_then(Value::as_u64)?,
        body: node.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        created_at: node
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())?,
        author: node
            .pointer("/author/login")
            .and_then(Value::as_str)
            .map(str::to_string),
        processed,
        in_flight,
    })
}

/// Parse one REST comment object.
pub(crate) fn parse_rest_comment(value: &Value) -> Option<Comment> {
    Some(Comment {
        handle: value.get("node_id")?.as_str()?.to_string(),
        db_id: value.get("id").and_then(Value::as_u64)?,
        body: value.get("body").and_then(Value::as_str).unwrap_or_default().to_string(),
        created_at: value
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())?,
        author: value
            .pointer("/user/login")
            .and_then(Value::as_str)
            .map(str::to_string),
        processed: false,
        in_flight: false,
    })
}

#[cfg(test)]
#[path = "issues_tests.rs"]
mod tests;
