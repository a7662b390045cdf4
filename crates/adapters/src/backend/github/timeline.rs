// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timeline queries used as the authorization oracle.

use super::{queries, GithubBackend};
use crate::backend::BackendError;
use kiln_core::RepoId;
use serde_json::{json, Value};

/// Who most recently changed the Status field on this issue's board item.
pub(crate) async fn get_last_status_actor(
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
        .graphql(&repo.host, queries::STATUS_ACTOR_QUERY, variables)
        .await?;

    let nodes = data
        .pointer("/repository/issue/timelineItems/nodes")
        .and_then(Value::as_array);
    // Nodes arrive oldest-first within the window; the last one wins.
    Ok(nodes
        .into_iter()
        .flatten()
        .rev()
        .find_map(|node| node.pointer("/actor/login").and_then(Value::as_str))
        .map(str::to_string))
}

/// Who most recently added the given label.
pub(crate) async fn get_label_actor(
    backend: &GithubBackend,
    repo: &RepoId,
    issue_number: u64,
    label: &str,
) -> Result<Option<String>, BackendError> {
    let variables = json!({
        "owner": repo.owner,
        "name": repo.name,
        "number": issue_number,
    });
    let data = backend
        .gh()
        .graphql(&repo.host, queries::LABEL_ACTOR_QUERY, variables)
        .await?;

    let nodes = data
        .pointer("/repository/issue/timelineItems/nodes")
        .and_then(Value::as_array);
    Ok(nodes
        .into_iter()
        .flatten()
        .rev()
        .filter(|node| {
            node.pointer("/label/name").and_then(Value::as_str) == Some(label)
        })
        .find_map(|node| node.pointer("/actor/login").and_then(Value::as_str))
        .map(str::to_string))
}
