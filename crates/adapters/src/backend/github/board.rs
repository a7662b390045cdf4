// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project board queries and mutations.

use super::{queries, GithubBackend};
use crate::backend::{BackendError, BoardMetadata};
use kiln_core::{BoardItem, IssueState, RepoId, StateReason, Status};
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Owner kind of a project board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BoardOwner {
    Organization,
    User,
}

/// Parsed board URL: host, owner kind, owner login, project number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BoardRef {
    pub host: String,
    pub owner_kind: BoardOwner,
    pub owner: String,
    pub number: u64,
}

/// Parse `https://<host>/orgs/<org>/projects/<n>` or
/// `https://<host>/users/<user>/projects/<n>`.
pub(crate) fn parse_board_url(board_url: &str) -> Result<BoardRef, BackendError> {
    let rest = board_url
        .strip_prefix("https://")
        .or_else(|| board_url.strip_prefix("http://"))
        .ok_or_else(|| BackendError::Parse(format!("unrecognized board URL: {board_url}")))?;

    let parts: Vec<&str> = rest.trim_end_matches('/').split('/').collect();
    match parts.as_slice() {
        [host, kind, owner, "projects", number] => {
            let owner_kind = match *kind {
                "orgs" => BoardOwner::Organization,
                "users" => BoardOwner::User,
                _ => {
                    return Err(BackendError::Parse(format!(
                        "unrecognized board URL: {board_url}"
                    )))
                }
            };
            let number = number.parse::<u64>().map_err(|_| {
                BackendError::Parse(format!("invalid project number in {board_url}"))
            })?;
            Ok(BoardRef {
                host: host.to_string(),
                owner_kind,
                owner: owner.to_string(),
                number,
            })
        }
        _ => Err(BackendError::Parse(format!("unrecognized board URL: {board_url}"))),
    }
}

/// Fetch every item on the board, following cursors until exhausted.
///
/// Bails with [`BackendError::StuckCursor`] if a page returns the same end
/// cursor twice, rather than looping forever on a broken backend.
pub(crate) async fn get_board_items(
    backend: &GithubBackend,
    board_url: &str,
) -> Result<Vec<BoardItem>, BackendError> {
    let board = parse_board_url(board_url)?;
    let (query, root) = match board.owner_kind {
        BoardOwner::Organization => (queries::BOARD_ITEMS_QUERY, "organization"),
        BoardOwner::User => (queries::USER_BOARD_ITEMS_QUERY, "user"),
    };

    let mut items = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let variables = json!({
            "owner": board.owner,
            "number": board.number,
            "cursor": cursor,
        });
        let data = backend.gh().graphql(&board.host, query, variables).await?;
        let connection = data
            .pointer(&format!("/{root}/projectV2/items"))
            .ok_or_else(|| {
                BackendError::Parse(format!("board {board_url} returned no project"))
            })?;

        for node in connection
            .pointer("/nodes")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(item) = parse_board_item_node(node, board_url, &board.host) {
                items.push(item);
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
            return Err(BackendError::StuckCursor(board_url.to_string()));
        }
        cursor = next;
    }
    Ok(items)
}

/// Convert one GraphQL item node into a BoardItem.
///
/// Returns `None` for non-issue content (draft items, PRs on the board).
pub(crate) fn parse_board_item_node(
    node: &Value,
    board_url: &str,
    host: &str,
) -> Option<BoardItem> {
    let item_handle = node.get("id")?.as_str()?.to_string();
    let content = node.get("content")?;
    let issue_number = content.get("number")?.as_u64()?;

    let repo = RepoId::new(
        host,
        content.pointer("/repository/owner/login")?.as_str()?,
        content.pointer("/repository/name")?.as_str()?,
    );

    let status = node
        .pointer("/fieldValueByName/name")
        .and_then(Value::as_str)
        .map(Status::from)
        .unwrap_or(Status::Unknown(String::new()));

    let state = match content.get("state").and_then(Value::as_str) {
        Some("CLOSED") => IssueState::Closed,
        _ => IssueState::Open,
    };
    let state_reason = match content.get("stateReason").and_then(Value::as_str) {
        Some("COMPLETED") => Some(StateReason::Completed),
        Some("NOT_PLANNED") => Some(StateReason::NotPlanned),
        Some("REOPENED") => Some(StateReason::Reopened),
        _ => None,
    };

    let labels: BTreeSet<String> = content
        .pointer("/labels/nodes")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|l| l.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    Some(BoardItem {
        item_handle,
        board_url: board_url.to_string(),
        repo,
        issue_number,
        status,
        title: content
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        labels,
        state,
        state_reason,
        // Populated lazily by the linked-change query when a stage needs it.
        has_merged_changes: false,
        comment_count: content
            .pointer("/comments/totalCount")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    })
}

pub(crate) async fn fetch_board_metadata(
    backend: &GithubBackend,
    board_url: &str,
) -> Result<BoardMetadata, BackendError> {
    let board = parse_board_url(board_url)?;
    let (query, root) = match board.owner_kind {
        BoardOwner::Organization => (queries::BOARD_METADATA_QUERY, "organization"),
        BoardOwner::User => (queries::USER_BOARD_METADATA_QUERY, "user"),
    };
    let variables = json!({ "owner": board.owner, "number": board.number });
    let data = backend.gh().graphql(&board.host, query, variables).await?;

    let project = data
        .pointer(&format!("/{root}/projectV2"))
        .ok_or_else(|| BackendError::Parse(format!("board {board_url} returned no project")))?;
    let project_id = project
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Parse("project missing id".into()))?
        .to_string();
    let field = project
        .get("field")
        .ok_or_else(|| BackendError::Parse("board has no Status field".into()))?;
    let status_field_handle = field
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| BackendError::Parse("Status field missing id".into()))?
        .to_string();

    let mut status_options = BTreeMap::new();
    for option in field.pointer("/options").and_then(Value::as_array).into_iter().flatten() {
        if let (Some(id), Some(name)) = (
            option.get("id").and_then(Value::as_str),
            option.get("name").and_then(Value::as_str),
        ) {
            status_options.insert(name.to_string(), id.to_string());
        }
    }

    Ok(BoardMetadata { project_id, status_field_handle, status_options })
}

pub(crate) async fn update_item_status(
    backend: &GithubBackend,
    board_url: &str,
    meta: &BoardMetadata,
    item_handle: &str,
    new_status: &Status,
) -> Result<(), BackendError> {
    let board = parse_board_url(board_url)?;
    let option_id = meta.status_options.get(new_status.as_str()).ok_or_else(|| {
        BackendError::Api(format!(
            "board {board_url} has no '{new_status}' column",
        ))
    })?;
    let variables = json!({
        "project": meta.project_id,
        "item": item_handle,
        "field": meta.status_field_handle,
        "option": option_id,
    });
    backend
        .gh()
        .graphql(&board.host, queries::UPDATE_ITEM_STATUS_MUTATION, variables)
        .await?;
    Ok(())
}

pub(crate) async fn archive_item(
    backend: &GithubBackend,
    board_url: &str,
    meta: &BoardMetadata,
    item_handle: &str,
) -> Result<(), BackendError> {
    let board = parse_board_url(board_url)?;
    let variables = json!({ "project": meta.project_id, "item": item_handle });
    backend
        .gh()
        .graphql(&board.host, queries::ARCHIVE_ITEM_MUTATION, variables)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "board_tests.rs"]
mod tests;
