// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    plus_offset = { "2024-06-01T10:00:00+00:00", "2024-06-01T10:00:00Z" },
    already_z = { "2024-06-01T10:00:00Z", "2024-06-01T10:00:00Z" },
    other_offset = { "2024-06-01T12:00:00+02:00", "2024-06-01T12:00:00+02:00" },
)]
fn normalize_since_rewrites_utc_offset(input: &str, expected: &str) {
    assert_eq!(normalize_since(input), expected);
}

#[test]
fn parse_comment_node_maps_reaction_groups() {
    let node = json!({
        "id": "IC_abc",
        "databaseId": 991,
        "body": "please revise",
        "createdAt": "2024-06-01T10:00:00Z",
        "author": { "login": "alice" },
        "reactionGroups": [
            { "content": "THUMBS_UP", "viewerHasReacted": false },
            { "content": "EYES", "viewerHasReacted": true }
        ]
    });
    let comment = parse_comment_node(&node).unwrap();
    assert_eq!(comment.handle, "IC_abc");
    assert_eq!(comment.db_id, 991);
    assert_eq!(comment.author.as_deref(), Some("alice"));
    assert!(!comment.processed);
    assert!(comment.in_flight);
}

#[test]
fn parse_comment_node_deleted_author_is_none() {
    let node = json!({
        "id": "IC_abc",
        "databaseId": 991,
        "body": "orphaned",
        "createdAt": "2024-06-01T10:00:00Z",
        "author": null,
        "reactionGroups": []
    });
    let comment = parse_comment_node(&node).unwrap();
    assert!(comment.author.is_none());
}

#[test]
fn parse_comment_node_requires_ids() {
    assert!(parse_comment_node(&json!({ "body": "x" })).is_none());
}

#[test]
fn parse_rest_comment_maps_fields() {
    let value = json!({
        "id": 991,
        "node_id": "IC_abc",
        "body": "hello",
        "created_at": "2024-06-01T10:00:00Z",
        "user": { "login": "alice" }
    });
    let comment = parse_rest_comment(&value).unwrap();
    assert_eq!(comment.db_id, 991);
    assert_eq!(comment.handle, "IC_abc");
    assert_eq!(comment.author.as_deref(), Some("alice"));
    assert!(!comment.processed && !comment.in_flight);
}

#[test]
fn parse_rest_comment_null_user() {
    let value = json!({
        "id": 991,
        "node_id": "IC_abc",
        "body": "hello",
        "created_at": "2024-06-01T10:00:00Z",
        "user": null
    });
    assert!(parse_rest_comment(&value).unwrap().author.is_none());
}
