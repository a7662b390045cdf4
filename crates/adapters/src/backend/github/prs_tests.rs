// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    closes = { "Closes #42" },
    fixes_colon = { "Fixes: #42" },
    resolves = { "resolves #42" },
    closed = { "closed #42" },
    fixed = { "Fixed #42" },
)]
fn closing_keywords_match(body: &str) {
    assert!(body_closes_issue(body, 42));
}

#[parameterized(
    other_issue = { "Closes #43" },
    bare_reference = { "See #42" },
    prefix_number = { "Closes #421" },
    no_keyword = { "#42" },
)]
fn non_closing_bodies_do_not_match(body: &str) {
    assert!(!body_closes_issue(body, 42));
}

#[test]
fn remove_closing_keywords_keeps_breadcrumb() {
    assert_eq!(remove_closing_keywords("This PR closes #42.", 42), "This PR #42.");
    assert_eq!(
        remove_closing_keywords("Fixes: #42 and improves logging", 42),
        "#42 and improves logging"
    );
}

#[test]
fn remove_closing_keywords_leaves_other_issues_alone() {
    let body = "Closes #42, fixes #43";
    assert_eq!(remove_closing_keywords(body, 42), "#42, fixes #43");
}

#[test]
fn remove_is_idempotent() {
    let once = remove_closing_keywords("Resolves #42", 42);
    assert_eq!(remove_closing_keywords(&once, 42), once);
}

#[test]
fn parse_pr_node_maps_fields() {
    let node = serde_json::json!({
        "number": 99,
        "url": "https://github.com/acme/app/pull/99",
        "body": "Closes #42",
        "state": "OPEN",
        "merged": false,
        "headRefName": "kiln/issue-42"
    });
    let change = parse_pr_node(&node).unwrap();
    assert_eq!(change.number, 99);
    assert_eq!(change.branch_name.as_deref(), Some("kiln/issue-42"));
    assert!(!change.merged);
}
