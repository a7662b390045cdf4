// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn contains_is_case_insensitive() {
    let list = AllowList::new(["Alice", "bob"]);
    assert!(list.contains("alice"));
    assert!(list.contains("ALICE"));
    assert!(list.contains("Bob"));
    assert!(!list.contains("mallory"));
}

#[test]
fn empty_list_matches_nobody() {
    let list = AllowList::default();
    assert!(list.is_empty());
    assert!(!list.contains("alice"));
}

#[test]
fn deserializes_from_plain_array() {
    let list: AllowList = serde_json::from_str(r#"["Alice","bob"]"#).unwrap();
    assert_eq!(list.len(), 2);
    assert!(list.contains("alice"));
}
