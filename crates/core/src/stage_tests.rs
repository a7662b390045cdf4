// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    research = { Stage::Research, Status::Plan },
    plan = { Stage::Plan, Status::Implement },
    implement = { Stage::Implement, Status::Validate },
    validate = { Stage::Validate, Status::Done },
)]
fn next_column_advances_in_order(stage: Stage, expected: Status) {
    assert_eq!(stage.next_column(), expected);
}

#[test]
fn for_status_covers_workflow_columns_only() {
    for stage in Stage::ALL {
        assert_eq!(Stage::for_status(&stage.column()), Some(stage));
    }
    assert_eq!(Stage::for_status(&Status::Backlog), None);
    assert_eq!(Stage::for_status(&Status::Done), None);
    assert_eq!(Stage::for_status(&Status::Unknown("Triage".into())), None);
}

#[test]
fn markers_are_distinct_html_comments() {
    let mut seen = std::collections::BTreeSet::new();
    for stage in Stage::ALL {
        let marker = stage.output_marker();
        assert!(marker.starts_with("<!--") && marker.ends_with("-->"));
        assert!(seen.insert(marker));
    }
}

#[test]
fn serializes_as_plain_string() {
    let json = serde_json::to_string(&Stage::Research).unwrap();
    assert_eq!(json, "\"Research\"");
}
