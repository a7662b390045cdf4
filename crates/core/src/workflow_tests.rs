// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::board_item;

fn ctx(stage: Stage) -> StageContext {
    StageContext {
        item: board_item("github.com", "acme", "app", 42, crate::Status::Research),
        stage,
        worktree_path: PathBuf::from("/work/app-issue-42"),
        issue_body: "The widget is broken.".into(),
        linked_pr_url: None,
        resume_session: None,
    }
}

#[test]
fn is_kiln_post_matches_marker_first() {
    assert!(is_kiln_post("<!-- kiln:research -->\n# Findings"));
    assert!(is_kiln_post("  \n<!-- kiln:plan -->\nplan body"));
    assert!(!is_kiln_post("A user comment mentioning <!-- kiln:research -->"));
    assert!(!is_kiln_post("plain comment"));
}

#[test]
fn is_kiln_response_matches_marker() {
    assert!(is_kiln_response("<!-- kiln:response -->\n```diff\n+x\n```"));
    assert!(!is_kiln_response("<!-- kiln:plan -->\nplan"));
}

#[test]
fn post_content_strips_marker_and_whitespace() {
    let body = "<!-- kiln:plan -->\n\n# Plan\nstep 1";
    assert_eq!(
        post_content(body, Stage::Plan.output_marker()),
        Some("# Plan\nstep 1")
    );
    assert_eq!(post_content("other", Stage::Plan.output_marker()), None);
}

#[test]
fn prompts_are_deterministic() {
    let a = prompts(&ctx(Stage::Research));
    let b = prompts(&ctx(Stage::Research));
    assert_eq!(a, b);
    assert_eq!(a.len(), 1);
    assert!(a[0].contains("github.com/acme/app"));
    assert!(a[0].contains("#42"));
    assert!(a[0].contains("/work/app-issue-42"));
}

#[test]
fn implement_prompt_requests_closing_keyword() {
    let p = prompts(&ctx(Stage::Implement));
    assert!(p[0].contains("Closes #42"));
    assert!(p[0].contains("kiln/issue-42"));
}

#[test]
fn validate_prompt_includes_linked_pr() {
    let mut c = ctx(Stage::Validate);
    c.linked_pr_url = Some("https://github.com/acme/app/pull/99".into());
    let p = prompts(&c);
    assert!(p[0].contains("pull/99"));
}

#[test]
fn revision_prompt_is_deterministic() {
    let a = revision_prompt(Stage::Plan, "# Plan\nstep 1", "replace section 2 with Y");
    let b = revision_prompt(Stage::Plan, "# Plan\nstep 1", "replace section 2 with Y");
    assert_eq!(a, b);
    assert!(a.contains("replace section 2 with Y"));
    assert!(a.contains("# Plan"));
}
