// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{harness, harness_with, item_at};
use kiln_core::{RepoId, RunOutcome, Status};

fn repo() -> RepoId {
    RepoId::new("github.com", "acme", "app")
}

#[tokio::test]
async fn claim_label_is_released_on_success_and_failure() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.runner.push_success("ok", "sess-A");
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();
    assert!(!h.backend.labels_for(&repo(), 42).contains("kiln-working"));
    assert!(!h.engine.claims().is_held(&repo(), 42));

    h.runner.push_failure("boom");
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();
    assert!(!h.backend.labels_for(&repo(), 42).contains("kiln-working"));
    assert!(!h.engine.claims().is_held(&repo(), 42));
}

#[tokio::test]
async fn changed_actor_aborts_without_mutation() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    // Dispatch observed alice, but the board now reports bob.
    h.backend.set_status_actor(&repo(), 42, "bob");
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, Some("alice".into()))
        .await
        .unwrap();

    assert_eq!(h.runner.run_count(), 0);
    assert!(h.backend.status_updates().is_empty());
    assert!(h.backend.comments_for(&repo(), 42).is_empty());
    assert!(h.engine.store().run_records_for(&repo(), 42).is_empty());
}

#[tokio::test]
async fn failure_keeps_column_labels_and_counter_updated() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.runner.push_failure("agent exploded");

    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    // Column unchanged, error label attached, neutral marked comment.
    assert!(h.backend.status_updates().is_empty());
    assert!(h.backend.labels_for(&repo(), 42).contains("kiln-needs-human"));
    let comments = h.backend.comments_for(&repo(), 42);
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.starts_with(Stage::Research.output_marker()));
    assert!(comments[0].body.contains("need a human"));
    assert!(comments[0].body.contains("agent exploded"));

    let record = h.engine.store().get_issue_record(&repo(), 42).unwrap();
    assert_eq!(record.consecutive_failures, 1);
    let runs = h.engine.store().run_records_for(&repo(), 42);
    assert_eq!(runs[0].outcome, Some(RunOutcome::AgentFailure));
}

#[tokio::test]
async fn inactivity_timeout_records_distinct_outcome() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.runner.push_timeout_inactivity();

    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    let runs = h.engine.store().run_records_for(&repo(), 42);
    assert_eq!(runs[0].outcome, Some(RunOutcome::TimeoutInactivity));
    assert!(h.backend.status_updates().is_empty());
    assert_eq!(
        h.engine.store().get_issue_record(&repo(), 42).unwrap().consecutive_failures,
        1
    );
}

#[tokio::test]
async fn third_consecutive_failure_hides_the_issue() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    for _ in 0..3 {
        h.runner.push_failure("boom");
        h.engine
            .execute_stage(item_at(42, Status::Research), Stage::Research, None)
            .await
            .unwrap();
    }
    let hidden = h.engine.store().get_hidden_until(&repo(), 42).unwrap();
    assert!(hidden > h.clock.now_utc());
}

#[tokio::test]
async fn success_after_failures_clears_the_counter() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.runner.push_failure("boom");
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    h.runner.push_success("ok", "sess-A");
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    let record = h.engine.store().get_issue_record(&repo(), 42).unwrap();
    assert_eq!(record.consecutive_failures, 0);
    assert_eq!(record.last_observed_status, Status::Plan);
}

#[tokio::test]
async fn validate_success_archives_the_item() {
    let h = harness();
    let item = item_at(42, Status::Validate);
    h.backend.set_items(vec![item.clone()]);
    h.runner.push_success("validation report", "sess-V");

    h.engine.execute_stage(item.clone(), Stage::Validate, None).await.unwrap();

    assert_eq!(
        h.backend.status_updates(),
        vec![(item.item_handle.clone(), Status::Done)]
    );
    assert_eq!(h.backend.archived(), vec![item.item_handle]);
}

#[tokio::test]
async fn stale_session_is_cleared_before_run() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.engine.store().set_session_handle(&repo(), 42, Stage::Research, "sess-old").unwrap();
    h.runner.set_valid_session("sess-old", false);
    h.runner.push_success("ok", "sess-new");

    // First ensure creates the worktree fresh, which triggers validation.
    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    let requests = h.runner.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].resume_session.is_none());
    assert_eq!(
        h.engine.store().get_session_handle(&repo(), 42, Stage::Research).as_deref(),
        Some("sess-new")
    );
}

#[tokio::test]
async fn valid_session_is_resumed() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.engine.store().set_session_handle(&repo(), 42, Stage::Research, "sess-old").unwrap();
    h.runner.set_valid_session("sess-old", true);
    h.runner.push_success("ok", "sess-old");

    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    let requests = h.runner.requests();
    assert_eq!(requests[0].resume_session.as_deref(), Some("sess-old"));
}

#[tokio::test]
async fn prompt_carries_issue_body_and_worktree() {
    let h = harness();
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.backend.set_issue_body(&repo(), 42, "The widget is broken.");
    h.runner.push_success("ok", "sess-A");

    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    let requests = h.runner.requests();
    assert!(requests[0].prompt.contains("The widget is broken."));
    assert!(requests[0].prompt.contains("app-issue-42"));
}

#[tokio::test]
async fn configured_model_is_passed_through() {
    let h = harness_with(|config| config.model = Some("opus".into()));
    h.backend.set_items(vec![item_at(42, Status::Research)]);
    h.runner.push_success("ok", "sess-A");

    h.engine
        .execute_stage(item_at(42, Status::Research), Stage::Research, None)
        .await
        .unwrap();

    assert_eq!(h.runner.requests()[0].model.as_deref(), Some("opus"));
}
