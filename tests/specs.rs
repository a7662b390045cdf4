// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end scenarios: the engine driven through whole workflows against
//! fake backend, runner, and worktree adapters.

use kiln_adapters::test_support::{FakeBackend, FakeRunner};
use kiln_adapters::{ChangeRef, ConnectionStatus};
use kiln_core::test_support::{board_item, user_comment};
use kiln_core::{AllowList, BoardItem, EngineConfig, FakeClock, RepoId, RunOutcome, Stage, Status};
use kiln_engine::{Engine, FakeWorktrees, Supervisor};
use kiln_storage::Store;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BOARD: &str = "https://github.com/orgs/acme/projects/1";

struct World {
    engine: Engine<FakeBackend, FakeRunner, FakeWorktrees, FakeClock>,
    backend: FakeBackend,
    runner: FakeRunner,
    clock: FakeClock,
    shutdown: CancellationToken,
    _store_dir: tempfile::TempDir,
    _workspace_dir: tempfile::TempDir,
}

fn world() -> World {
    world_with(|_| {})
}

fn world_with(tweak: impl FnOnce(&mut EngineConfig)) -> World {
    let store_dir = tempfile::tempdir().unwrap();
    let workspace_dir = tempfile::tempdir().unwrap();

    let mut config = EngineConfig {
        boards: vec![BOARD.to_string()],
        allow_list: AllowList::new(["alice"]),
        workspace_dir: workspace_dir.path().to_path_buf(),
        ..Default::default()
    };
    tweak(&mut config);

    let backend = FakeBackend::new();
    let runner = FakeRunner::new();
    let clock = FakeClock::new();
    let shutdown = CancellationToken::new();
    let store = Store::open(store_dir.path()).unwrap();
    let worktrees = FakeWorktrees::new(workspace_dir.path().to_path_buf());

    let engine = Engine::new(
        backend.clone(),
        runner.clone(),
        worktrees,
        store,
        config,
        clock.clone(),
        None,
        None,
        None,
        shutdown.clone(),
    );
    World {
        engine,
        backend,
        runner,
        clock,
        shutdown,
        _store_dir: store_dir,
        _workspace_dir: workspace_dir,
    }
}

fn repo() -> RepoId {
    RepoId::new("github.com", "acme", "app")
}

fn item(number: u64, status: Status) -> BoardItem {
    board_item("github.com", "acme", "app", number, status)
}

async fn poll_and_settle(w: &World) -> kiln_engine::PollStats {
    let stats = w.engine.poll_once().await.unwrap();
    w.engine.wait_for_workers().await;
    stats
}

// Scenario 1: a human moves an issue into Research; the engine runs the
// stage, posts a marked comment, and advances the column.
#[tokio::test]
async fn happy_path_research_to_plan() {
    let w = world();
    w.backend.set_items(vec![item(42, Status::Research)]);
    w.backend.set_status_actor(&repo(), 42, "alice");
    w.backend.set_issue_body(&repo(), 42, "The widget is broken.");
    w.runner.push_success("Findings: X.", "sess-A");

    poll_and_settle(&w).await;

    let comments = w.backend.comments_for(&repo(), 42);
    assert_eq!(comments.len(), 1);
    assert!(comments[0].body.starts_with("<!-- kiln:research -->"));
    assert!(comments[0].body.contains("Findings: X."));

    assert_eq!(w.backend.status_updates().last().unwrap().1, Status::Plan);
    assert_eq!(
        w.engine.store().get_session_handle(&repo(), 42, Stage::Research).as_deref(),
        Some("sess-A")
    );
    let runs = w.engine.store().run_records_for(&repo(), 42);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].outcome, Some(RunOutcome::Success));
}

// Scenario 2: an allow-listed user comments on a planned item; the engine
// revises the plan post in place and replies with a diff.
#[tokio::test]
async fn revision_updates_plan_and_replies_with_diff() {
    let w = world();
    let created = "2024-06-01T09:00:00Z".parse().unwrap();
    w.backend.set_items(vec![item(42, Status::Plan)]);
    w.backend.set_status_actor(&repo(), 42, "alice");

    // The plan stage ran earlier and posted its artifact.
    let run = w
        .engine
        .store()
        .insert_run_record(&repo(), 42, Stage::Plan, created)
        .unwrap();
    w.engine
        .store()
        .finish_run_record(run, created, RunOutcome::Success, Some("sess-P".into()), Default::default())
        .unwrap();
    w.backend.push_comment(
        &repo(),
        42,
        user_comment(
            500,
            "kiln-bot",
            "<!-- kiln:plan -->\n\n# Plan\nsection 1: keep\nsection 2: X",
            created,
        ),
    );
    w.backend.push_comment(
        &repo(),
        42,
        user_comment(
            501,
            "alice",
            "replace section 2 with Y",
            "2024-06-01T10:00:00Z".parse().unwrap(),
        ),
    );
    w.runner.push_success("# Plan\nsection 1: keep\nsection 2: Y", "sess-P2");

    let stats = poll_and_settle(&w).await;
    assert_eq!(stats.revisions_dispatched, 1);
    assert_eq!(stats.stages_dispatched, 0);

    // Plan post rewritten in place.
    let updates = w.backend.comment_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].0, 500);
    assert!(updates[0].1.contains("section 2: Y"));

    // Reply carries the response marker and a `+` line with the new text.
    let comments = w.backend.comments_for(&repo(), 42);
    let reply = comments.last().unwrap();
    assert!(reply.body.starts_with("<!-- kiln:response -->"));
    assert!(reply.body.contains("+section 2: Y"));

    // THUMBS_UP on the user comment, EYES gone.
    let reactions = w.backend.reactions_on(501);
    assert!(reactions.contains("+1"));
    assert!(!reactions.contains("eyes"));

    let record = w.engine.store().get_issue_record(&repo(), 42).unwrap();
    assert_eq!(
        record.last_processed_comment_at,
        Some("2024-06-01T10:00:00Z".parse().unwrap())
    );
}

// Scenario 3: a status change by someone outside the allow-list triggers
// nothing at all.
#[tokio::test]
async fn unauthorized_status_change_is_ignored() {
    let w = world();
    w.backend.set_items(vec![item(42, Status::Research)]);
    w.backend.set_status_actor(&repo(), 42, "mallory");

    let stats = poll_and_settle(&w).await;

    assert_eq!(stats.stages_dispatched, 0);
    assert_eq!(w.runner.run_count(), 0);
    assert!(w.backend.status_updates().is_empty());
    assert!(w.backend.comments_for(&repo(), 42).is_empty());
    assert!(w.backend.reactions_on(0).is_empty());
}

// Scenario 4: connectivity loss suspends polling; recovery resumes it.
#[tokio::test]
async fn connectivity_loss_hibernates_and_recovers() {
    let w = world_with(|config| {
        config.poll_interval = Duration::from_millis(20);
        config.hibernation_interval = Duration::from_millis(40);
        config.shutdown_grace = Duration::from_secs(1);
    });
    w.backend.set_items(vec![]);

    let supervisor = Supervisor::new(w.engine.clone());
    let handle = tokio::spawn(async move { supervisor.run().await });

    // Healthy at first: polls happen.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let polls_before_outage = w.backend.poll_count();
    assert!(polls_before_outage >= 1);

    // Outage: polling stops.
    w.backend.set_connection_failure(
        "github.com",
        ConnectionStatus::NetworkFailure("tls handshake timeout".into()),
    );
    tokio::time::sleep(Duration::from_millis(150)).await;
    let polls_during_outage = w.backend.poll_count();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(w.backend.poll_count() <= polls_during_outage + 1);

    // Recovery: polling resumes.
    w.backend.clear_connection_failures();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(w.backend.poll_count() > polls_during_outage);

    w.shutdown.cancel();
    handle.await.unwrap();
}

// Scenario 5: pulling an implemented issue back to Backlog unlinks and
// closes its PR and clears session state.
#[tokio::test]
async fn reset_unlinks_pr_and_clears_sessions() {
    let w = world();
    w.backend.set_items(vec![item(42, Status::Implement)]);
    w.backend.set_status_actor(&repo(), 42, "alice");
    w.backend.set_linked_changes(
        &repo(),
        42,
        vec![ChangeRef {
            number: 99,
            url: "https://github.com/acme/app/pull/99".into(),
            body: "Widget fix.\n\nCloses #42".into(),
            state: "OPEN".into(),
            merged: false,
            branch_name: Some("kiln/issue-42".into()),
        }],
    );
    w.runner.push_success("implemented", "sess-I");
    poll_and_settle(&w).await;
    assert!(w
        .engine
        .store()
        .get_session_handle(&repo(), 42, Stage::Implement)
        .is_some());

    // Allow-listed human pulls the item back to Backlog.
    w.backend.set_items(vec![item(42, Status::Backlog)]);
    w.backend.set_status_actor(&repo(), 42, "alice");
    let stats = poll_and_settle(&w).await;
    assert_eq!(stats.resets_dispatched, 1);

    let body = w.backend.change_body(99).unwrap();
    assert!(body.contains("#42"));
    assert!(!body.to_lowercase().contains("closes #42"));
    assert_eq!(w.backend.closed_changes(), vec![99]);
    assert_eq!(w.backend.deleted_branches(), vec!["kiln/issue-42".to_string()]);
    assert!(w
        .engine
        .store()
        .get_session_handle(&repo(), 42, Stage::Implement)
        .is_none());
}

// Scenario 6: an agent that goes silent is killed; the run is recorded as
// an inactivity timeout and the item stays put.
#[tokio::test]
async fn stage_timeout_records_outcome_and_keeps_column() {
    let w = world();
    w.backend.set_items(vec![item(42, Status::Research)]);
    w.backend.set_status_actor(&repo(), 42, "alice");
    w.runner.push_timeout_inactivity();

    poll_and_settle(&w).await;

    let runs = w.engine.store().run_records_for(&repo(), 42);
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].outcome, Some(RunOutcome::TimeoutInactivity));
    assert!(w.backend.status_updates().is_empty());
    assert_eq!(
        w.engine.store().get_issue_record(&repo(), 42).unwrap().consecutive_failures,
        1
    );
}

// A full workflow driven column by column, with the engine's own moves
// never re-triggering work (status idempotence).
#[tokio::test]
async fn full_workflow_advances_through_all_stages() {
    let w = world();
    w.backend.set_items(vec![item(7, Status::Research)]);
    w.backend.set_issue_body(&repo(), 7, "Ship it.");

    for (expected_next, text, session) in [
        (Status::Plan, "findings", "sess-1"),
        (Status::Implement, "the plan", "sess-2"),
        (Status::Validate, "implemented", "sess-3"),
        (Status::Done, "validated", "sess-4"),
    ] {
        // A human authorizes each stage by touching the column.
        w.backend.set_status_actor(&repo(), 7, "alice");
        w.runner.push_success(text, session);
        let stats = poll_and_settle(&w).await;
        assert_eq!(stats.stages_dispatched, 1, "stage into {expected_next:?}");
        assert_eq!(w.backend.status_updates().last().unwrap().1, expected_next);

        // Without a human touch nothing new dispatches.
        let stats = poll_and_settle(&w).await;
        assert_eq!(stats.stages_dispatched, 0);
    }

    // Final column: the item was archived off the board.
    assert_eq!(w.backend.archived().len(), 1);
    let runs = w.engine.store().run_records_for(&repo(), 7);
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|r| r.outcome == Some(RunOutcome::Success)));
}

// Crash-safety: store state survives a reopen (same directory), including
// the run ledger and session handles.
#[tokio::test]
async fn store_state_survives_restart() {
    let store_dir = tempfile::tempdir().unwrap();
    {
        let store = Store::open(store_dir.path()).unwrap();
        let started = "2024-06-01T10:00:00Z".parse().unwrap();
        let run = store.insert_run_record(&repo(), 42, Stage::Research, started).unwrap();
        store
            .finish_run_record(run, started, RunOutcome::Success, Some("sess-A".into()), Default::default())
            .unwrap();
        store.set_session_handle(&repo(), 42, Stage::Research, "sess-A").unwrap();
        store.add_processing_comment(&repo(), 42, "IC_77").unwrap();
    }

    let store = Store::open(store_dir.path()).unwrap();
    assert_eq!(store.get_session_handle(&repo(), 42, Stage::Research).as_deref(), Some("sess-A"));
    assert_eq!(store.run_records_for(&repo(), 42).len(), 1);
    assert_eq!(store.list_processing_comments().len(), 1);
}

// Concurrency cap: more candidates than workers still all complete, one
// dispatch per issue.
#[tokio::test]
async fn pool_caps_concurrency_but_completes_all() {
    let w = world_with(|config| config.max_concurrent_workflows = 2);
    let items: Vec<BoardItem> = (1..=5).map(|n| item(n, Status::Research)).collect();
    for n in 1..=5 {
        w.backend.set_status_actor(&repo(), n, "alice");
        w.runner.push_success("ok", &format!("sess-{n}"));
    }
    w.backend.set_items(items);

    let stats = poll_and_settle(&w).await;
    assert_eq!(stats.stages_dispatched, 5);
    assert_eq!(w.runner.run_count(), 5);
    // Every issue advanced exactly once.
    assert_eq!(w.backend.status_updates().len(), 5);
}
