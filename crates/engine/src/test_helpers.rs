// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::worktree::FakeWorktrees;
use crate::Engine;
use kiln_adapters::test_support::{FakeBackend, FakeRunner};
use kiln_core::test_support::board_item;
use kiln_core::{AllowList, BoardItem, EngineConfig, FakeClock, Status};
use kiln_storage::Store;
use tokio_util::sync::CancellationToken;

pub(crate) const BOARD: &str = "https://github.com/orgs/acme/projects/1";

pub(crate) struct Harness {
    pub engine: Engine<FakeBackend, FakeRunner, FakeWorktrees, FakeClock>,
    pub backend: FakeBackend,
    pub runner: FakeRunner,
    pub clock: FakeClock,
    pub shutdown: CancellationToken,
    _store_dir: tempfile::TempDir,
    _workspace_dir: tempfile::TempDir,
}

pub(crate) fn harness() -> Harness {
    harness_with(|_| {})
}

pub(crate) fn harness_with(tweak: impl FnOnce(&mut EngineConfig)) -> Harness {
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
    Harness {
        engine,
        backend,
        runner,
        clock,
        shutdown,
        _store_dir: store_dir,
        _workspace_dir: workspace_dir,
    }
}

/// A board item on the harness board.
pub(crate) fn item_at(number: u64, status: Status) -> BoardItem {
    board_item("github.com", "acme", "app", number, status)
}
