// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-issue serialization and claim-label tracking.
//!
//! The keyed mutex enforces invariant P1: at most one stage executor or
//! revision call in flight per `(repo, issue)`. The map itself sits behind
//! a tiny lock; entries are created on miss and never removed (the set of
//! issues a daemon touches is small).

use kiln_core::RepoId;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;

/// Keyed async mutex map for `(repo, issue)` pairs.
#[derive(Default)]
pub struct IssueLocks {
    map: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl IssueLocks {
    fn entry(&self, repo: &RepoId, issue_number: u64) -> Arc<tokio::sync::Mutex<()>> {
        let key = format!("{repo}#{issue_number}");
        Arc::clone(self.map.lock().entry(key).or_default())
    }

    /// Try to claim the issue; `None` when another worker holds it.
    ///
    /// The guard releases on drop, which is the scope-exit finalizer the
    /// locking discipline requires.
    pub fn try_acquire(&self, repo: &RepoId, issue_number: u64) -> Option<OwnedMutexGuard<()>> {
        self.entry(repo, issue_number).try_lock_owned().ok()
    }

    /// Whether the issue is currently claimed (tests and diagnostics).
    pub fn is_held(&self, repo: &RepoId, issue_number: u64) -> bool {
        self.entry(repo, issue_number).try_lock().is_err()
    }
}

/// Tracks which issues the engine is holding its claim label on.
///
/// The label itself lives on the backend; this map only remembers what to
/// release so the executor's finalizer can always clean up.
#[derive(Default)]
pub struct ClaimLabels {
    held: Mutex<HashSet<String>>,
}

impl ClaimLabels {
    pub fn mark_held(&self, repo: &RepoId, issue_number: u64) {
        self.held.lock().insert(format!("{repo}#{issue_number}"));
    }

    pub fn mark_released(&self, repo: &RepoId, issue_number: u64) {
        self.held.lock().remove(&format!("{repo}#{issue_number}"));
    }

    pub fn is_held(&self, repo: &RepoId, issue_number: u64) -> bool {
        self.held.lock().contains(&format!("{repo}#{issue_number}"))
    }
}

#[cfg(test)]
#[path = "locks_tests.rs"]
mod tests;
