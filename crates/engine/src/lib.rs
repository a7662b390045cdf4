// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-engine: the polling and workflow orchestration engine.
//!
//! The [`Engine`] owns the store, the backend, the runner, and the
//! per-issue locks; [`supervisor::Supervisor`] drives it in a loop with
//! connectivity-aware hibernation. One `Engine` instance is shared by every
//! worker task via cheap clones.

pub mod diff_fmt;
pub mod dispatch;
pub mod executor;
pub mod locks;
pub mod reset;
pub mod revision;
pub mod supervisor;
pub mod worktree;

#[cfg(test)]
mod test_helpers;

pub use dispatch::PollStats;
pub use supervisor::Supervisor;
#[cfg(any(test, feature = "test-support"))]
pub use worktree::FakeWorktrees;
pub use worktree::{GitWorktrees, Worktree, WorktreeManager};

use kiln_adapters::{
    AgentRunner, BackendError, OAuthClient, PluginConfigManager, RepoCredentials, RunnerError,
    TicketBackend,
};
use kiln_core::{Clock, EngineConfig};
use kiln_storage::{Store, StoreError};
use locks::{ClaimLabels, IssueLocks};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Errors crossing engine component boundaries.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Runner(#[from] RunnerError),
    #[error("worktree provisioning failed: {0}")]
    Worktree(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Network failures bubble to the supervisor's health check.
    pub fn is_network(&self) -> bool {
        matches!(self, EngineError::Backend(e) if e.is_network())
    }
}

struct EngineInner<B, R, W, C> {
    backend: B,
    runner: R,
    store: Store,
    config: EngineConfig,
    clock: C,
    locks: IssueLocks,
    claims: ClaimLabels,
    worktrees: W,
    plugins: Option<PluginConfigManager>,
    credentials: Option<RepoCredentials>,
    oauth: Option<Arc<OAuthClient>>,
    pool: Semaphore,
    workers: TaskTracker,
    shutdown: CancellationToken,
}

/// The orchestration engine. Clones share one inner state.
pub struct Engine<B, R, W, C> {
    inner: Arc<EngineInner<B, R, W, C>>,
}

impl<B, R, W, C> Clone for Engine<B, R, W, C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<B, R, W, C> Engine<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: WorktreeManager + 'static,
    C: Clock,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        backend: B,
        runner: R,
        worktrees: W,
        store: Store,
        config: EngineConfig,
        clock: C,
        plugins: Option<PluginConfigManager>,
        credentials: Option<RepoCredentials>,
        oauth: Option<Arc<OAuthClient>>,
        shutdown: CancellationToken,
    ) -> Self {
        let pool = Semaphore::new(config.max_concurrent_workflows.max(1));
        Self {
            inner: Arc::new(EngineInner {
                backend,
                runner,
                store,
                config,
                clock,
                locks: IssueLocks::default(),
                claims: ClaimLabels::default(),
                worktrees,
                plugins,
                credentials,
                oauth,
                pool,
                workers: TaskTracker::new(),
                shutdown,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn runner(&self) -> &R {
        &self.inner.runner
    }

    pub fn clock(&self) -> &C {
        &self.inner.clock
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    pub(crate) fn locks(&self) -> &IssueLocks {
        &self.inner.locks
    }

    pub(crate) fn claims(&self) -> &ClaimLabels {
        &self.inner.claims
    }

    pub(crate) fn worktrees(&self) -> &W {
        &self.inner.worktrees
    }

    pub(crate) fn plugins(&self) -> Option<&PluginConfigManager> {
        self.inner.plugins.as_ref()
    }

    pub(crate) fn credentials(&self) -> Option<&RepoCredentials> {
        self.inner.credentials.as_ref()
    }

    pub(crate) fn oauth(&self) -> Option<&Arc<OAuthClient>> {
        self.inner.oauth.as_ref()
    }

    pub(crate) fn pool(&self) -> &Semaphore {
        &self.inner.pool
    }

    pub(crate) fn workers(&self) -> &TaskTracker {
        &self.inner.workers
    }

    /// Stop accepting work and wait for in-flight workers, up to the
    /// configured grace period.
    pub async fn drain(&self) {
        self.inner.workers.close();
        let grace = self.inner.config.shutdown_grace;
        if tokio::time::timeout(grace, self.inner.workers.wait()).await.is_err() {
            tracing::warn!(grace_secs = grace.as_secs(), "workers did not drain in time");
        }
    }

    /// Wait for every spawned worker to finish, then accept work again.
    pub async fn wait_for_workers(&self) {
        self.inner.workers.close();
        self.inner.workers.wait().await;
        self.inner.workers.reopen();
    }
}
