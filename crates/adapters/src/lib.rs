// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-adapters: everything that talks to the outside world.
//!
//! The engine sees traits ([`TicketBackend`], [`AgentRunner`]) and plain
//! modules (paging, chat, telemetry). Concrete implementations shell out to
//! the `gh` and `claude` CLIs or speak HTTP via reqwest.

pub mod backend;
pub mod chat;
pub mod credentials;
pub mod oauth;
pub mod pager;
pub mod plugins;
pub mod runner;
pub mod subprocess;
pub mod telemetry;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use backend::{
    BackendError, BackendVersion, BoardMetadata, ChangeRef, ConnectionStatus, GithubBackend,
    TicketBackend,
};
pub use credentials::{CredentialEntry, RepoCredentials};
pub use oauth::{OAuthClient, OAuthConfig, OAuthError};
pub use plugins::{PluginConfigManager, PluginProbeResult, WORKTREE_PLUGIN_CONFIG_NAME};
pub use runner::{AgentRunner, ClaudeRunner, RunRequest, RunnerError, RunnerOutput};
pub use subprocess::{run_with_timeout, SubprocessError};
