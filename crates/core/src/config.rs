// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine-facing configuration.
//!
//! The daemon's TOML loader produces this; the engine only ever sees the
//! resolved form.

use crate::allowlist::AllowList;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved configuration for the polling and workflow engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Project board URLs to poll.
    pub boards: Vec<String>,
    /// Actors permitted to trigger work.
    pub allow_list: AllowList,
    /// The engine's own backend login, for filtering self-authored comments.
    pub bot_login: String,
    /// Worker pool size for concurrent stage executions.
    pub max_concurrent_workflows: usize,
    pub poll_interval: Duration,
    /// Coarser cadence while connectivity is down.
    pub hibernation_interval: Duration,
    /// How long an issue is hidden after repeated failures.
    pub failure_cooldown: Duration,
    /// Consecutive failures before the cooldown kicks in.
    pub max_consecutive_failures: u32,
    /// How long shutdown waits for in-flight workers.
    pub shutdown_grace: Duration,
    /// Model name passed through to the agent runner, if overridden.
    pub model: Option<String>,
    /// Label held while a stage executor works on an issue.
    pub claim_label: String,
    /// Label attached on terminal stage failure.
    pub error_label: String,
    /// Optional label that re-authorizes an item via its adder.
    pub proceed_label: Option<String>,
    /// Send a chat DM for every processed revision comment.
    pub notify_on_comment: bool,
    /// Directory worktrees are materialized under.
    pub workspace_dir: PathBuf,
    /// Wrap width for revision reply diffs.
    pub diff_width: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            boards: Vec::new(),
            allow_list: AllowList::default(),
            bot_login: "kiln-bot".into(),
            max_concurrent_workflows: 2,
            poll_interval: Duration::from_secs(60),
            hibernation_interval: Duration::from_secs(300),
            failure_cooldown: Duration::from_secs(3600),
            max_consecutive_failures: 3,
            shutdown_grace: Duration::from_secs(120),
            model: None,
            claim_label: "kiln-working".into(),
            error_label: "kiln-needs-human".into(),
            proceed_label: Some("kiln-proceed".into()),
            notify_on_comment: false,
            workspace_dir: PathBuf::from("workspaces"),
            diff_width: 100,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
