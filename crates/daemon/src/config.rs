// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator configuration (`kiln.toml`).
//!
//! The raw TOML shape carries plain scalars; `resolve` turns it into the
//! engine's config plus the adapter knobs, applying defaults and
//! validation.

use kiln_adapters::{BackendVersion, OAuthConfig};
use kiln_core::{AllowList, EngineConfig};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {0}: {1}")]
    Io(PathBuf, std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    boards: Vec<String>,
    allow_list: Vec<String>,
    #[serde(default = "default_bot_login")]
    bot_login: String,
    #[serde(default = "default_max_concurrent")]
    max_concurrent_workflows: usize,
    #[serde(default = "default_poll_interval")]
    poll_interval_secs: u64,
    #[serde(default = "default_hibernation_interval")]
    hibernation_interval_secs: u64,
    #[serde(default = "default_failure_cooldown")]
    failure_cooldown_secs: u64,
    #[serde(default = "default_max_failures")]
    max_consecutive_failures: u32,
    #[serde(default = "default_shutdown_grace")]
    shutdown_grace_secs: u64,
    #[serde(default)]
    model: Option<String>,
    #[serde(default = "default_claim_label")]
    claim_label: String,
    #[serde(default = "default_error_label")]
    error_label: String,
    #[serde(default = "default_proceed_label")]
    proceed_label: Option<String>,
    #[serde(default)]
    notify_on_comment: bool,
    #[serde(default = "default_agent_total_timeout")]
    agent_total_timeout_secs: u64,
    #[serde(default = "default_agent_inactivity_timeout")]
    agent_inactivity_timeout_secs: u64,
    #[serde(default)]
    telemetry: bool,
    #[serde(default)]
    ghes_version: Option<String>,
    #[serde(default)]
    plugin_fail_on_error: bool,
    #[serde(default)]
    tokens: HashMap<String, String>,
    #[serde(default)]
    pagerduty: Option<PagerdutySection>,
    #[serde(default)]
    slack: Option<SlackSection>,
    #[serde(default)]
    azure_oauth: Option<OAuthConfig>,
}

#[derive(Debug, Deserialize)]
struct PagerdutySection {
    routing_key: String,
}

#[derive(Debug, Deserialize)]
struct SlackSection {
    webhook_url: String,
}

fn default_bot_login() -> String {
    "kiln-bot".into()
}
fn default_max_concurrent() -> usize {
    2
}
fn default_poll_interval() -> u64 {
    60
}
fn default_hibernation_interval() -> u64 {
    300
}
fn default_failure_cooldown() -> u64 {
    3600
}
fn default_max_failures() -> u32 {
    3
}
fn default_shutdown_grace() -> u64 {
    120
}
fn default_claim_label() -> String {
    "kiln-working".into()
}
fn default_error_label() -> String {
    "kiln-needs-human".into()
}
fn default_proceed_label() -> Option<String> {
    Some("kiln-proceed".into())
}
fn default_agent_total_timeout() -> u64 {
    3600
}
fn default_agent_inactivity_timeout() -> u64 {
    300
}

/// Fully resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub engine: EngineConfig,
    pub tokens: HashMap<String, String>,
    pub backend_version: BackendVersion,
    pub agent_total_timeout: Duration,
    pub agent_inactivity_timeout: Duration,
    pub telemetry: bool,
    pub plugin_fail_on_error: bool,
    pub pagerduty_routing_key: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub azure_oauth: Option<OAuthConfig>,
}

impl DaemonConfig {
    /// Load and resolve the config file.
    pub fn load(path: &Path, workspaces_dir: PathBuf) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml(&content, workspaces_dir)
    }

    pub fn from_toml(content: &str, workspaces_dir: PathBuf) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content)?;

        if raw.boards.is_empty() {
            return Err(ConfigError::Invalid("at least one board URL is required".into()));
        }
        if raw.allow_list.is_empty() {
            return Err(ConfigError::Invalid("allow_list must not be empty".into()));
        }
        if raw.max_concurrent_workflows == 0 {
            return Err(ConfigError::Invalid("max_concurrent_workflows must be >= 1".into()));
        }
        for board in &raw.boards {
            if !board.starts_with("https://") && !board.starts_with("http://") {
                return Err(ConfigError::Invalid(format!("board URL must be absolute: {board}")));
            }
        }

        let backend_version = match raw.ghes_version.as_deref() {
            None => BackendVersion::Dotcom,
            Some(v) => BackendVersion::parse(v).ok_or_else(|| {
                ConfigError::Invalid(format!("unsupported ghes_version '{v}'"))
            })?,
        };

        let engine = EngineConfig {
            boards: raw.boards,
            allow_list: AllowList::new(raw.allow_list),
            bot_login: raw.bot_login,
            max_concurrent_workflows: raw.max_concurrent_workflows,
            poll_interval: Duration::from_secs(raw.poll_interval_secs),
            hibernation_interval: Duration::from_secs(raw.hibernation_interval_secs),
            failure_cooldown: Duration::from_secs(raw.failure_cooldown_secs),
            max_consecutive_failures: raw.max_consecutive_failures,
            shutdown_grace: Duration::from_secs(raw.shutdown_grace_secs),
            model: raw.model,
            claim_label: raw.claim_label,
            error_label: raw.error_label,
            proceed_label: raw.proceed_label.filter(|l| !l.is_empty()),
            notify_on_comment: raw.notify_on_comment,
            workspace_dir: workspaces_dir,
            diff_width: 100,
        };

        Ok(Self {
            engine,
            tokens: raw.tokens,
            backend_version,
            agent_total_timeout: Duration::from_secs(raw.agent_total_timeout_secs),
            agent_inactivity_timeout: Duration::from_secs(raw.agent_inactivity_timeout_secs),
            telemetry: raw.telemetry,
            plugin_fail_on_error: raw.plugin_fail_on_error,
            pagerduty_routing_key: raw.pagerduty.map(|p| p.routing_key),
            slack_webhook_url: raw.slack.map(|s| s.webhook_url),
            azure_oauth: raw.azure_oauth,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
