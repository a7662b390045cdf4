// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-plugin (MCP) configuration.
//!
//! The operator declares named servers in a JSON file in the state
//! directory; each is either a remote endpoint (`url` + optional `headers`)
//! or a local subprocess (`command` + `args`). Before each stage a resolved
//! copy is written into the worktree with `${AZURE_BEARER_TOKEN}`
//! placeholders substituted from the OAuth minter.

use crate::oauth::OAuthClient;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// File name written into each worktree.
pub const WORKTREE_PLUGIN_CONFIG_NAME: &str = ".mcp.kiln.json";

const TOKEN_PLACEHOLDER: &str = "${AZURE_BEARER_TOKEN}";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to read plugin config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid plugin config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Outcome of one plugin health probe.
#[derive(Debug, Clone)]
pub struct PluginProbeResult {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

/// Loads, resolves, and writes the plugin config.
pub struct PluginConfigManager {
    path: PathBuf,
    oauth: Option<Arc<OAuthClient>>,
    cache: Mutex<Option<Value>>,
}

impl PluginConfigManager {
    pub fn new(path: PathBuf, oauth: Option<Arc<OAuthClient>>) -> Self {
        Self { path, oauth, cache: Mutex::new(None) }
    }

    pub fn has_config(&self) -> bool {
        self.path.exists()
    }

    /// Raw config, cached after the first read. `Ok(None)` when absent.
    pub fn load(&self) -> Result<Option<Value>, PluginError> {
        if let Some(cached) = self.cache.lock().clone() {
            return Ok(Some(cached));
        }
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        let value: Value = serde_json::from_str(&content)?;
        *self.cache.lock() = Some(value.clone());
        Ok(Some(value))
    }

    /// Drop the cache; the next load re-reads from disk.
    pub fn clear_cache(&self) {
        *self.cache.lock() = None;
    }

    /// Whether a server entry uses remote transport.
    pub fn is_remote_server(server: &Value) -> bool {
        server.get("url").is_some()
    }

    /// Structural problems in the config, as human-readable strings.
    pub fn validate(&self) -> Result<Vec<String>, PluginError> {
        let Some(config) = self.load()? else {
            return Ok(Vec::new());
        };
        let mut problems = Vec::new();
        let Some(servers) = config.get("mcpServers").and_then(Value::as_object) else {
            problems.push("config has no mcpServers object".to_string());
            return Ok(problems);
        };
        for (name, server) in servers {
            let has_url = server.get("url").and_then(Value::as_str).is_some();
            let has_command = server.get("command").and_then(Value::as_str).is_some();
            if !has_url && !has_command {
                problems.push(format!("server '{name}' has neither url nor command"));
            }
            if has_url && has_command {
                problems.push(format!("server '{name}' has both url and command"));
            }
        }
        Ok(problems)
    }

    /// Write the resolved config into a worktree.
    ///
    /// Returns the written path, or `None` when no config is declared. When
    /// token minting fails the config is written unsubstituted; the plugin
    /// rejects the auth and the failure surfaces in its own logs.
    pub async fn write_to_worktree(
        &self,
        worktree: &Path,
    ) -> Result<Option<PathBuf>, PluginError> {
        let Some(config) = self.load()? else {
            return Ok(None);
        };
        let resolved = match &self.oauth {
            Some(oauth) => match oauth.get_token().await {
                Ok(token) => substitute_tokens(&config, &token),
                Err(e) => {
                    tracing::warn!(error = %e, "token minting failed; writing unresolved plugin config");
                    config
                }
            },
            None => config,
        };

        let output = worktree.join(WORKTREE_PLUGIN_CONFIG_NAME);
        std::fs::write(&output, serde_json::to_vec_pretty(&resolved)?)?;
        tracing::debug!(path = %output.display(), "wrote plugin config");
        Ok(Some(output))
    }

    /// Probe every declared plugin: HTTP reachability for remote servers,
    /// binary presence for local ones.
    pub async fn probe_all(&self) -> Result<Vec<PluginProbeResult>, PluginError> {
        let Some(config) = self.load()? else {
            return Ok(Vec::new());
        };
        let Some(servers) = config.get("mcpServers").and_then(Value::as_object) else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for (name, server) in servers {
            let result = if Self::is_remote_server(server) {
                probe_remote(name, server).await
            } else {
                probe_local(name, server)
            };
            results.push(result);
        }
        Ok(results)
    }
}

/// Replace `${AZURE_BEARER_TOKEN}` recursively through the config tree.
fn substitute_tokens(value: &Value, token: &str) -> Value {
    match value {
        Value::String(s) => Value::String(s.replace(TOKEN_PLACEHOLDER, token)),
        Value::Object(map) => Value::Object(
            map.iter().map(|(k, v)| (k.clone(), substitute_tokens(v, token))).collect(),
        ),
        Value::Array(items) => {
            Value::Array(items.iter().map(|v| substitute_tokens(v, token)).collect())
        }
        other => other.clone(),
    }
}

async fn probe_remote(name: &str, server: &Value) -> PluginProbeResult {
    let Some(url) = server.get("url").and_then(Value::as_str) else {
        return PluginProbeResult {
            name: name.to_string(),
            ok: false,
            detail: "missing url".into(),
        };
    };
    let client = reqwest::Client::new();
    match client.get(url).timeout(PROBE_TIMEOUT).send().await {
        // Any HTTP answer (including 4xx from an auth wall) means the
        // endpoint is reachable.
        Ok(response) if response.status().as_u16() < 500 => PluginProbeResult {
            name: name.to_string(),
            ok: true,
            detail: format!("HTTP {}", response.status().as_u16()),
        },
        Ok(response) => PluginProbeResult {
            name: name.to_string(),
            ok: false,
            detail: format!("HTTP {}", response.status().as_u16()),
        },
        Err(e) => PluginProbeResult { name: name.to_string(), ok: false, detail: e.to_string() },
    }
}

fn probe_local(name: &str, server: &Value) -> PluginProbeResult {
    let Some(command) = server.get("command").and_then(Value::as_str) else {
        return PluginProbeResult {
            name: name.to_string(),
            ok: false,
            detail: "missing command".into(),
        };
    };
    let found = binary_on_path(command);
    PluginProbeResult {
        name: name.to_string(),
        ok: found,
        detail: if found { "binary found".into() } else { format!("'{command}' not on PATH") },
    }
}

fn binary_on_path(command: &str) -> bool {
    let path = Path::new(command);
    if path.is_absolute() || command.contains('/') {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths).any(|dir| dir.join(command).is_file())
        })
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "plugins_tests.rs"]
mod tests;
