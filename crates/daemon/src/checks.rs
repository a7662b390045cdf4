// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup checks.
//!
//! Authentication problems are fatal before the poll loop starts: the
//! operator gets a clear message instead of a daemon that hibernates
//! forever. Network problems are not fatal (the supervisor handles those),
//! and plugin problems are fatal only in fail-on-error mode.

use kiln_adapters::{chat, ConnectionStatus, PluginConfigManager, TicketBackend};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("authentication failed for {host}: {detail}")]
    Auth { host: String, detail: String },
    #[error("tool plugin '{plugin}' failed its health check: {detail}")]
    Plugin { plugin: String, detail: String },
    #[error("invalid tool-plugin config: {0}")]
    PluginConfig(String),
}

/// Validate connectivity and token scopes for every host.
pub async fn check_backend<B: TicketBackend>(
    backend: &B,
    hosts: &[String],
) -> Result<(), StartupError> {
    for host in hosts {
        match backend.validate_connection(host).await {
            ConnectionStatus::Ok { login } => {
                tracing::info!(%host, %login, "backend authentication ok");
            }
            ConnectionStatus::AuthFailure(detail) => {
                return Err(StartupError::Auth { host: host.clone(), detail });
            }
            ConnectionStatus::NetworkFailure(detail) => {
                // The supervisor's hibernation loop owns this case.
                tracing::warn!(%host, %detail, "host unreachable at startup");
                continue;
            }
        }
        if let Err(e) = backend.validate_scopes(host).await {
            return Err(StartupError::Auth { host: host.clone(), detail: e.to_string() });
        }
    }
    Ok(())
}

/// Validate and probe the tool-plugin config.
///
/// In fail-on-error mode any problem blocks startup; otherwise problems are
/// logged and sent to chat, and the engine degrades per stage.
pub async fn check_plugins(
    plugins: &PluginConfigManager,
    fail_on_error: bool,
) -> Result<(), StartupError> {
    if !plugins.has_config() {
        return Ok(());
    }

    match plugins.validate() {
        Ok(problems) if problems.is_empty() => {}
        Ok(problems) => {
            for problem in &problems {
                tracing::warn!(%problem, "plugin config problem");
            }
            if fail_on_error {
                return Err(StartupError::PluginConfig(problems.join("; ")));
            }
        }
        Err(e) => {
            if fail_on_error {
                return Err(StartupError::PluginConfig(e.to_string()));
            }
            tracing::warn!(error = %e, "plugin config unreadable");
            return Ok(());
        }
    }

    match plugins.probe_all().await {
        Ok(results) => {
            for probe in results.iter().filter(|p| !p.ok) {
                tracing::warn!(plugin = %probe.name, detail = %probe.detail, "plugin probe failed");
                chat::send_plugin_warning(&probe.name, &probe.detail).await;
                if fail_on_error {
                    return Err(StartupError::Plugin {
                        plugin: probe.name.clone(),
                        detail: probe.detail.clone(),
                    });
                }
            }
        }
        Err(e) if fail_on_error => return Err(StartupError::PluginConfig(e.to_string())),
        Err(e) => tracing::warn!(error = %e, "plugin probing failed"),
    }
    Ok(())
}

#[cfg(test)]
#[path = "checks_tests.rs"]
mod tests;
