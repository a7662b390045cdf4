// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor: the daemon's outer control loop.
//!
//! Health-checks connectivity, enters and exits hibernation with paired
//! paging alerts, drives the dispatcher at the poll cadence, backs off
//! exponentially on non-network errors, and drains workers on shutdown.

use crate::Engine;
use kiln_adapters::{chat, pager, AgentRunner, ConnectionStatus, TicketBackend};
use kiln_core::Clock;
use std::collections::BTreeSet;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const BACKOFF_BASE: Duration = Duration::from_secs(2);
const BACKOFF_MAX: Duration = Duration::from_secs(300);

pub struct Supervisor<B, R, W, C> {
    engine: Engine<B, R, W, C>,
}

impl<B, R, W, C> Supervisor<B, R, W, C>
where
    B: TicketBackend + 'static,
    R: AgentRunner + 'static,
    W: crate::worktree::WorktreeManager + 'static,
    C: Clock,
{
    pub fn new(engine: Engine<B, R, W, C>) -> Self {
        Self { engine }
    }

    /// Run until the shutdown token fires, then drain in-flight workers.
    pub async fn run(&self) {
        let shutdown = self.engine.shutdown_token().clone();
        let config = self.engine.config().clone();
        let mut hibernating = false;
        let mut backoff = BACKOFF_BASE;

        while !shutdown.is_cancelled() {
            match self.connectivity_ok().await {
                Err(reason) => {
                    if !hibernating {
                        hibernating = true;
                        tracing::warn!(%reason, "connectivity lost; entering hibernation");
                        pager::trigger_hibernation_alert(&reason, &config.boards).await;
                    }
                    if sleep_unless_cancelled(&shutdown, config.hibernation_interval).await {
                        break;
                    }
                    continue;
                }
                Ok(()) => {
                    if hibernating {
                        hibernating = false;
                        tracing::info!("connectivity restored; exiting hibernation");
                        pager::resolve_hibernation_alert().await;
                    }
                }
            }

            match self.engine.poll_once().await {
                Ok(stats) => {
                    backoff = BACKOFF_BASE;
                    tracing::debug!(
                        observed = stats.observed,
                        stages = stats.stages_dispatched,
                        revisions = stats.revisions_dispatched,
                        resets = stats.resets_dispatched,
                        "poll complete"
                    );
                }
                Err(e) if e.is_network() => {
                    // Straight back to the health check, which decides
                    // whether this is hibernation-worthy.
                    tracing::warn!(error = %e, "network failure during poll");
                    continue;
                }
                Err(e) => {
                    tracing::error!(error = %e, "poll failed; backing off");
                    if sleep_unless_cancelled(&shutdown, backoff).await {
                        break;
                    }
                    backoff = (backoff * 2).min(BACKOFF_MAX);
                }
            }

            if sleep_unless_cancelled(&shutdown, config.poll_interval).await {
                break;
            }
        }

        tracing::info!("supervisor stopping; draining workers");
        self.engine.drain().await;
    }

    /// Probe every board host. Network failure anywhere means unhealthy;
    /// auth failures degrade that host with a chat warning but do not
    /// trigger hibernation.
    async fn connectivity_ok(&self) -> Result<(), String> {
        for host in board_hosts(&self.engine.config().boards) {
            match self.engine.backend().validate_connection(&host).await {
                ConnectionStatus::Ok { login } => {
                    tracing::trace!(%host, %login, "connectivity ok");
                }
                ConnectionStatus::NetworkFailure(msg) => {
                    return Err(format!("{host}: {msg}"));
                }
                ConnectionStatus::AuthFailure(msg) => {
                    tracing::warn!(%host, %msg, "authentication degraded");
                    chat::send_auth_warning(&host, &msg).await;
                }
            }
        }
        Ok(())
    }
}

/// Hosts referenced by the configured board URLs, deduplicated.
pub fn board_hosts(boards: &[String]) -> Vec<String> {
    let mut hosts = BTreeSet::new();
    for board in boards {
        let rest = board
            .strip_prefix("https://")
            .or_else(|| board.strip_prefix("http://"))
            .unwrap_or(board);
        if let Some(host) = rest.split('/').next() {
            if !host.is_empty() {
                hosts.insert(host.to_string());
            }
        }
    }
    hosts.into_iter().collect()
}

/// Interruptible sleep; returns true when the token fired.
async fn sleep_unless_cancelled(token: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = token.cancelled() => true,
        _ = tokio::time::sleep(duration) => false,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
