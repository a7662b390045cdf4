// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! kilnd: the Kiln workflow daemon.

use clap::Parser;
use kiln_adapters::{
    chat, pager, telemetry, ClaudeRunner, GithubBackend, OAuthClient, PluginConfigManager,
    RepoCredentials,
};
use kiln_core::SystemClock;
use kiln_daemon::checks;
use kiln_daemon::config::DaemonConfig;
use kiln_daemon::lifecycle::{touch_update_check, PidLock};
use kiln_daemon::paths::StatePaths;
use kiln_engine::{supervisor::Supervisor, Engine, GitWorktrees};
use kiln_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "kilnd", about = "Drives an AI coding agent through project-board workflows")]
struct Args {
    /// Config file (defaults to <state-dir>/kiln.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// State directory (defaults to $KILN_STATE_DIR or the platform state dir)
    #[arg(long)]
    state_dir: Option<PathBuf>,

    /// Log filter, e.g. "info" or "kiln_engine=debug"
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> std::process::ExitCode {
    let args = Args::parse();
    match run(args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kilnd: {e}");
            std::process::ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let paths = StatePaths::resolve(args.state_dir);
    std::fs::create_dir_all(&paths.state_dir)?;

    let file_appender = tracing_appender::rolling::daily(&paths.state_dir, "kilnd.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(args.log.clone())),
        )
        .with_writer(file_writer)
        .with_ansi(false)
        .init();

    let config_path = args.config.unwrap_or_else(|| paths.config.clone());
    let config = DaemonConfig::load(&config_path, paths.workspaces_dir.clone())?;
    info!(config = %config_path.display(), state_dir = %paths.state_dir.display(), "kilnd starting");

    let _pid_lock = PidLock::acquire(&paths.pid)?;
    touch_update_check(&paths.update_check);

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(serve(config, paths))?;
    info!("kilnd stopped");
    Ok(())
}

async fn serve(config: DaemonConfig, paths: StatePaths) -> Result<(), Box<dyn std::error::Error>> {
    // Process-wide integrations first so everything after can notify.
    pager::init(config.pagerduty_routing_key.clone());
    chat::init(config.slack_webhook_url.clone());
    telemetry::init(config.telemetry.then(|| paths.state_dir.join("telemetry.jsonl")));

    let backend = GithubBackend::new(config.tokens.clone(), config.backend_version);
    let hosts = kiln_engine::supervisor::board_hosts(&config.engine.boards);
    checks::check_backend(&backend, &hosts).await?;

    let oauth = config
        .azure_oauth
        .clone()
        .map(|oauth_config| Arc::new(OAuthClient::new(oauth_config)));
    let plugins = PluginConfigManager::new(paths.plugin_config.clone(), oauth.clone());
    checks::check_plugins(&plugins, config.plugin_fail_on_error).await?;

    let credentials = RepoCredentials::load(&paths.credentials)?;
    let store = Store::open(&paths.store_dir)?;
    let runner = ClaudeRunner::new(config.agent_total_timeout, config.agent_inactivity_timeout);
    let worktrees = GitWorktrees::new(paths.workspaces_dir.clone());

    let shutdown = CancellationToken::new();
    let engine = Engine::new(
        backend,
        runner,
        worktrees,
        store,
        config.engine.clone(),
        SystemClock,
        Some(plugins),
        credentials,
        oauth,
        shutdown.clone(),
    );

    spawn_signal_handler(shutdown.clone());

    // Recover from any crash mid-comment-application before polling.
    engine.resync_processing_comments().await;
    chat::send_startup_ping(&config.engine.boards).await;

    Supervisor::new(engine.clone()).run().await;

    if let Err(e) = engine.store().checkpoint() {
        error!(error = %e, "final store checkpoint failed");
    }
    Ok(())
}

fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            let mut sigterm = match tokio::signal::unix::signal(
                tokio::signal::unix::SignalKind::terminate(),
            ) {
                Ok(signal) => signal,
                Err(e) => {
                    error!(error = %e, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    shutdown.cancel();
                    return;
                }
            };
            tokio::select! {
                _ = ctrl_c => info!("received SIGINT"),
                _ = sigterm.recv() => info!("received SIGTERM"),
            }
        }
        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received interrupt");
        }
        shutdown.cancel();
    });
}
