// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent runner: one stage invocation of the coding agent CLI.

mod stream;

use async_trait::async_trait;
use kiln_core::UsageMetrics;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

/// Default wall-clock budget for one stage.
pub const DEFAULT_TOTAL_TIMEOUT: Duration = Duration::from_secs(3600);
/// Default budget measured from the last stdout byte.
pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("agent run exceeded total timeout of {0}s")]
    TimeoutTotal(u64),
    #[error("agent run exceeded inactivity timeout of {0}s")]
    TimeoutInactivity(u64),
    #[error("agent failure: {0}")]
    AgentFailure(String),
    #[error("failed to launch agent: {0}")]
    Spawn(std::io::Error),
}

/// One invocation request.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub prompt: String,
    pub cwd: PathBuf,
    pub model: Option<String>,
    pub resume_session: Option<String>,
    pub plugin_config_path: Option<PathBuf>,
    pub telemetry_enabled: bool,
}

/// Successful invocation result.
#[derive(Debug, Clone)]
pub struct RunnerOutput {
    pub response_text: String,
    pub metrics: UsageMetrics,
    pub session_id: String,
}

/// Drives the agent subprocess for one stage.
#[async_trait]
pub trait AgentRunner: Send + Sync {
    async fn run(&self, request: RunRequest) -> Result<RunnerOutput, RunnerError>;

    /// Whether a stored session handle can still be resumed in `cwd`.
    async fn validate_session_exists(&self, cwd: &Path, session_id: &str) -> bool;
}

/// Runner spawning the `claude` CLI.
pub struct ClaudeRunner {
    binary: String,
    total_timeout: Duration,
    inactivity_timeout: Duration,
    /// Root of the agent's per-project session storage
    /// (`~/.claude` unless overridden).
    agent_home: Option<PathBuf>,
}

impl ClaudeRunner {
    pub fn new(total_timeout: Duration, inactivity_timeout: Duration) -> Self {
        Self {
            binary: "claude".into(),
            total_timeout,
            inactivity_timeout,
            agent_home: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_agent_home(mut self, home: PathBuf) -> Self {
        self.agent_home = Some(home);
        self
    }

    fn agent_home(&self) -> Option<PathBuf> {
        self.agent_home
            .clone()
            .or_else(|| dirs_home().map(|h| h.join(".claude")))
    }

    fn build_command(&self, request: &RunRequest) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-p", "--output-format", "stream-json", "--verbose"]);
        if let Some(model) = &request.model {
            cmd.args(["--model", model]);
        }
        if let Some(session) = &request.resume_session {
            cmd.args(["--resume", session]);
        }
        if let Some(path) = &request.plugin_config_path {
            cmd.arg("--mcp-config").arg(path);
        }
        cmd.env(
            "CLAUDE_CODE_ENABLE_TELEMETRY",
            if request.telemetry_enabled { "1" } else { "0" },
        );
        cmd.current_dir(&request.cwd)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for ClaudeRunner {
    fn default() -> Self {
        Self::new(DEFAULT_TOTAL_TIMEOUT, DEFAULT_INACTIVITY_TIMEOUT)
    }
}

#[async_trait]
impl AgentRunner for ClaudeRunner {
    async fn run(&self, request: RunRequest) -> Result<RunnerOutput, RunnerError> {
        let start = Instant::now();
        let mut child = self.build_command(&request).spawn().map_err(RunnerError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(request.prompt.as_bytes())
                .await
                .map_err(RunnerError::Spawn)?;
            drop(stdin);
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunnerError::AgentFailure("agent stdout unavailable".into()))?;
        let mut lines = BufReader::new(stdout).lines();
        let mut acc = stream::Accumulator::default();

        loop {
            let elapsed = start.elapsed();
            if elapsed >= self.total_timeout {
                let _ = child.start_kill();
                return Err(RunnerError::TimeoutTotal(self.total_timeout.as_secs()));
            }
            // Whichever budget runs out first bounds the next read.
            let read_budget = self.inactivity_timeout.min(self.total_timeout - elapsed);

            match tokio::time::timeout(read_budget, lines.next_line()).await {
                Ok(Ok(Some(line))) => {
                    if let Some(message) = acc.feed(&line) {
                        let _ = child.start_kill();
                        return Err(RunnerError::AgentFailure(message));
                    }
                }
                Ok(Ok(None)) => break, // EOF
                Ok(Err(e)) => {
                    let _ = child.start_kill();
                    return Err(RunnerError::AgentFailure(format!(
                        "failed reading agent stdout: {e}"
                    )));
                }
                Err(_) => {
                    let _ = child.start_kill();
                    return if start.elapsed() >= self.total_timeout {
                        Err(RunnerError::TimeoutTotal(self.total_timeout.as_secs()))
                    } else {
                        Err(RunnerError::TimeoutInactivity(self.inactivity_timeout.as_secs()))
                    };
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RunnerError::AgentFailure(format!("failed to reap agent: {e}")))?;

        if !output.status.success() {
            // Surface bootstrap errors: stderr plus any stdout that was not
            // event JSON.
            let stderr = String::from_utf8_lossy(&output.stderr);
            let mut detail = stderr.trim().to_string();
            let non_json = acc.non_json_output();
            if !non_json.is_empty() {
                if !detail.is_empty() {
                    detail.push('\n');
                }
                detail.push_str(&non_json);
            }
            if detail.is_empty() {
                detail = format!("agent exited with status {}", output.status);
            }
            return Err(RunnerError::AgentFailure(detail));
        }

        let (response_text, metrics, session_id) = acc
            .finish()
            .ok_or_else(|| RunnerError::AgentFailure("agent emitted no result event".into()))?;
        let session_id = session_id
            .ok_or_else(|| RunnerError::AgentFailure("agent emitted no session id".into()))?;
        Ok(RunnerOutput { response_text, metrics, session_id })
    }

    async fn validate_session_exists(&self, cwd: &Path, session_id: &str) -> bool {
        let Some(home) = self.agent_home() else {
            return false;
        };
        // Sessions are stored per project under a path-derived directory.
        let encoded = encode_project_dir(cwd);
        home.join("projects").join(encoded).join(format!("{session_id}.jsonl")).exists()
    }
}

/// The agent CLI's project-directory encoding: the absolute path with
/// separators and dots flattened to dashes.
fn encode_project_dir(cwd: &Path) -> String {
    cwd.display()
        .to_string()
        .chars()
        .map(|c| if c == '/' || c == '\\' || c == '.' { '-' } else { c })
        .collect()
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
