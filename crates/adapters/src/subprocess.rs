// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded subprocess execution.
//!
//! Every external command the adapters run goes through
//! [`run_with_timeout`] so a wedged child can never stall a worker forever.

use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Timeout for `gh` API calls.
pub const GH_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
/// Timeout for git clone/fetch/reset during worktree provisioning.
pub const GIT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum SubprocessError {
    #[error("{label} timed out after {timeout:?}")]
    Timeout { label: &'static str, timeout: Duration },
    #[error("{label} failed to start: {source}")]
    Spawn {
        label: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Run a command to completion, killing it if the timeout fires.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    label: &'static str,
) -> Result<Output, SubprocessError> {
    cmd.kill_on_drop(true);
    let fut = cmd.output();
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(source)) => Err(SubprocessError::Spawn { label, source }),
        Err(_) => Err(SubprocessError::Timeout { label, timeout }),
    }
}

#[cfg(test)]
#[path = "subprocess_tests.rs"]
mod tests;
