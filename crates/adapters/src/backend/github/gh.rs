// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `gh` CLI execution and error classification.
//!
//! All GitHub traffic goes through the `gh` binary so the daemon inherits
//! the operator's authentication setup. Operator-supplied tokens override
//! it via `GH_TOKEN` / `GH_ENTERPRISE_TOKEN`.

use crate::backend::BackendError;
use crate::subprocess::GH_COMMAND_TIMEOUT;
use kiln_core::error::{looks_like_auth_error, looks_like_network_error};
use serde_json::Value;
use std::collections::HashMap;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Thin wrapper over the `gh` binary.
#[derive(Clone, Default)]
pub struct GhClient {
    /// hostname → token. Hosts not present fall back to `gh auth login`.
    tokens: HashMap<String, String>,
}

impl GhClient {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    fn command(&self, host: &str) -> Command {
        let mut cmd = Command::new("gh");
        if let Some(token) = self.tokens.get(host) {
            if host == "github.com" {
                cmd.env("GH_TOKEN", token);
            } else {
                cmd.env("GH_ENTERPRISE_TOKEN", token);
            }
        }
        cmd
    }

    /// Execute a GraphQL document with variables.
    pub async fn graphql(
        &self,
        host: &str,
        query: &str,
        variables: Value,
    ) -> Result<Value, BackendError> {
        let body = serde_json::json!({ "query": query, "variables": variables });
        let mut cmd = self.command(host);
        cmd.args(["api", "graphql", "--hostname", host, "--input", "-"]);
        let value = self.run(cmd, Some(body.to_string())).await?;

        // GraphQL transports errors in the response body with HTTP 200.
        if let Some(errors) = value.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let msg = errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str))
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(BackendError::Api(format!("GraphQL: {msg}")));
            }
        }
        value
            .get("data")
            .cloned()
            .ok_or_else(|| BackendError::Parse("GraphQL response missing data".into()))
    }

    /// Execute a REST call. `body` becomes the JSON request body.
    pub async fn rest(
        &self,
        host: &str,
        method: &str,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, BackendError> {
        let mut cmd = self.command(host);
        cmd.args(["api", "--hostname", host, "-X", method, path]);
        if body.is_some() {
            cmd.args(["--input", "-"]);
        }
        self.run(cmd, body.map(|b| b.to_string())).await
    }

    /// REST call returning the raw response including headers (`gh api -i`).
    pub async fn rest_with_headers(
        &self,
        host: &str,
        path: &str,
    ) -> Result<String, BackendError> {
        let mut cmd = self.command(host);
        cmd.args(["api", "--hostname", host, "-i", path]);
        let output = self.exec(cmd, None).await?;
        if !output.status.success() {
            return Err(classify_failure(&output.stderr, &output.stdout));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn run(&self, cmd: Command, stdin: Option<String>) -> Result<Value, BackendError> {
        let output = self.exec(cmd, stdin).await?;
        if !output.status.success() {
            return Err(classify_failure(&output.stderr, &output.stdout));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            // DELETE and some PATCH endpoints return 204 with no body.
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout)
            .map_err(|e| BackendError::Parse(format!("invalid JSON from gh: {e}")))
    }

    async fn exec(
        &self,
        mut cmd: Command,
        stdin: Option<String>,
    ) -> Result<std::process::Output, BackendError> {
        cmd.stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| BackendError::Api(format!("failed to spawn gh: {e}")))?;

        if let (Some(mut handle), Some(body)) = (child.stdin.take(), stdin) {
            handle
                .write_all(body.as_bytes())
                .await
                .map_err(|e| BackendError::Api(format!("failed to write gh stdin: {e}")))?;
            drop(handle);
        }

        match tokio::time::timeout(GH_COMMAND_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(BackendError::Api(format!("gh execution failed: {e}"))),
            Err(_) => Err(BackendError::Network(format!(
                "gh call exceeded {}s",
                GH_COMMAND_TIMEOUT.as_secs()
            ))),
        }
    }
}

/// Sort a failed `gh` invocation into the error taxonomy.
///
/// `gh` prints most diagnostics to stderr but GraphQL-level failures can
/// land on stdout; both are inspected.
pub(crate) fn classify_failure(stderr: &[u8], stdout: &[u8]) -> BackendError {
    let stderr = String::from_utf8_lossy(stderr);
    let stdout = String::from_utf8_lossy(stdout);
    let combined = format!("{} {}", stderr.trim(), stdout.trim());
    let trimmed = combined.trim().to_string();

    if looks_like_network_error(&trimmed) {
        BackendError::Network(trimmed)
    } else if looks_like_auth_error(&trimmed) {
        BackendError::Auth(trimmed)
    } else {
        BackendError::Api(trimmed)
    }
}

#[cfg(test)]
#[path = "gh_tests.rs"]
mod tests;
