// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat notifications (Slack incoming webhook).
//!
//! Same singleton shape as the pager: `init`/`reset`, best-effort sends.

use kiln_core::{RepoId, Stage, Status};
use parking_lot::Mutex;
use serde_json::json;
use std::time::Duration;

const SEND_TIMEOUT: Duration = Duration::from_secs(10);

static WEBHOOK_URL: Mutex<Option<String>> = Mutex::new(None);

pub fn init(webhook_url: Option<String>) {
    let url = webhook_url.filter(|u| !u.is_empty());
    if url.is_none() {
        tracing::info!("chat integration disabled (no webhook URL)");
    }
    *WEBHOOK_URL.lock() = url;
}

pub fn reset() {
    *WEBHOOK_URL.lock() = None;
}

pub fn is_enabled() -> bool {
    WEBHOOK_URL.lock().is_some()
}

/// Post a plain message. Returns whether delivery succeeded.
pub async fn send_message(text: &str) -> bool {
    let Some(url) = WEBHOOK_URL.lock().clone() else {
        return false;
    };
    let client = reqwest::Client::new();
    match client
        .post(&url)
        .json(&json!({ "text": text }))
        .timeout(SEND_TIMEOUT)
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            tracing::warn!(status = %response.status(), "chat message rejected");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "chat message delivery failed");
            false
        }
    }
}

pub async fn send_startup_ping(boards: &[String]) {
    let _ = send_message(&format!(
        ":fire: Kiln daemon started, watching {} board(s)",
        boards.len()
    ))
    .await;
}

pub async fn send_stage_completion(repo: &RepoId, issue_number: u64, stage: Stage, next: &Status) {
    let _ = send_message(&format!(
        "{repo}#{issue_number}: {stage} stage complete, moved to {next}"
    ))
    .await;
}

pub async fn send_comment_processed(repo: &RepoId, issue_number: u64, author: &str) {
    let _ = send_message(&format!(
        "{repo}#{issue_number}: applied revision comment from {author}"
    ))
    .await;
}

pub async fn send_plugin_warning(plugin: &str, detail: &str) {
    let _ = send_message(&format!(
        ":warning: tool plugin '{plugin}' failed its health check: {detail}"
    ))
    .await;
}

pub async fn send_auth_warning(host: &str, detail: &str) {
    let _ = send_message(&format!(
        ":warning: authentication degraded for {host}: {detail}"
    ))
    .await;
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
