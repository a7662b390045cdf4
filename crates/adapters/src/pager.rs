// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Paging integration (PagerDuty Events API v2).
//!
//! Process-wide singleton: `init` once at startup, plain function calls
//! afterwards, `reset` between tests. Alert delivery failures are never
//! fatal; callers get a bool and move on.

use parking_lot::Mutex;
use serde_json::json;
use std::time::Duration;

const EVENTS_URL: &str = "https://events.pagerduty.com/v2/enqueue";
const SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Stable dedup key: one open incident per daemon, however many times the
/// engine re-enters hibernation.
pub const HIBERNATION_DEDUP_KEY: &str = "kiln-daemon-hibernation";

static ROUTING_KEY: Mutex<Option<String>> = Mutex::new(None);

/// Configure paging. `None` or empty disables the integration.
pub fn init(routing_key: Option<String>) {
    let key = routing_key.filter(|k| !k.is_empty());
    if key.is_none() {
        tracing::info!("paging integration disabled (no routing key)");
    }
    *ROUTING_KEY.lock() = key;
}

/// Clear configuration (tests).
pub fn reset() {
    *ROUTING_KEY.lock() = None;
}

pub fn is_enabled() -> bool {
    ROUTING_KEY.lock().is_some()
}

/// Fire the hibernation alert. Returns whether delivery succeeded.
pub async fn trigger_hibernation_alert(reason: &str, board_urls: &[String]) -> bool {
    let Some(key) = ROUTING_KEY.lock().clone() else {
        return false;
    };
    let payload = json!({
        "routing_key": key,
        "event_action": "trigger",
        "dedup_key": HIBERNATION_DEDUP_KEY,
        "payload": {
            "summary": format!("Kiln daemon entered hibernation: {reason}"),
            "severity": "warning",
            "source": "kiln-daemon",
            "custom_details": { "boards": board_urls },
        },
    });
    send(payload).await
}

/// Resolve the hibernation alert after recovery.
pub async fn resolve_hibernation_alert() -> bool {
    let Some(key) = ROUTING_KEY.lock().clone() else {
        return false;
    };
    let payload = json!({
        "routing_key": key,
        "event_action": "resolve",
        "dedup_key": HIBERNATION_DEDUP_KEY,
    });
    send(payload).await
}

/// Page for a specific wedged issue (inactivity timeout).
pub async fn trigger_stall_alert(dedup_key: &str, summary: &str) -> bool {
    let Some(key) = ROUTING_KEY.lock().clone() else {
        return false;
    };
    let payload = json!({
        "routing_key": key,
        "event_action": "trigger",
        "dedup_key": dedup_key,
        "payload": {
            "summary": summary,
            "severity": "warning",
            "source": "kiln-daemon",
        },
    });
    send(payload).await
}

async fn send(payload: serde_json::Value) -> bool {
    let client = reqwest::Client::new();
    match client.post(EVENTS_URL).json(&payload).timeout(SEND_TIMEOUT).send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response) => {
            tracing::warn!(status = %response.status(), "paging alert rejected");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "paging alert delivery failed");
            false
        }
    }
}

#[cfg(test)]
#[path = "pager_tests.rs"]
mod tests;
