// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run telemetry export.
//!
//! Metrics rows are appended as JSON lines to a file in the state
//! directory; operators scrape or ship them however they like. Singleton
//! shape matches the pager and chat modules.

use chrono::{DateTime, Utc};
use kiln_core::{RepoId, RunOutcome, Stage, UsageMetrics};
use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

static SINK: Mutex<Option<PathBuf>> = Mutex::new(None);

#[derive(Serialize)]
struct TelemetryRow<'a> {
    at: DateTime<Utc>,
    stage: Stage,
    repo: &'a RepoId,
    issue_number: u64,
    outcome: RunOutcome,
    #[serde(flatten)]
    metrics: &'a UsageMetrics,
}

pub fn init(path: Option<PathBuf>) {
    if path.is_none() {
        tracing::info!("telemetry export disabled");
    }
    *SINK.lock() = path;
}

pub fn reset() {
    *SINK.lock() = None;
}

pub fn is_enabled() -> bool {
    SINK.lock().is_some()
}

/// Record one finished run. Failures are logged and swallowed.
pub fn record_run(
    stage: Stage,
    repo: &RepoId,
    issue_number: u64,
    outcome: RunOutcome,
    metrics: &UsageMetrics,
) {
    let Some(path) = SINK.lock().clone() else {
        return;
    };
    let row = TelemetryRow { at: Utc::now(), stage, repo, issue_number, outcome, metrics };
    let result = (|| -> std::io::Result<()> {
        let mut line = serde_json::to_string(&row)?;
        line.push('\n');
        let mut file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
        file.write_all(line.as_bytes())
    })();
    if let Err(e) = result {
        tracing::warn!(error = %e, path = %path.display(), "telemetry write failed");
    }
}

#[cfg(test)]
#[path = "telemetry_tests.rs"]
mod tests;
