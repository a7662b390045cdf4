// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent stdout stream parsing.
//!
//! The agent CLI emits one JSON object per line. Recognized kinds:
//! `assistant` (accumulate text), `result` (final text + usage), `error`
//! (fail). Everything else is ignored. Non-JSON lines are kept verbatim so
//! bootstrap errors stay visible when the process exits non-zero.

use kiln_core::{ModelUsage, UsageMetrics};
use serde_json::Value;

#[derive(Debug)]
pub(crate) enum StreamEvent {
    Assistant(String),
    Result { text: String, metrics: UsageMetrics, session_id: Option<String> },
    Error(String),
    Ignored,
}

/// Parse one stdout line. `None` means the line was not JSON.
pub(crate) fn parse_line(line: &str) -> Option<StreamEvent> {
    let value: Value = serde_json::from_str(line).ok()?;
    match value.get("type").and_then(Value::as_str) {
        Some("assistant") => Some(StreamEvent::Assistant(assistant_text(&value))),
        Some("result") => Some(StreamEvent::Result {
            text: value.get("result").and_then(Value::as_str).unwrap_or_default().to_string(),
            metrics: metrics_from_result(&value),
            session_id: value
                .get("session_id")
                .and_then(Value::as_str)
                .map(str::to_string),
        }),
        Some("error") => Some(StreamEvent::Error(
            value
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("agent reported an error")
                .to_string(),
        )),
        _ => Some(StreamEvent::Ignored),
    }
}

fn assistant_text(value: &Value) -> String {
    let mut out = String::new();
    for block in value
        .pointer("/message/content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if block.get("type").and_then(Value::as_str) == Some("text") {
            if let Some(text) = block.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
    }
    out
}

/// Extract the usage record from a `result` event.
pub(crate) fn metrics_from_result(value: &Value) -> UsageMetrics {
    let usage = value.get("usage");
    let get = |v: Option<&Value>, key: &str| -> u64 {
        v.and_then(|u| u.get(key)).and_then(Value::as_u64).unwrap_or(0)
    };

    let mut metrics = UsageMetrics {
        duration_ms: value.get("duration_ms").and_then(Value::as_u64).unwrap_or(0),
        duration_api_ms: value.get("duration_api_ms").and_then(Value::as_u64).unwrap_or(0),
        cost_usd: value.get("total_cost_usd").and_then(Value::as_f64).unwrap_or(0.0),
        input_tokens: get(usage, "input_tokens"),
        output_tokens: get(usage, "output_tokens"),
        cache_creation_tokens: get(usage, "cache_creation_input_tokens"),
        cache_read_tokens: get(usage, "cache_read_input_tokens"),
        num_turns: value.get("num_turns").and_then(Value::as_u64).unwrap_or(0),
        per_model: Default::default(),
    };

    for (model, detail) in value
        .get("modelUsage")
        .and_then(Value::as_object)
        .into_iter()
        .flatten()
    {
        metrics.per_model.insert(
            model.clone(),
            ModelUsage {
                input_tokens: detail.get("inputTokens").and_then(Value::as_u64).unwrap_or(0),
                output_tokens: detail.get("outputTokens").and_then(Value::as_u64).unwrap_or(0),
                cost_usd: detail.get("costUSD").and_then(Value::as_f64).unwrap_or(0.0),
            },
        );
    }
    metrics
}

/// Folds stream events into the final runner output.
#[derive(Default)]
pub(crate) struct Accumulator {
    chunks: Vec<String>,
    result: Option<(String, UsageMetrics, Option<String>)>,
    non_json: Vec<String>,
}

impl Accumulator {
    /// Feed one line; returns an error message if the agent emitted one.
    pub(crate) fn feed(&mut self, line: &str) -> Option<String> {
        match parse_line(line) {
            Some(StreamEvent::Assistant(text)) => {
                if !text.is_empty() {
                    self.chunks.push(text);
                }
                None
            }
            Some(StreamEvent::Result { text, metrics, session_id }) => {
                self.result = Some((text, metrics, session_id));
                None
            }
            Some(StreamEvent::Error(message)) => Some(message),
            Some(StreamEvent::Ignored) => None,
            None => {
                self.non_json.push(line.to_string());
                None
            }
        }
    }

    pub(crate) fn saw_result(&self) -> bool {
        self.result.is_some()
    }

    /// Non-JSON stdout, for diagnostics on non-zero exit.
    pub(crate) fn non_json_output(&self) -> String {
        self.non_json.join("\n")
    }

    /// Final text: accumulated assistant chunks plus the result string
    /// (skipped when it merely repeats the accumulated text).
    pub(crate) fn finish(self) -> Option<(String, UsageMetrics, Option<String>)> {
        let (result_text, metrics, session_id) = self.result?;
        let mut parts = self.chunks;
        let accumulated = parts.join("\n");
        if !result_text.is_empty() && result_text != accumulated {
            parts.push(result_text);
        }
        Some((parts.join("\n"), metrics, session_id))
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
