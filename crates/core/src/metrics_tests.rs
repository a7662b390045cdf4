// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn defaults_are_zero() {
    let m = UsageMetrics::default();
    assert_eq!(m.duration_ms, 0);
    assert_eq!(m.cost_usd, 0.0);
    assert_eq!(m.total_tokens(), 0);
    assert!(m.per_model.is_empty());
}

#[test]
fn total_tokens_sums_input_and_output() {
    let m = UsageMetrics { input_tokens: 1500, output_tokens: 300, ..Default::default() };
    assert_eq!(m.total_tokens(), 1800);
}

#[test]
fn per_model_round_trips() {
    let mut m = UsageMetrics::default();
    m.per_model.insert(
        "claude-opus".into(),
        ModelUsage { input_tokens: 1000, output_tokens: 200, cost_usd: 0.05 },
    );
    let json = serde_json::to_string(&m).unwrap();
    let back: UsageMetrics = serde_json::from_str(&json).unwrap();
    assert_eq!(back, m);
}
