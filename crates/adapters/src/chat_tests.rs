// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn init_and_reset() {
    init(Some("https://hooks.slack.example/T000/B000/xyz".into()));
    assert!(is_enabled());
    reset();
    assert!(!is_enabled());
}

#[test]
#[serial]
fn empty_url_disables() {
    init(Some(String::new()));
    assert!(!is_enabled());
}

#[tokio::test]
#[serial]
async fn send_is_noop_when_disabled() {
    reset();
    assert!(!send_message("hello").await);
}
