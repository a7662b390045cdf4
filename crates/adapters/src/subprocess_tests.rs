// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn captures_output_of_fast_command() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("echo hello && echo oops >&2");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "echo").await.unwrap();
    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "oops");
}

#[tokio::test]
async fn kills_command_on_timeout() {
    let mut cmd = Command::new("sleep");
    cmd.arg("30");
    let err = run_with_timeout(cmd, Duration::from_millis(50), "sleep")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Timeout { label: "sleep", .. }));
}

#[tokio::test]
async fn spawn_failure_is_reported() {
    let cmd = Command::new("definitely-not-a-real-binary-kiln");
    let err = run_with_timeout(cmd, Duration::from_secs(1), "missing")
        .await
        .unwrap_err();
    assert!(matches!(err, SubprocessError::Spawn { .. }));
}

#[tokio::test]
async fn nonzero_exit_is_not_an_error() {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg("exit 3");
    let output = run_with_timeout(cmd, Duration::from_secs(5), "exit").await.unwrap();
    assert_eq!(output.status.code(), Some(3));
}
