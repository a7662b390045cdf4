// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_adapters::test_support::FakeBackend;
use kiln_adapters::PluginConfigManager;
use tempfile::tempdir;

#[tokio::test]
async fn healthy_backend_passes() {
    let backend = FakeBackend::new();
    check_backend(&backend, &["github.com".to_string()]).await.unwrap();
}

#[tokio::test]
async fn auth_failure_is_fatal() {
    let backend = FakeBackend::new();
    backend.set_connection_failure(
        "github.com",
        ConnectionStatus::AuthFailure("bad credentials".into()),
    );
    let err = check_backend(&backend, &["github.com".to_string()]).await.unwrap_err();
    assert!(matches!(err, StartupError::Auth { .. }));
}

#[tokio::test]
async fn network_failure_is_not_fatal() {
    let backend = FakeBackend::new();
    backend.set_connection_failure(
        "github.com",
        ConnectionStatus::NetworkFailure("connection refused".into()),
    );
    check_backend(&backend, &["github.com".to_string()]).await.unwrap();
}

#[tokio::test]
async fn missing_plugin_config_passes() {
    let dir = tempdir().unwrap();
    let plugins = PluginConfigManager::new(dir.path().join("mcp.json"), None);
    check_plugins(&plugins, true).await.unwrap();
}

#[tokio::test]
async fn broken_plugin_blocks_startup_in_fail_on_error_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    std::fs::write(
        &path,
        r#"{ "mcpServers": { "ghost": { "command": "definitely-not-installed-kiln" } } }"#,
    )
    .unwrap();
    let plugins = PluginConfigManager::new(path, None);

    let err = check_plugins(&plugins, true).await.unwrap_err();
    assert!(matches!(err, StartupError::Plugin { .. }));
}

#[tokio::test]
async fn broken_plugin_degrades_when_not_fail_on_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    std::fs::write(
        &path,
        r#"{ "mcpServers": { "ghost": { "command": "definitely-not-installed-kiln" } } }"#,
    )
    .unwrap();
    let plugins = PluginConfigManager::new(path, None);
    check_plugins(&plugins, false).await.unwrap();
}

#[tokio::test]
async fn malformed_server_entry_blocks_in_fail_on_error_mode() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("mcp.json");
    std::fs::write(&path, r#"{ "mcpServers": { "neither": {} } }"#).unwrap();
    let plugins = PluginConfigManager::new(path, None);
    let err = check_plugins(&plugins, true).await.unwrap_err();
    assert!(matches!(err, StartupError::PluginConfig(_)));
}
