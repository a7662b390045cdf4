// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use tempfile::tempdir;

fn write_config(dir: &Path, value: &Value) -> PathBuf {
    let path = dir.join("mcp.json");
    std::fs::write(&path, serde_json::to_vec_pretty(value).unwrap()).unwrap();
    path
}

#[test]
fn missing_config_loads_as_none() {
    let dir = tempdir().unwrap();
    let manager = PluginConfigManager::new(dir.path().join("mcp.json"), None);
    assert!(!manager.has_config());
    assert!(manager.load().unwrap().is_none());
}

#[test]
fn substitute_tokens_is_recursive() {
    let config = json!({
        "mcpServers": {
            "search": {
                "url": "https://mcp.example.com/sse",
                "headers": { "Authorization": "Bearer ${AZURE_BEARER_TOKEN}" },
                "extra": [ "${AZURE_BEARER_TOKEN}", 42, null ]
            }
        }
    });
    let resolved = substitute_tokens(&config, "tok-123");
    assert_eq!(
        resolved.pointer("/mcpServers/search/headers/Authorization").unwrap(),
        "Bearer tok-123"
    );
    assert_eq!(resolved.pointer("/mcpServers/search/extra/0").unwrap(), "tok-123");
    assert_eq!(resolved.pointer("/mcpServers/search/extra/1").unwrap(), 42);
}

#[tokio::test]
async fn write_to_worktree_without_oauth_keeps_placeholders() {
    let dir = tempdir().unwrap();
    let config = json!({
        "mcpServers": {
            "local": { "command": "mcp-tool", "args": ["--serve"] }
        }
    });
    let path = write_config(dir.path(), &config);
    let manager = PluginConfigManager::new(path, None);

    let worktree = dir.path().join("worktree");
    std::fs::create_dir_all(&worktree).unwrap();
    let written = manager.write_to_worktree(&worktree).await.unwrap().unwrap();
    assert_eq!(written, worktree.join(WORKTREE_PLUGIN_CONFIG_NAME));

    let round: Value =
        serde_json::from_str(&std::fs::read_to_string(&written).unwrap()).unwrap();
    assert_eq!(round.pointer("/mcpServers/local/command").unwrap(), "mcp-tool");
}

#[test]
fn validate_flags_malformed_servers() {
    let dir = tempdir().unwrap();
    let config = json!({
        "mcpServers": {
            "neither": {},
            "both": { "url": "https://x", "command": "y" },
            "fine": { "url": "https://mcp.example.com" }
        }
    });
    let path = write_config(dir.path(), &config);
    let manager = PluginConfigManager::new(path, None);
    let problems = manager.validate().unwrap();
    assert_eq!(problems.len(), 2);
    assert!(problems.iter().any(|p| p.contains("neither")));
    assert!(problems.iter().any(|p| p.contains("both")));
}

#[test]
fn remote_detection() {
    assert!(PluginConfigManager::is_remote_server(&json!({ "url": "https://x" })));
    assert!(!PluginConfigManager::is_remote_server(&json!({ "command": "x" })));
}

#[tokio::test]
async fn probe_local_missing_binary_fails() {
    let dir = tempdir().unwrap();
    let config = json!({
        "mcpServers": {
            "ghost": { "command": "definitely-not-installed-kiln" }
        }
    });
    let path = write_config(dir.path(), &config);
    let manager = PluginConfigManager::new(path, None);
    let results = manager.probe_all().await.unwrap();
    assert_eq!(results.len(), 1);
    assert!(!results[0].ok);
}

#[tokio::test]
async fn probe_local_present_binary_succeeds() {
    let dir = tempdir().unwrap();
    let config = json!({
        "mcpServers": {
            "shell": { "command": "sh" }
        }
    });
    let path = write_config(dir.path(), &config);
    let manager = PluginConfigManager::new(path, None);
    let results = manager.probe_all().await.unwrap();
    assert!(results[0].ok, "{:?}", results[0]);
}

#[test]
fn clear_cache_rereads_from_disk() {
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), &json!({ "mcpServers": {} }));
    let manager = PluginConfigManager::new(path.clone(), None);
    manager.load().unwrap();

    std::fs::write(&path, serde_json::to_vec(&json!({ "mcpServers": { "new": { "command": "x" } } })).unwrap())
        .unwrap();
    // Cached copy still served until cleared.
    assert!(manager.load().unwrap().unwrap().pointer("/mcpServers/new").is_none());
    manager.clear_cache();
    assert!(manager.load().unwrap().unwrap().pointer("/mcpServers/new").is_some());
}
