// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn layout_is_rooted_in_state_dir() {
    let paths = StatePaths::in_dir(PathBuf::from("/var/lib/kiln"));
    assert_eq!(paths.config, PathBuf::from("/var/lib/kiln/kiln.toml"));
    assert_eq!(paths.plugin_config, PathBuf::from("/var/lib/kiln/mcp.json"));
    assert_eq!(paths.credentials, PathBuf::from("/var/lib/kiln/credentials.yaml"));
    assert_eq!(paths.pid, PathBuf::from("/var/lib/kiln/kilnd.pid"));
    assert_eq!(paths.store_dir, PathBuf::from("/var/lib/kiln/store"));
    assert_eq!(paths.workspaces_dir, PathBuf::from("/var/lib/kiln/workspaces"));
}

#[test]
fn explicit_override_wins() {
    let paths = StatePaths::resolve(Some(PathBuf::from("/custom")));
    assert_eq!(paths.state_dir, PathBuf::from("/custom"));
}
