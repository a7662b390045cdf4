// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State-directory layout.
//!
//! Everything the daemon persists or reads by convention lives under one
//! directory (`$XDG_STATE_HOME/kiln` unless overridden):
//!
//! ```text
//! kiln.toml          operator configuration (read)
//! mcp.json           tool-plugin declarations (read)
//! credentials.yaml   per-repo secret mappings (read)
//! update-check       touched at startup
//! kilnd.pid          PID file with advisory lock
//! kilnd.log          rotated daemon log
//! store/             WAL + snapshot
//! workspaces/        per-issue worktrees
//! ```

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct StatePaths {
    pub state_dir: PathBuf,
    pub config: PathBuf,
    pub plugin_config: PathBuf,
    pub credentials: PathBuf,
    pub update_check: PathBuf,
    pub pid: PathBuf,
    pub log: PathBuf,
    pub store_dir: PathBuf,
    pub workspaces_dir: PathBuf,
}

impl StatePaths {
    /// Resolve the layout, preferring an explicit override, then
    /// `$KILN_STATE_DIR`, then the platform state directory.
    pub fn resolve(override_dir: Option<PathBuf>) -> Self {
        let state_dir = override_dir
            .or_else(|| std::env::var_os("KILN_STATE_DIR").map(PathBuf::from))
            .unwrap_or_else(default_state_dir);
        Self::in_dir(state_dir)
    }

    pub fn in_dir(state_dir: PathBuf) -> Self {
        Self {
            config: state_dir.join("kiln.toml"),
            plugin_config: state_dir.join("mcp.json"),
            credentials: state_dir.join("credentials.yaml"),
            update_check: state_dir.join("update-check"),
            pid: state_dir.join("kilnd.pid"),
            log: state_dir.join("kilnd.log"),
            store_dir: state_dir.join("store"),
            workspaces_dir: state_dir.join("workspaces"),
            state_dir,
        }
    }
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join(".local/state")))
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("kiln")
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
