// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worktree provisioning.
//!
//! One working copy per `(repo, issue)` under the workspace directory,
//! always at the remote default-branch tip. A `.kiln-head` file records the
//! commit the copy was materialized at; a matching remote tip means the
//! existing copy is reused as-is.

use async_trait::async_trait;
use kiln_adapters::subprocess::{run_with_timeout, GIT_COMMAND_TIMEOUT};
use kiln_core::RepoId;
use std::path::{Path, PathBuf};
use tokio::process::Command;

const HEAD_FILE: &str = ".kiln-head";

/// Result of provisioning: the path plus whether the copy was (re)created,
/// which invalidates any stored agent session for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub path: PathBuf,
    pub freshly_created: bool,
}

/// Provisioning interface consumed by the executor and revision engine.
#[async_trait]
pub trait WorktreeManager: Send + Sync {
    fn path_for(&self, repo: &RepoId, issue_number: u64) -> PathBuf;

    /// Ensure a clean checkout of the default-branch tip exists.
    async fn ensure_worktree(&self, repo: &RepoId, issue_number: u64)
        -> Result<Worktree, String>;

    /// Delete a worktree directory if present.
    async fn purge(&self, repo: &RepoId, issue_number: u64) -> std::io::Result<()>;
}

/// Git-backed provisioner used in production.
pub struct GitWorktrees {
    workspace_dir: PathBuf,
}

impl GitWorktrees {
    pub fn new(workspace_dir: PathBuf) -> Self {
        Self { workspace_dir }
    }

    async fn remote_tip(&self, repo: &RepoId) -> Result<String, String> {
        let mut cmd = Command::new("git");
        cmd.args(["ls-remote", &repo.clone_url(), "HEAD"])
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git ls-remote")
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!(
                "git ls-remote failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        String::from_utf8_lossy(&output.stdout)
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| format!("git ls-remote returned no tip for {repo}"))
    }

    async fn clone_fresh(
        &self,
        repo: &RepoId,
        path: &Path,
        remote_tip: &str,
    ) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create workspace dir: {e}"))?;
        }
        // A stale non-git directory at the path is replaced outright.
        if path.exists() {
            tokio::fs::remove_dir_all(path)
                .await
                .map_err(|e| format!("failed to clear stale worktree: {e}"))?;
        }

        let mut cmd = Command::new("git");
        cmd.args(["clone", &repo.clone_url(), &path.display().to_string()])
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE");
        let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git clone")
            .await
            .map_err(|e| e.to_string())?;
        if !output.status.success() {
            return Err(format!(
                "git clone failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        record_head(path, remote_tip);
        tracing::info!(path = %path.display(), %repo, "cloned fresh worktree");
        Ok(())
    }

    async fn refresh(&self, path: &Path, remote_tip: &str) -> Result<(), String> {
        for args in [
            vec!["fetch", "origin"],
            vec!["reset", "--hard", "origin/HEAD"],
            vec!["clean", "-fdx"],
        ] {
            let mut cmd = Command::new("git");
            cmd.args(&args)
                .current_dir(path)
                .env_remove("GIT_DIR")
                .env_remove("GIT_WORK_TREE");
            let output = run_with_timeout(cmd, GIT_COMMAND_TIMEOUT, "git refresh")
                .await
                .map_err(|e| e.to_string())?;
            if !output.status.success() {
                return Err(format!(
                    "git {} failed: {}",
                    args.join(" "),
                    String::from_utf8_lossy(&output.stderr).trim()
                ));
            }
        }
        record_head(path, remote_tip);
        tracing::info!(path = %path.display(), "refreshed worktree to remote tip");
        Ok(())
    }
}

#[async_trait]
impl WorktreeManager for GitWorktrees {
    fn path_for(&self, repo: &RepoId, issue_number: u64) -> PathBuf {
        self.workspace_dir.join(format!("{}-issue-{}", repo.short(), issue_number))
    }

    async fn ensure_worktree(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Worktree, String> {
        let path = self.path_for(repo, issue_number);
        let remote_tip = self.remote_tip(repo).await?;

        if path.join(".git").exists() {
            if recorded_head(&path).as_deref() == Some(remote_tip.as_str()) {
                tracing::debug!(path = %path.display(), "worktree up to date");
                return Ok(Worktree { path, freshly_created: false });
            }
            self.refresh(&path, &remote_tip).await?;
            return Ok(Worktree { path, freshly_created: true });
        }

        self.clone_fresh(repo, &path, &remote_tip).await?;
        Ok(Worktree { path, freshly_created: true })
    }

    async fn purge(&self, repo: &RepoId, issue_number: u64) -> std::io::Result<()> {
        let path = self.path_for(repo, issue_number);
        if path.exists() {
            tokio::fs::remove_dir_all(&path).await?;
        }
        Ok(())
    }
}

fn recorded_head(path: &Path) -> Option<String> {
    std::fs::read_to_string(path.join(HEAD_FILE))
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn record_head(path: &Path, tip: &str) {
    if let Err(e) = std::fs::write(path.join(HEAD_FILE), tip) {
        tracing::warn!(error = %e, "failed to record worktree head");
    }
}

/// Directory-only provisioner for tests: no git, no network.
#[cfg(any(test, feature = "test-support"))]
pub struct FakeWorktrees {
    workspace_dir: PathBuf,
    seen: parking_lot::Mutex<std::collections::HashSet<String>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeWorktrees {
    pub fn new(workspace_dir: PathBuf) -> Self {
        Self { workspace_dir, seen: parking_lot::Mutex::new(Default::default()) }
    }

    /// Make the next ensure for this issue report a fresh copy.
    pub fn mark_stale(&self, repo: &RepoId, issue_number: u64) {
        self.seen.lock().remove(&format!("{repo}#{issue_number}"));
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl WorktreeManager for FakeWorktrees {
    fn path_for(&self, repo: &RepoId, issue_number: u64) -> PathBuf {
        self.workspace_dir.join(format!("{}-issue-{}", repo.short(), issue_number))
    }

    async fn ensure_worktree(
        &self,
        repo: &RepoId,
        issue_number: u64,
    ) -> Result<Worktree, String> {
        let path = self.path_for(repo, issue_number);
        std::fs::create_dir_all(&path).map_err(|e| e.to_string())?;
        let freshly_created =
            self.seen.lock().insert(format!("{repo}#{issue_number}"));
        Ok(Worktree { path, freshly_created })
    }

    async fn purge(&self, repo: &RepoId, issue_number: u64) -> std::io::Result<()> {
        self.mark_stale(repo, issue_number);
        let path = self.path_for(repo, issue_number);
        if path.exists() {
            std::fs::remove_dir_all(&path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "worktree_tests.rs"]
mod tests;
