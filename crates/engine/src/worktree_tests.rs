// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

#[test]
fn path_layout_is_repo_short_and_issue() {
    let worktrees = GitWorktrees::new(PathBuf::from("/work"));
    let repo = RepoId::new("github.com", "acme", "app");
    assert_eq!(worktrees.path_for(&repo, 42), PathBuf::from("/work/app-issue-42"));
}

#[test]
fn same_issue_number_on_other_repo_gets_own_path() {
    let worktrees = GitWorktrees::new(PathBuf::from("/work"));
    let a = worktrees.path_for(&RepoId::new("github.com", "acme", "app"), 42);
    let b = worktrees.path_for(&RepoId::new("github.com", "acme", "web"), 42);
    assert_ne!(a, b);
}

#[test]
fn recorded_head_round_trips() {
    let dir = tempdir().unwrap();
    assert!(recorded_head(dir.path()).is_none());
    record_head(dir.path(), "abc123");
    assert_eq!(recorded_head(dir.path()).as_deref(), Some("abc123"));
}

#[test]
fn blank_head_file_reads_as_none() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join(HEAD_FILE), "  \n").unwrap();
    assert!(recorded_head(dir.path()).is_none());
}

#[tokio::test]
async fn git_purge_removes_directory_and_tolerates_absence() {
    let dir = tempdir().unwrap();
    let worktrees = GitWorktrees::new(dir.path().to_path_buf());
    let repo = RepoId::new("github.com", "acme", "app");

    let path = worktrees.path_for(&repo, 42);
    std::fs::create_dir_all(&path).unwrap();
    worktrees.purge(&repo, 42).await.unwrap();
    assert!(!path.exists());

    // Second purge is a no-op.
    worktrees.purge(&repo, 42).await.unwrap();
}

#[tokio::test]
async fn fake_worktrees_report_fresh_once() {
    let dir = tempdir().unwrap();
    let worktrees = FakeWorktrees::new(dir.path().to_path_buf());
    let repo = RepoId::new("github.com", "acme", "app");

    let first = worktrees.ensure_worktree(&repo, 42).await.unwrap();
    assert!(first.freshly_created);
    assert!(first.path.exists());

    let second = worktrees.ensure_worktree(&repo, 42).await.unwrap();
    assert!(!second.freshly_created);

    worktrees.purge(&repo, 42).await.unwrap();
    let third = worktrees.ensure_worktree(&repo, 42).await.unwrap();
    assert!(third.freshly_created);
}
