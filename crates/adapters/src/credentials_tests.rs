// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::tempdir;

fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("credentials.yaml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn missing_file_is_none() {
    let dir = tempdir().unwrap();
    assert!(RepoCredentials::load(&dir.path().join("nope.yaml")).unwrap().is_none());
}

#[test]
fn copies_matching_entries_into_worktree() {
    let dir = tempdir().unwrap();
    let secret = dir.path().join("acme-app.env");
    std::fs::write(&secret, "TOKEN=abc").unwrap();

    let config = write_config(
        dir.path(),
        &format!(
            "- repo_url: https://github.com/acme/app\n  source: {}\n  dest: .env\n",
            secret.display()
        ),
    );
    let creds = RepoCredentials::load(&config).unwrap().unwrap();

    let worktree = dir.path().join("worktree");
    std::fs::create_dir_all(&worktree).unwrap();

    let copied = creds
        .copy_into_worktree(&RepoId::new("github.com", "acme", "app"), &worktree)
        .unwrap();
    assert_eq!(copied, vec![worktree.join(".env")]);
    assert_eq!(std::fs::read_to_string(worktree.join(".env")).unwrap(), "TOKEN=abc");
}

#[test]
fn other_repos_get_nothing() {
    let dir = tempdir().unwrap();
    let secret = dir.path().join("s.env");
    std::fs::write(&secret, "x").unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "- repo_url: https://github.com/acme/app\n  source: {}\n  dest: .env\n",
            secret.display()
        ),
    );
    let creds = RepoCredentials::load(&config).unwrap().unwrap();
    let worktree = dir.path().join("worktree");
    std::fs::create_dir_all(&worktree).unwrap();

    // Same slug, different host: no credentials leak across hosts.
    let copied = creds
        .copy_into_worktree(&RepoId::new("github.example.com", "acme", "app"), &worktree)
        .unwrap();
    assert!(copied.is_empty());
}

#[test]
fn missing_source_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "- repo_url: https://github.com/acme/app\n  source: /nonexistent/secret\n  dest: .env\n",
    );
    let creds = RepoCredentials::load(&config).unwrap().unwrap();
    let worktree = dir.path().join("worktree");
    std::fs::create_dir_all(&worktree).unwrap();
    let copied = creds
        .copy_into_worktree(&RepoId::new("github.com", "acme", "app"), &worktree)
        .unwrap();
    assert!(copied.is_empty());
}

#[test]
fn rejects_absolute_dest() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "- repo_url: https://github.com/acme/app\n  source: /secrets/x\n  dest: /etc/passwd\n",
    );
    assert!(matches!(
        RepoCredentials::load(&config),
        Err(CredentialsError::Invalid(_))
    ));
}

#[test]
fn rejects_parent_traversal_dest() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "- repo_url: https://github.com/acme/app\n  source: /secrets/x\n  dest: ../outside\n",
    );
    assert!(matches!(
        RepoCredentials::load(&config),
        Err(CredentialsError::Invalid(_))
    ));
}

#[test]
fn rejects_relative_source() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "- repo_url: https://github.com/acme/app\n  source: secrets/x\n  dest: .env\n",
    );
    assert!(matches!(
        RepoCredentials::load(&config),
        Err(CredentialsError::Invalid(_))
    ));
}

#[test]
fn rejects_bad_repo_url() {
    let dir = tempdir().unwrap();
    let config = write_config(
        dir.path(),
        "- repo_url: not-a-url\n  source: /secrets/x\n  dest: .env\n",
    );
    assert!(matches!(
        RepoCredentials::load(&config),
        Err(CredentialsError::Invalid(_))
    ));
}

#[test]
fn ssh_repo_urls_are_accepted() {
    let dir = tempdir().unwrap();
    let secret = dir.path().join("s.env");
    std::fs::write(&secret, "x").unwrap();
    let config = write_config(
        dir.path(),
        &format!(
            "- repo_url: git@github.com:acme/app.git\n  source: {}\n  dest: .env\n",
            secret.display()
        ),
    );
    let creds = RepoCredentials::load(&config).unwrap().unwrap();
    assert!(!creds.is_empty());
}
