// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-repository credential injection.
//!
//! Operators map repositories to secret files in a YAML list; matching
//! files are copied into the worktree after provisioning so the agent finds
//! them where the project expects (e.g. `.env`).
//!
//! ```yaml
//! - repo_url: https://github.com/acme/app
//!   source: /secrets/acme-app.env
//!   dest: .env
//! ```

use kiln_core::RepoId;
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("failed to read credentials file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid credentials YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid credentials entry: {0}")]
    Invalid(String),
}

/// One raw mapping entry.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialEntry {
    pub repo_url: String,
    pub source: PathBuf,
    pub dest: String,
}

/// Loaded and validated credential mappings.
pub struct RepoCredentials {
    entries: Vec<(RepoId, CredentialEntry)>,
}

impl RepoCredentials {
    /// Load the mapping file. `Ok(None)` when the file does not exist.
    pub fn load(path: &Path) -> Result<Option<Self>, CredentialsError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let raw: Vec<CredentialEntry> = serde_yaml::from_str(&content)?;

        let mut entries = Vec::with_capacity(raw.len());
        for entry in raw {
            let repo = RepoId::from_url(&entry.repo_url).map_err(|e| {
                CredentialsError::Invalid(format!("{}: {e}", entry.repo_url))
            })?;
            validate_dest(&entry.dest)?;
            if !entry.source.is_absolute() {
                return Err(CredentialsError::Invalid(format!(
                    "source must be absolute: {}",
                    entry.source.display()
                )));
            }
            entries.push((repo, entry));
        }
        Ok(Some(Self { entries }))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Copy every mapped file for `repo` into `worktree`.
    ///
    /// Missing source files are skipped with a warning rather than failing
    /// the whole stage.
    pub fn copy_into_worktree(
        &self,
        repo: &RepoId,
        worktree: &Path,
    ) -> Result<Vec<PathBuf>, CredentialsError> {
        let mut copied = Vec::new();
        for (entry_repo, entry) in &self.entries {
            if entry_repo != repo {
                continue;
            }
            if !entry.source.is_file() {
                tracing::warn!(
                    source = %entry.source.display(),
                    %repo,
                    "credential source missing; skipping"
                );
                continue;
            }
            let dest = worktree.join(&entry.dest);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&entry.source, &dest)?;
            tracing::info!(dest = %dest.display(), %repo, "injected credential file");
            copied.push(dest);
        }
        Ok(copied)
    }
}

/// Destinations stay inside the worktree: relative, no parent traversal.
fn validate_dest(dest: &str) -> Result<(), CredentialsError> {
    let path = Path::new(dest);
    if path.is_absolute() {
        return Err(CredentialsError::Invalid(format!("dest must be relative: {dest}")));
    }
    if path.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(CredentialsError::Invalid(format!("dest must not contain '..': {dest}")));
    }
    if dest.is_empty() {
        return Err(CredentialsError::Invalid("dest must not be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
