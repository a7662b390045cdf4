// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Host-qualified repository identity.
//!
//! A repository is identified by the `host/owner/name` triple everywhere in
//! the engine. The host is part of the identity: `acme/app` on github.com
//! and `acme/app` on an enterprise host are distinct repositories.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors from parsing a repository identifier or URL.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RepoIdError {
    #[error("invalid repository identifier '{0}': expected host/owner/name")]
    InvalidTriple(String),
    #[error("unrecognized repository URL '{0}'")]
    InvalidUrl(String),
}

/// A repository identified by host, owner, and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoId {
    pub host: String,
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(
        host: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { host: host.into(), owner: owner.into(), name: name.into() }
    }

    /// Parse a `host/owner/name` triple.
    pub fn parse(s: &str) -> Result<Self, RepoIdError> {
        let mut parts = s.split('/');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(owner), Some(name), None)
                if !host.is_empty() && !owner.is_empty() && !name.is_empty() =>
            {
                Ok(Self::new(host, owner, name))
            }
            _ => Err(RepoIdError::InvalidTriple(s.to_string())),
        }
    }

    /// Parse an HTTPS or SSH clone URL into a RepoId.
    ///
    /// Accepts `https://host/owner/name`, `https://host/owner/name.git`,
    /// and `git@host:owner/name(.git)`.
    pub fn from_url(url: &str) -> Result<Self, RepoIdError> {
        let rest = if let Some(rest) = url.strip_prefix("https://") {
            rest.replace(':', "/")
        } else if let Some(rest) = url.strip_prefix("http://") {
            rest.replace(':', "/")
        } else if let Some(rest) = url.strip_prefix("git@") {
            rest.replacen(':', "/", 1)
        } else {
            return Err(RepoIdError::InvalidUrl(url.to_string()));
        };

        let trimmed = rest.trim_end_matches('/').trim_end_matches(".git");
        let parts: Vec<&str> = trimmed.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() < 3 {
            return Err(RepoIdError::InvalidUrl(url.to_string()));
        }
        // host / owner / name, ignoring any path segments between owner and
        // name is not allowed: exactly three segments expected.
        if parts.len() != 3 {
            return Err(RepoIdError::InvalidUrl(url.to_string()));
        }
        Ok(Self::new(parts[0], parts[1], parts[2]))
    }

    /// The `owner/name` pair without the host, as used in API paths.
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    /// Short name for worktree directories.
    pub fn short(&self) -> &str {
        &self.name
    }

    /// HTTPS clone URL for this repository.
    pub fn clone_url(&self) -> String {
        format!("https://{}/{}/{}.git", self.host, self.owner, self.name)
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

/// A single issue on a repository; the engine's join key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IssueKey {
    pub repo: RepoId,
    pub number: u64,
}

impl IssueKey {
    pub fn new(repo: RepoId, number: u64) -> Self {
        Self { repo, number }
    }
}

impl fmt::Display for IssueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
