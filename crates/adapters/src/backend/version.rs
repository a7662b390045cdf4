// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend version variants and their capabilities.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The backend flavor serving a given host.
///
/// `Dotcom` and `Enterprise318` share their GraphQL documents; older
/// enterprise versions lose features one by one and the adapter substitutes
/// the documented fallback query for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendVersion {
    Dotcom,
    Enterprise318,
    Enterprise317,
    Enterprise315,
    Enterprise314,
}

impl BackendVersion {
    /// Parse an operator-supplied version string (`"3.18"`, `"3.15"`, ...).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "" | "dotcom" | "github.com" => Some(BackendVersion::Dotcom),
            "3.18" => Some(BackendVersion::Enterprise318),
            "3.17" => Some(BackendVersion::Enterprise317),
            "3.15" | "3.16" => Some(BackendVersion::Enterprise315),
            "3.14" => Some(BackendVersion::Enterprise314),
            _ => None,
        }
    }

    /// Sub-issue (parent/child) queries exist from 3.18 on.
    pub fn supports_sub_issues(&self) -> bool {
        matches!(self, BackendVersion::Dotcom | BackendVersion::Enterprise318)
    }

    /// `closedByPullRequestsReferences` exists from 3.18 on; older versions
    /// scan the timeline and match closing keywords instead.
    pub fn supports_linked_prs_first_class(&self) -> bool {
        matches!(self, BackendVersion::Dotcom | BackendVersion::Enterprise318)
    }

    /// Project status timeline events exist from 3.17 on.
    pub fn supports_status_actor_check(&self) -> bool {
        !matches!(self, BackendVersion::Enterprise315 | BackendVersion::Enterprise314)
    }
}

impl fmt::Display for BackendVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendVersion::Dotcom => write!(f, "GitHub"),
            BackendVersion::Enterprise318 => write!(f, "GitHub Enterprise 3.18"),
            BackendVersion::Enterprise317 => write!(f, "GitHub Enterprise 3.17"),
            BackendVersion::Enterprise315 => write!(f, "GitHub Enterprise 3.15"),
            BackendVersion::Enterprise314 => write!(f, "GitHub Enterprise 3.14"),
        }
    }
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
