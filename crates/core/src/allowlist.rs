// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator-configured actor allow-list.
//!
//! Logins are compared case-insensitively, matching how the ticket backend
//! treats account names.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The set of actor logins permitted to trigger work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowList {
    logins: BTreeSet<String>,
}

impl AllowList {
    pub fn new<I, S>(logins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { logins: logins.into_iter().map(|l| l.into().to_lowercase()).collect() }
    }

    pub fn contains(&self, login: &str) -> bool {
        self.logins.contains(&login.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.logins.is_empty()
    }

    pub fn len(&self) -> usize {
        self.logins.len()
    }
}

#[cfg(test)]
#[path = "allowlist_tests.rs"]
mod tests;
