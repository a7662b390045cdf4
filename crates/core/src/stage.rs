// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow stages.
//!
//! Each stage corresponds 1:1 to a board column. The successor column of
//! the last stage is `Done`, which carries no stage of its own.

use crate::board::Status;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of the issue workflow.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Stage {
    Research,
    Plan,
    Implement,
    Validate,
}

impl Stage {
    /// All stages in workflow order.
    pub const ALL: [Stage; 4] = [Stage::Research, Stage::Plan, Stage::Implement, Stage::Validate];

    /// The board column this stage runs in.
    pub fn column(&self) -> Status {
        match self {
            Stage::Research => Status::Research,
            Stage::Plan => Status::Plan,
            Stage::Implement => Status::Implement,
            Stage::Validate => Status::Validate,
        }
    }

    /// The column an item moves to after this stage succeeds.
    pub fn next_column(&self) -> Status {
        match self {
            Stage::Research => Status::Plan,
            Stage::Plan => Status::Implement,
            Stage::Implement => Status::Validate,
            Stage::Validate => Status::Done,
        }
    }

    /// The stage that runs for a given column, if any.
    pub fn for_status(status: &Status) -> Option<Stage> {
        match status {
            Status::Research => Some(Stage::Research),
            Status::Plan => Some(Stage::Plan),
            Status::Implement => Some(Stage::Implement),
            Status::Validate => Some(Stage::Validate),
            _ => None,
        }
    }

    /// HTML-comment token the engine embeds in its own posted comments so it
    /// can recognize them later.
    pub fn output_marker(&self) -> &'static str {
        match self {
            Stage::Research => "<!-- kiln:research -->",
            Stage::Plan => "<!-- kiln:plan -->",
            Stage::Implement => "<!-- kiln:implement -->",
            Stage::Validate => "<!-- kiln:validate -->",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Research => "research",
            Stage::Plan => "plan",
            Stage::Implement => "implement",
            Stage::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
