// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Issue comments and reactions as seen through the backend adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One issue comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Opaque handle used for reactions and edits (GraphQL node id).
    pub handle: String,
    /// Stable numeric database id, used for REST endpoints.
    pub db_id: u64,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// None when the authoring account has been deleted.
    pub author: Option<String>,
    /// The engine already reacted with THUMBS_UP (applied in a prior run).
    pub processed: bool,
    /// The engine already reacted with EYES (in flight, possibly from a
    /// crashed run).
    pub in_flight: bool,
}

/// Reactions the engine places on comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    Eyes,
    ThumbsUp,
    ThumbsDown,
}

impl Reaction {
    /// Content string for the REST reactions endpoint.
    pub fn rest_content(&self) -> &'static str {
        match self {
            Reaction::Eyes => "eyes",
            Reaction::ThumbsUp => "+1",
            Reaction::ThumbsDown => "-1",
        }
    }

    /// Content name in GraphQL reaction groups.
    pub fn graphql_content(&self) -> &'static str {
        match self {
            Reaction::Eyes => "EYES",
            Reaction::ThumbsUp => "THUMBS_UP",
            Reaction::ThumbsDown => "THUMBS_DOWN",
        }
    }
}

#[cfg(test)]
#[path = "comment_tests.rs"]
mod tests;
