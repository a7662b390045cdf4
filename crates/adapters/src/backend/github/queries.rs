// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! GraphQL documents.
//!
//! Dotcom and GHES 3.18 share these; older fallbacks use the substitution
//! queries at the bottom instead of the first-class fields.

/// Page of items on a project board, with the fields the dispatcher needs.
pub(crate) const BOARD_ITEMS_QUERY: &str = r#"
query($owner: String!, $number: Int!, $cursor: String) {
  organization(login: $owner) {
    projectV2(number: $number) {
      items(first: 50, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
          content {
            ... on Issue {
              number
              title
              state
              stateReason
              repository { name owner { login } }
              labels(first: 50) { nodes { name } }
              comments { totalCount }
            }
          }
        }
      }
    }
  }
}
"#;

/// Same page query for user-owned boards.
pub(crate) const USER_BOARD_ITEMS_QUERY: &str = r#"
query($owner: String!, $number: Int!, $cursor: String) {
  user(login: $owner) {
    projectV2(number: $number) {
      items(first: 50, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          fieldValueByName(name: "Status") {
            ... on ProjectV2ItemFieldSingleSelectValue { name }
          }
          content {
            ... on Issue {
              number
              title
              state
              stateReason
              repository { name owner { login } }
              labels(first: 50) { nodes { name } }
              comments { totalCount }
            }
          }
        }
      }
    }
  }
}
"#;

/// Project id plus the Status field's option ids.
pub(crate) const BOARD_METADATA_QUERY: &str = r#"
query($owner: String!, $number: Int!) {
  organization(login: $owner) {
    projectV2(number: $number) {
      id
      field(name: "Status") {
        ... on ProjectV2SingleSelectField {
          id
          options { id name }
        }
      }
    }
  }
}
"#;

pub(crate) const USER_BOARD_METADATA_QUERY: &str = r#"
query($owner: String!, $number: Int!) {
  user(login: $owner) {
    projectV2(number: $number) {
      id
      field(name: "Status") {
        ... on ProjectV2SingleSelectField {
          id
          options { id name }
        }
      }
    }
  }
}
"#;

pub(crate) const UPDATE_ITEM_STATUS_MUTATION: &str = r#"
mutation($project: ID!, $item: ID!, $field: ID!, $option: String!) {
  updateProjectV2ItemFieldValue(
    input: {
      projectId: $project
      itemId: $item
      fieldId: $field
      value: { singleSelectOptionId: $option }
    }
  ) {
    projectV2Item { id }
  }
}
"#;

pub(crate) const ARCHIVE_ITEM_MUTATION: &str = r#"
mutation($project: ID!, $item: ID!) {
  archiveProjectV2Item(input: { projectId: $project, itemId: $item }) {
    item { id }
  }
}
"#;

/// Page of issue comments with the viewer's reaction state.
pub(crate) const COMMENTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      comments(first: 100, after: $cursor) {
        pageInfo { hasNextPage endCursor }
        nodes {
          id
          databaseId
          body
          createdAt
          author { login }
          reactionGroups { content viewerHasReacted }
        }
      }
    }
  }
}
"#;

/// Most recent project-status change on the issue's timeline.
pub(crate) const STATUS_ACTOR_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      timelineItems(last: 20, itemTypes: [PROJECT_V2_ITEM_STATUS_CHANGED]) {
        nodes {
          ... on ProjectV2ItemStatusChangedEvent {
            actor { login }
            createdAt
          }
        }
      }
    }
  }
}
"#;

/// Label events, newest last, for the label-actor check.
pub(crate) const LABEL_ACTOR_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      timelineItems(last: 50, itemTypes: [LABELED_EVENT]) {
        nodes {
          ... on LabeledEvent {
            actor { login }
            label { name }
            createdAt
          }
        }
      }
    }
  }
}
"#;

/// First-class linked-PR query (dotcom and GHES >= 3.18).
pub(crate) const LINKED_PRS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      closedByPullRequestsReferences(first: 20, includeClosedPrs: true) {
        nodes {
          number
          url
          body
          state
          merged
          headRefName
        }
      }
    }
  }
}
"#;

/// Timeline-scan substitute for older GHES: cross-referenced PRs, filtered
/// by closing keywords in the caller.
pub(crate) const CROSS_REFERENCED_PRS_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) {
      timelineItems(last: 50, itemTypes: [CROSS_REFERENCED_EVENT]) {
        nodes {
          ... on CrossReferencedEvent {
            source {
              ... on PullRequest {
                number
                url
                body
                state
                merged
                headRefName
              }
            }
          }
        }
      }
    }
  }
}
"#;

pub(crate) const ISSUE_BODY_QUERY: &str = r#"
query($owner: String!, $name: String!, $number: Int!) {
  repository(owner: $owner, name: $name) {
    issue(number: $number) { body }
  }
}
"#;

pub(crate) const VIEWER_QUERY: &str = r#"
query { viewer { login } }
"#;
