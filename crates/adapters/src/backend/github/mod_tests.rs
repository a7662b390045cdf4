// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn parse_oauth_scopes_from_headers() {
    let response = "HTTP/2.0 200 OK\r\nX-Oauth-Scopes: repo, read:org, project\r\n\r\n{}";
    let scopes = parse_oauth_scopes(response).unwrap();
    assert!(scopes.contains("repo"));
    assert!(scopes.contains("read:org"));
    assert!(scopes.contains("project"));
}

#[test]
fn parse_oauth_scopes_missing_header_is_none() {
    // Fine-grained tokens do not advertise scopes.
    let response = "HTTP/2.0 200 OK\r\nContent-Type: application/json\r\n\r\n{}";
    assert!(parse_oauth_scopes(response).is_none());
}

#[test]
fn parse_oauth_scopes_empty_header() {
    let response = "X-OAuth-Scopes: \r\n\r\n{}";
    let scopes = parse_oauth_scopes(response).unwrap();
    assert!(scopes.is_empty());
}

#[test]
fn backend_capabilities_follow_version() {
    let backend = GithubBackend::new(HashMap::new(), BackendVersion::Enterprise315);
    assert!(!backend.supports_status_actor_check());
    assert!(!backend.supports_linked_prs_first_class());
    assert_eq!(backend.description(), "GitHub Enterprise 3.15");

    let modern = GithubBackend::new(HashMap::new(), BackendVersion::Dotcom);
    assert!(modern.supports_status_actor_check());
    assert!(modern.supports_sub_issues());
}
