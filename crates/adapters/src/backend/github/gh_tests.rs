// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn classify_network_failure() {
    let err = classify_failure(b"dial tcp 140.82.112.6:443: connection refused", b"");
    assert!(matches!(err, BackendError::Network(_)));
}

#[test]
fn classify_auth_failure() {
    let err = classify_failure(b"HTTP 401: Bad credentials (https://api.github.com/graphql)", b"");
    assert!(matches!(err, BackendError::Auth(_)));
}

#[test]
fn classify_api_failure() {
    let err = classify_failure(b"GraphQL: Could not resolve to a Repository", b"");
    assert!(matches!(err, BackendError::Api(_)));
}

#[test]
fn classify_inspects_stdout_too() {
    // gh occasionally reports GraphQL transport errors on stdout.
    let err = classify_failure(b"", b"tls handshake timeout");
    assert!(matches!(err, BackendError::Network(_)));
}
