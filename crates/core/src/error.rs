// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Network-failure detection shared by the adapters.
//!
//! The backend shells out for its API calls, so transient connectivity
//! problems surface as stderr text rather than typed errors. A small fixed
//! set of substrings separates "the network is down" (hibernate) from
//! everything else (fail the operation).

/// Substrings that mark a subprocess failure as a network problem.
const NETWORK_ERROR_MARKERS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection timed out",
    "could not resolve host",
    "no such host",
    "tls handshake timeout",
    "i/o timeout",
    "network is unreachable",
    "temporary failure in name resolution",
    "dial tcp",
    "unexpected eof",
];

/// Substrings that mark a subprocess failure as an authentication problem.
const AUTH_ERROR_MARKERS: &[&str] = &[
    "bad credentials",
    "authentication failed",
    "not logged in",
    "http 401",
    "requires authentication",
    "invalid token",
];

/// Whether stderr text from a failed backend call looks like a transient
/// network failure.
pub fn looks_like_network_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    NETWORK_ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Whether stderr text from a failed backend call looks like an
/// authentication failure.
pub fn looks_like_auth_error(text: &str) -> bool {
    let lower = text.to_lowercase();
    AUTH_ERROR_MARKERS.iter().any(|marker| lower.contains(marker))
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
