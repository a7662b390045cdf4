// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    dotcom = { "dotcom", BackendVersion::Dotcom },
    latest = { "3.18", BackendVersion::Enterprise318 },
    mid = { "3.17", BackendVersion::Enterprise317 },
    old = { "3.15", BackendVersion::Enterprise315 },
    oldest = { "3.14", BackendVersion::Enterprise314 },
)]
fn parse_known_versions(input: &str, expected: BackendVersion) {
    assert_eq!(BackendVersion::parse(input), Some(expected));
}

#[test]
fn parse_rejects_unknown() {
    assert_eq!(BackendVersion::parse("2.22"), None);
}

#[test]
fn capability_matrix() {
    assert!(BackendVersion::Dotcom.supports_linked_prs_first_class());
    assert!(BackendVersion::Enterprise318.supports_linked_prs_first_class());
    assert!(!BackendVersion::Enterprise317.supports_linked_prs_first_class());

    assert!(BackendVersion::Enterprise317.supports_status_actor_check());
    assert!(!BackendVersion::Enterprise315.supports_status_actor_check());
    assert!(!BackendVersion::Enterprise314.supports_status_actor_check());

    assert!(!BackendVersion::Enterprise317.supports_sub_issues());
}
