// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn client() -> OAuthClient {
    OAuthClient::new(OAuthConfig {
        tenant_id: "tenant".into(),
        client_id: "client".into(),
        username: "svc@example.com".into(),
        password: "hunter2".into(),
        scope: None,
    })
}

#[tokio::test]
async fn fresh_client_has_no_token() {
    assert!(!client().has_token().await);
}

#[tokio::test]
async fn cached_token_is_returned_while_valid() {
    let client = client();
    client.set_token_for_test("tok-1", Duration::from_secs(3600)).await;
    assert!(client.has_token().await);
    assert_eq!(client.get_token().await.unwrap(), "tok-1");
}

#[tokio::test]
async fn token_near_expiry_is_not_considered_valid() {
    let client = client();
    // Inside the five-minute refresh buffer.
    client.set_token_for_test("tok-1", Duration::from_secs(60)).await;
    assert!(!client.has_token().await);
}

#[tokio::test]
async fn clear_token_forces_remint() {
    let client = client();
    client.set_token_for_test("tok-1", Duration::from_secs(3600)).await;
    client.clear_token().await;
    assert!(!client.has_token().await);
}
