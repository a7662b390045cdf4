// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OAuth token minting for downstream tool plugins.
//!
//! Azure Entra ID, resource-owner-password-credentials flow. Tokens are
//! cached and refreshed when less than five minutes of validity remain.
//! `get_token` is safe to call from any worker concurrently.

use serde::Deserialize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;

const DEFAULT_SCOPE: &str = "https://graph.microsoft.com/.default";
const EXPIRY_BUFFER: Duration = Duration::from_secs(300);
const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("token request failed: {0}")]
    Request(String),
    #[error("token endpoint returned {status}: {code}")]
    Rejected { status: u16, code: String },
}

/// Operator-supplied service-account credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub username: String,
    pub password: String,
    pub scope: Option<String>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        self.expires_at.saturating_duration_since(Instant::now()) > EXPIRY_BUFFER
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Token minter with an in-process cache.
pub struct OAuthClient {
    config: OAuthConfig,
    http: reqwest::Client,
    token: Mutex<Option<CachedToken>>,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Self {
        Self { config, http: reqwest::Client::new(), token: Mutex::new(None) }
    }

    /// A valid bearer token, minting or refreshing as needed.
    pub async fn get_token(&self) -> Result<String, OAuthError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.is_valid() {
                return Ok(token.access_token.clone());
            }
        }
        tracing::debug!("refreshing OAuth token");
        let token = self.request_token().await?;
        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    /// Drop the cached token; the next `get_token` mints a fresh one.
    pub async fn clear_token(&self) {
        *self.token.lock().await = None;
    }

    pub async fn has_token(&self) -> bool {
        self.token.lock().await.as_ref().is_some_and(CachedToken::is_valid)
    }

    async fn request_token(&self) -> Result<CachedToken, OAuthError> {
        let url = format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        );
        let scope = self.config.scope.as_deref().unwrap_or(DEFAULT_SCOPE);
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("scope", scope),
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
            ("grant_type", "password"),
        ];

        let response = self
            .http
            .post(&url)
            .form(&params)
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| OAuthError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body: TokenErrorResponse = response
                .json()
                .await
                .unwrap_or(TokenErrorResponse { error: None, error_description: None });
            let code = body
                .error_description
                .or(body.error)
                .unwrap_or_else(|| "unknown error".into());
            return Err(OAuthError::Rejected { status: status.as_u16(), code });
        }

        let body: TokenResponse =
            response.json().await.map_err(|e| OAuthError::Request(e.to_string()))?;
        Ok(CachedToken {
            access_token: body.access_token,
            expires_at: Instant::now() + Duration::from_secs(body.expires_in),
        })
    }

    #[cfg(test)]
    pub(crate) async fn set_token_for_test(&self, access_token: &str, valid_for: Duration) {
        *self.token.lock().await = Some(CachedToken {
            access_token: access_token.to_string(),
            expires_at: Instant::now() + valid_for,
        });
    }
}

#[cfg(test)]
#[path = "oauth_tests.rs"]
mod tests;
