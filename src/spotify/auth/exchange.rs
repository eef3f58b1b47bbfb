//! Token endpoint client
//!
//! Two grants are supported, both a single form-encoded POST to
//! `{accounts_base}/api/token`:
//!
//! | grant                | body fields                                                   |
//! |----------------------|---------------------------------------------------------------|
//! | `authorization_code` | `grant_type`, `code`, `redirect_uri`, `client_id`, `code_verifier` |
//! | `refresh_token`      | `grant_type`, `refresh_token`, `client_id`                    |
//!
//! The client never retries.  Any non-2xx status, transport failure, or body
//! that does not decode into a valid grant becomes
//! [`AuthError::TokenExchangeFailed`] carrying the raw body.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;

use super::credential::TokenGrant;
use crate::config::SpotifyConfig;
use crate::error::AuthError;

// ---------------------------------------------------------------------------
// Token endpoint response (raw deserialization)
// ---------------------------------------------------------------------------

/// Raw JSON response from the token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    #[serde(default)]
    scope: Option<String>,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

impl TokenResponse {
    /// Validates the response and pins `expires_in` to `received_at`.
    ///
    /// Returns `None` when a required field is unusable: an empty access
    /// token, a negative lifetime, or one that overflows the calendar.
    fn into_grant(self, received_at: DateTime<Utc>) -> Option<TokenGrant> {
        if self.access_token.trim().is_empty() || self.expires_in < 0 {
            return None;
        }
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| received_at.checked_add_signed(lifetime))?;
        Some(TokenGrant {
            access_token: self.access_token,
            token_type: self.token_type,
            scope: self.scope.filter(|s| !s.is_empty()),
            refresh_token: self.refresh_token.filter(|t| !t.is_empty()),
            expires_at,
        })
    }
}

// ---------------------------------------------------------------------------
// TokenExchange
// ---------------------------------------------------------------------------

/// Token endpoint operations the orchestrator depends on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenExchange: Send + Sync {
    /// Redeems an authorization code together with its PKCE verifier.
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenGrant, AuthError>;

    /// Obtains a new access token from a refresh token.
    ///
    /// The returned grant's `refresh_token` is `None` when the provider did
    /// not rotate it; callers keep the previous one.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError>;
}

// ---------------------------------------------------------------------------
// TokenExchangeClient
// ---------------------------------------------------------------------------

/// `reqwest` implementation of [`TokenExchange`].
///
/// # Examples
///
/// ```no_run
/// use wejay::config::SpotifyConfig;
/// use wejay::spotify::auth::exchange::{TokenExchange, TokenExchangeClient};
///
/// # async fn example() -> Result<(), wejay::error::AuthError> {
/// let client = TokenExchangeClient::new(reqwest::Client::new(), &SpotifyConfig::default());
/// let grant = client.refresh("AQC...").await?;
/// println!("new token expires at {}", grant.expires_at);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TokenExchangeClient {
    http: Client,
    token_endpoint: String,
    client_id: String,
    redirect_uri: String,
}

impl TokenExchangeClient {
    /// Creates a client for the token endpoint described by `config`.
    pub fn new(http: Client, config: &SpotifyConfig) -> Self {
        Self {
            http,
            token_endpoint: config.token_endpoint(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    /// Token endpoint this client posts to.
    pub fn token_endpoint(&self) -> &str {
        &self.token_endpoint
    }

    async fn post_grant(
        &self,
        grant_type: &str,
        params: &[(&str, &str)],
    ) -> Result<TokenGrant, AuthError> {
        tracing::debug!(endpoint = %self.token_endpoint, grant_type, "Posting token request");

        let resp = self
            .http
            .post(&self.token_endpoint)
            .form(params)
            .send()
            .await
            .map_err(|e| {
                tracing::warn!(grant_type, error = %e, "Token request failed");
                AuthError::TokenExchangeFailed {
                    status: None,
                    body: e.to_string(),
                }
            })?;
        let received_at = Utc::now();

        let status = resp.status();
        let body = resp.text().await.map_err(|e| AuthError::TokenExchangeFailed {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            tracing::warn!(grant_type, status = status.as_u16(), body = %body, "Token endpoint error");
            return Err(AuthError::TokenExchangeFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        let grant = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|raw| raw.into_grant(received_at));

        match grant {
            Some(grant) => {
                tracing::info!(
                    grant_type,
                    expires_at = %grant.expires_at,
                    rotated_refresh_token = grant.refresh_token.is_some(),
                    "Token grant received"
                );
                Ok(grant)
            }
            None => {
                tracing::warn!(grant_type, body = %body, "Undecodable token response");
                Err(AuthError::TokenExchangeFailed {
                    status: Some(status.as_u16()),
                    body,
                })
            }
        }
    }
}

#[async_trait]
impl TokenExchange for TokenExchangeClient {
    async fn exchange_code(&self, code: &str, verifier: &str) -> Result<TokenGrant, AuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("code_verifier", verifier),
        ];
        self.post_grant("authorization_code", &params).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, AuthError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
        ];
        self.post_grant("refresh_token", &params).await
    }
}
