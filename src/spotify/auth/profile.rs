//! Current-user profile lookup (`GET /v1/me`)
//!
//! Run once per successful code exchange so the stored credential knows
//! which Spotify account it belongs to.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Deserializer};

use crate::error::AuthError;

/// Image entry of a Spotify profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotifyImage {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// The subset of `/v1/me` WEJAY uses.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SpotifyUserProfile {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Spotify sends `null` for accounts without a picture
    #[serde(default, deserialize_with = "null_as_empty")]
    pub images: Vec<SpotifyImage>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<SpotifyImage>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<SpotifyImage>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SpotifyUserProfile {
    /// URL of the first profile image, if any.
    pub fn profile_photo_url(&self) -> Option<String> {
        self.images.first().map(|image| image.url.clone())
    }

    /// See [`short_display_name`].
    pub fn short_display_name(&self) -> String {
        short_display_name(self.display_name.as_deref(), &self.id)
    }
}

/// First whitespace-separated word of `display_name`, or `"User {id}"` when
/// the display name is absent or blank.
///
/// # Examples
///
/// ```
/// use wejay::spotify::auth::profile::short_display_name;
///
/// assert_eq!(short_display_name(Some("Maya Ody-Ajike"), "wizzler"), "Maya");
/// assert_eq!(short_display_name(None, "wizzler"), "User wizzler");
/// ```
pub fn short_display_name(display_name: Option<&str>, id: &str) -> String {
    display_name
        .and_then(|name| name.split_whitespace().next())
        .map(str::to_string)
        .unwrap_or_else(|| format!("User {}", id))
}

/// Resolves the Spotify account behind an access token.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn current_user(&self, access_token: &str) -> Result<SpotifyUserProfile, AuthError>;
}

/// `reqwest` implementation of [`ProfileLookup`].
#[derive(Debug, Clone)]
pub struct ProfileClient {
    http: Client,
    endpoint: String,
}

impl ProfileClient {
    /// Creates a client for `endpoint` (normally `{api_base}/v1/me`).
    pub fn new(http: Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl ProfileLookup for ProfileClient {
    async fn current_user(&self, access_token: &str) -> Result<SpotifyUserProfile, AuthError> {
        tracing::debug!(endpoint = %self.endpoint, "Fetching Spotify profile");

        let resp = self
            .http
            .get(&self.endpoint)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthError::ProfileFetchFailed {
                status: None,
                body: e.to_string(),
            })?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), body = %body, "Spotify /v1/me error");
            return Err(AuthError::ProfileFetchFailed {
                status: Some(status.as_u16()),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, body = %body, "Undecodable Spotify profile");
            AuthError::ProfileFetchFailed {
                status: Some(status.as_u16()),
                body,
            }
        })
    }
}
