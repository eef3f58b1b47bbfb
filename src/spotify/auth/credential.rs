//! Spotify token credential
//!
//! A [`TokenGrant`] is what the token endpoint hands back; a
//! [`TokenCredential`] is the persisted record, a grant joined with the
//! identity of the Spotify account it belongs to.
//!
//! The record serializes with snake_case keys and is stored as the `spotify`
//! field of the local user's document:
//!
//! ```json
//! {
//!   "id": "wizzler",
//!   "display_name": "Maya Ody",
//!   "email": "maya@example.com",
//!   "profile_photo_url": "https://i.scdn.co/image/ab67",
//!   "access_token": "BQD...",
//!   "refresh_token": "AQC...",
//!   "scope": "user-read-private user-read-email",
//!   "expires_at": "2026-10-16T18:30:00Z",
//!   "is_connected": true
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::profile::SpotifyUserProfile;

// ---------------------------------------------------------------------------
// TokenGrant
// ---------------------------------------------------------------------------

/// A validated token endpoint response.
///
/// `expires_at` is already absolute: it was computed from `expires_in` at the
/// instant the HTTP response arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Bearer token for Web API calls
    pub access_token: String,
    /// Usually `"Bearer"`
    pub token_type: String,
    /// Granted scopes; `None` when the response omitted the field
    pub scope: Option<String>,
    /// New refresh token; `None` when the response omitted the field
    pub refresh_token: Option<String>,
    /// Absolute expiry of `access_token`
    pub expires_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SpotifyAccount
// ---------------------------------------------------------------------------

/// Identity of the connected Spotify account.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpotifyAccount {
    pub provider_user_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub profile_photo_url: Option<String>,
}

impl From<&SpotifyUserProfile> for SpotifyAccount {
    fn from(profile: &SpotifyUserProfile) -> Self {
        Self {
            provider_user_id: profile.id.clone(),
            display_name: profile.display_name.clone(),
            email: profile.email.clone(),
            profile_photo_url: profile.profile_photo_url(),
        }
    }
}

// ---------------------------------------------------------------------------
// TokenCredential
// ---------------------------------------------------------------------------

/// The durable Spotify connection record for one local user.
///
/// The refresh token survives refreshes that omit one and is only cleared by
/// [`TokenCredential::into_disconnected`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCredential {
    /// Spotify user id (`/v1/me` `id`)
    #[serde(rename = "id")]
    pub provider_user_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_photo_url: Option<String>,

    pub access_token: String,

    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Space-delimited granted scopes
    #[serde(default)]
    pub scope: String,

    pub expires_at: DateTime<Utc>,

    #[serde(default = "default_connected")]
    pub is_connected: bool,
}

fn default_connected() -> bool {
    true
}

impl TokenCredential {
    /// Builds a connected credential from a fresh grant and the account it
    /// was issued for.
    ///
    /// A grant without a scope falls back to `requested_scope`.
    pub fn new(grant: TokenGrant, account: SpotifyAccount, requested_scope: &str) -> Self {
        Self {
            provider_user_id: account.provider_user_id,
            display_name: account.display_name,
            email: account.email,
            profile_photo_url: account.profile_photo_url,
            access_token: grant.access_token,
            refresh_token: grant.refresh_token,
            scope: grant.scope.unwrap_or_else(|| requested_scope.to_string()),
            expires_at: grant.expires_at,
            is_connected: true,
        }
    }

    /// Applies a refresh grant in place.
    ///
    /// New token values and expiry replace the old ones.  A grant without a
    /// refresh token or scope keeps the previous values.  The record is
    /// connected afterwards.
    pub fn apply_refresh(&mut self, grant: TokenGrant) {
        self.access_token = grant.access_token;
        self.expires_at = grant.expires_at;
        if let Some(refresh_token) = grant.refresh_token {
            self.refresh_token = Some(refresh_token);
        }
        if let Some(scope) = grant.scope {
            self.scope = scope;
        }
        self.is_connected = true;
    }

    /// Returns `true` once `expires_at` is not strictly after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// [`is_expired_at`](Self::is_expired_at) against the current clock.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// The refresh token, if present and non-empty.
    pub fn usable_refresh_token(&self) -> Option<&str> {
        self.refresh_token
            .as_deref()
            .filter(|token| !token.trim().is_empty())
    }

    /// Consumes the record and returns its disconnected form: tokens cleared,
    /// account identity kept for display.
    pub fn into_disconnected(self) -> Self {
        Self {
            access_token: String::new(),
            refresh_token: None,
            is_connected: false,
            ..self
        }
    }

    /// First word of the display name, or `"User {id}"` when there is none.
    pub fn short_display_name(&self) -> String {
        super::profile::short_display_name(self.display_name.as_deref(), &self.provider_user_id)
    }
}

impl std::fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCredential")
            .field("provider_user_id", &self.provider_user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("scope", &self.scope)
            .field("expires_at", &self.expires_at)
            .field("is_connected", &self.is_connected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn grant(refresh: Option<&str>, scope: Option<&str>, secs: i64) -> TokenGrant {
        TokenGrant {
            access_token: "A".to_string(),
            token_type: "Bearer".to_string(),
            scope: scope.map(str::to_string),
            refresh_token: refresh.map(str::to_string),
            expires_at: Utc::now() + Duration::seconds(secs),
        }
    }

    fn account() -> SpotifyAccount {
        SpotifyAccount {
            provider_user_id: "wizzler".to_string(),
            display_name: Some("Maya Ody".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_new_credential_is_connected() {
        let cred = TokenCredential::new(grant(Some("R"), Some("x"), 3600), account(), "y");
        assert!(cred.is_connected);
        assert_eq!(cred.refresh_token.as_deref(), Some("R"));
        assert_eq!(cred.scope, "x");
        assert_eq!(cred.provider_user_id, "wizzler");
    }

    #[test]
    fn test_new_credential_falls_back_to_requested_scope() {
        let cred = TokenCredential::new(grant(None, None, 3600), account(), "user-read-email");
        assert_eq!(cred.scope, "user-read-email");
    }

    #[test]
    fn test_apply_refresh_carries_over_refresh_token() {
        let mut cred = TokenCredential::new(grant(Some("R"), Some("x"), 0), account(), "x");
        let mut next = grant(None, None, 3600);
        next.access_token = "A2".to_string();
        cred.apply_refresh(next);

        assert_eq!(cred.access_token, "A2");
        assert_eq!(cred.refresh_token.as_deref(), Some("R"));
        assert_eq!(cred.scope, "x");
        assert!(!cred.is_expired());
    }

    #[test]
    fn test_apply_refresh_replaces_rotated_refresh_token() {
        let mut cred = TokenCredential::new(grant(Some("R"), None, 0), account(), "x");
        cred.apply_refresh(grant(Some("R2"), None, 3600));
        assert_eq!(cred.refresh_token.as_deref(), Some("R2"));
    }

    #[test]
    fn test_apply_refresh_reconnects() {
        let mut cred = TokenCredential::new(grant(Some("R"), None, 0), account(), "x");
        cred.is_connected = false;
        cred.apply_refresh(grant(None, None, 3600));
        assert!(cred.is_connected);
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let cred = TokenCredential::new(grant(None, None, 60), account(), "x");
        assert!(!cred.is_expired_at(cred.expires_at - Duration::seconds(1)));
        assert!(cred.is_expired_at(cred.expires_at));
    }

    #[test]
    fn test_blank_refresh_token_is_not_usable() {
        let cred = TokenCredential::new(grant(Some("  "), None, 60), account(), "x");
        assert!(cred.usable_refresh_token().is_none());
    }

    #[test]
    fn test_into_disconnected_clears_tokens() {
        let cred = TokenCredential::new(grant(Some("R"), None, 60), account(), "x");
        let cred = cred.into_disconnected();
        assert!(!cred.is_connected);
        assert!(cred.access_token.is_empty());
        assert!(cred.refresh_token.is_none());
        assert_eq!(cred.provider_user_id, "wizzler");
    }

    #[test]
    fn test_serializes_with_snake_case_document_keys() {
        let cred = TokenCredential::new(grant(Some("R"), Some("x"), 60), account(), "x");
        let value = serde_json::to_value(&cred).unwrap();
        assert_eq!(value["id"], "wizzler");
        assert_eq!(value["display_name"], "Maya Ody");
        assert_eq!(value["access_token"], "A");
        assert_eq!(value["refresh_token"], "R");
        assert_eq!(value["is_connected"], true);
        assert!(value.get("email").is_none());
    }

    #[test]
    fn test_record_without_is_connected_defaults_to_connected() {
        let value = serde_json::json!({
            "id": "wizzler",
            "access_token": "A",
            "scope": "x",
            "expires_at": "2030-01-01T00:00:00Z"
        });
        let cred: TokenCredential = serde_json::from_value(value).unwrap();
        assert!(cred.is_connected);
        assert!(cred.refresh_token.is_none());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let cred = TokenCredential::new(grant(Some("secret-r"), None, 60), account(), "x");
        let debug = format!("{:?}", cred);
        assert!(!debug.contains("secret-r"));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn test_short_display_name() {
        let cred = TokenCredential::new(grant(None, None, 60), account(), "x");
        assert_eq!(cred.short_display_name(), "Maya");
    }
}
