//! Test utilities for WEJAY
//!
//! Fixture builders shared by the unit test modules.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use crate::spotify::auth::credential::{TokenCredential, TokenGrant};

/// Create a temporary directory for testing
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// A grant for access token `A` expiring `expires_in` seconds from now.
pub fn sample_grant(refresh_token: Option<&str>, expires_in: i64) -> TokenGrant {
    TokenGrant {
        access_token: "A".to_string(),
        token_type: "Bearer".to_string(),
        scope: Some("user-read-private user-read-email".to_string()),
        refresh_token: refresh_token.map(str::to_string),
        expires_at: Utc::now() + Duration::seconds(expires_in),
    }
}

/// A connected credential for Spotify user `wizzler` with access token `A`
/// and refresh token `R`, expiring `expires_in` seconds from now (negative
/// for an already expired token).
pub fn sample_credential(expires_in: i64) -> TokenCredential {
    TokenCredential {
        provider_user_id: "wizzler".to_string(),
        display_name: Some("Maya Ody".to_string()),
        email: Some("maya@example.com".to_string()),
        profile_photo_url: None,
        access_token: "A".to_string(),
        refresh_token: Some("R".to_string()),
        scope: "user-read-private user-read-email".to_string(),
        expires_at: Utc::now() + Duration::seconds(expires_in),
        is_connected: true,
    }
}

/// Assert that an error's display contains the expected message
pub fn assert_error_contains<E: std::fmt::Display>(err: &E, expected: &str) {
    let message = err.to_string();
    assert!(
        message.contains(expected),
        "Expected error to contain '{}', got '{}'",
        expected,
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_credential_expiry_sign() {
        assert!(!sample_credential(60).is_expired());
        assert!(sample_credential(-1).is_expired());
    }

    #[test]
    fn test_temp_dir_exists() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_assert_error_contains() {
        assert_error_contains(&"Token exchange failed (status 400)", "status 400");
    }
}
