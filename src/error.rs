//! Error types for WEJAY
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! Two layers exist:
//!
//! - [`AuthError`] is the typed failure taxonomy of the Spotify connection
//!   core.  `connect()` and `refresh_if_needed()` return it directly so that
//!   callers can match on the variant (retry on `AuthCancelled`, prompt a
//!   full reconnect on `RefreshTokenMissing`, and so on).
//! - [`WejayError`] covers the surrounding application: configuration,
//!   storage backends, and I/O.  It wraps [`AuthError`] so command handlers
//!   can propagate both with `?`.

use thiserror::Error;

/// Failures produced by the Spotify connection flow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The authorization or token endpoint URL could not be constructed
    #[error("Invalid authorization URL: {0}")]
    InvalidAuthorizationUrl(String),

    /// The user dismissed the authorization session or the host tore it down
    #[error("Authorization cancelled")]
    AuthCancelled,

    /// The provider redirected back with an `error` parameter
    #[error("Authorization denied: {error}")]
    AuthDenied {
        /// Value of the `error` query parameter (e.g. `access_denied`)
        error: String,
        /// Value of the optional `error_description` query parameter
        description: Option<String>,
    },

    /// The redirect succeeded but carried no `code` parameter
    #[error("Authorization callback did not contain a code")]
    MissingAuthorizationCode,

    /// The token endpoint rejected the request or returned an undecodable body
    #[error("Token exchange failed (status {}): {body}", status_label(.status))]
    TokenExchangeFailed {
        /// HTTP status code, `None` when no response was received
        status: Option<u16>,
        /// Raw response body, or the transport error message
        body: String,
    },

    /// Silent refresh found no usable refresh token
    #[error("No refresh token available; reconnect the Spotify account")]
    RefreshTokenMissing,

    /// Another connect or refresh is already running on this orchestrator
    #[error("Another connection operation is already in progress")]
    OperationInProgress,

    /// The `/v1/me` profile lookup failed after a successful exchange
    #[error("Profile lookup failed (status {}): {body}", status_label(.status))]
    ProfileFetchFailed {
        /// HTTP status code, `None` when no response was received
        status: Option<u16>,
        /// Raw response body, or the transport error message
        body: String,
    },

    /// No local user is signed in, so there is nothing to attach the account to
    #[error("No signed-in user")]
    NoCurrentUser,

    /// The credential store failed to read or write the record
    #[error("Credential store error: {0}")]
    Store(String),
}

fn status_label(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "none".to_string(),
    }
}

impl AuthError {
    /// Returns `true` for failures the caller may retry by running `connect()`
    /// again without changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AuthError::AuthCancelled
                | AuthError::AuthDenied { .. }
                | AuthError::MissingAuthorizationCode
                | AuthError::TokenExchangeFailed { .. }
                | AuthError::ProfileFetchFailed { .. }
        )
    }
}

/// Main error type for WEJAY operations
#[derive(Error, Debug)]
pub enum WejayError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Spotify connection errors
    #[error("Spotify connection error: {0}")]
    Auth(#[from] AuthError),

    /// Document or blob storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

/// Result type alias for WEJAY application operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
