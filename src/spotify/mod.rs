//! Spotify integration
//!
//! Only account connection lives here today; Web API calls that need a
//! bearer token obtain it through
//! [`ConnectionOrchestrator::access_token`](auth::connection::ConnectionOrchestrator::access_token).

pub mod auth;

use std::time::Duration;

use reqwest::Client;

use crate::config::SpotifyConfig;
use crate::error::{Result, WejayError};

/// Builds the HTTP client shared by the token and profile clients.
///
/// # Errors
///
/// Returns [`WejayError::Config`] if the TLS backend cannot be initialised.
pub fn build_http_client(config: &SpotifyConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .user_agent(concat!("wejay/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| WejayError::Config(format!("Failed to create HTTP client: {}", e)))?;
    Ok(client)
}
