//! Shared fixtures for the integration tests.

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;
use url::Url;

use wejay::config::SpotifyConfig;
use wejay::error::AuthError;
use wejay::spotify::auth::UserAgent;

/// Spotify configuration pointing both base URLs at `server_uri`.
#[allow(dead_code)]
pub fn spotify_config(server_uri: &str) -> SpotifyConfig {
    SpotifyConfig {
        client_id: "test-client-id".to_string(),
        accounts_base: server_uri.to_string(),
        api_base: server_uri.to_string(),
        timeout_seconds: 5,
        ..SpotifyConfig::default()
    }
}

/// Token endpoint success body.
#[allow(dead_code)]
pub fn token_body(access_token: &str, refresh_token: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "access_token": access_token,
        "token_type": "Bearer",
        "scope": "user-read-private user-read-email",
        "expires_in": 3600
    });
    if let Some(refresh_token) = refresh_token {
        body["refresh_token"] = serde_json::Value::String(refresh_token.to_string());
    }
    body
}

/// `/v1/me` success body.
#[allow(dead_code)]
pub fn profile_body() -> serde_json::Value {
    serde_json::json!({
        "id": "wizzler",
        "display_name": "Maya Ody-Ajike",
        "email": "maya@example.com",
        "images": [{"url": "https://i.scdn.co/image/abc", "height": 64, "width": 64}]
    })
}

/// User agent that immediately "redirects" to a fixed URL and records the
/// authorization URL it was shown.
#[allow(dead_code)]
pub struct ScriptedAgent {
    redirect: String,
    pub shown: std::sync::Mutex<Vec<Url>>,
}

#[allow(dead_code)]
impl ScriptedAgent {
    pub fn redirecting_to(redirect: &str) -> Self {
        Self {
            redirect: redirect.to_string(),
            shown: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn last_shown(&self) -> Option<Url> {
        self.shown.lock().expect("poisoned").last().cloned()
    }
}

#[async_trait]
impl UserAgent for ScriptedAgent {
    async fn open(&self, authorization_url: &Url, _callback_scheme: &str) -> Result<Url, AuthError> {
        self.shown
            .lock()
            .expect("poisoned")
            .push(authorization_url.clone());
        Url::parse(&self.redirect).map_err(|_| AuthError::AuthCancelled)
    }
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
