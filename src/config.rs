//! Configuration management for WEJAY
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.

use crate::error::{Result, WejayError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for WEJAY
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Spotify application registration and endpoints
    #[serde(default)]
    pub spotify: SpotifyConfig,

    /// Where connection credentials are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Local identity used to key the credential record
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Spotify application configuration
///
/// The defaults match the WEJAY application registration: a public PKCE
/// client redirected back through the `wejay://` custom scheme.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    /// OAuth client identifier issued by the Spotify developer dashboard
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Registered redirect URI; its scheme is the callback scheme
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Space-delimited capability list requested during authorization
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Base URL of the accounts service (authorize and token endpoints)
    ///
    /// Overridable so tests can point the client at a mock server.
    #[serde(default = "default_accounts_base")]
    pub accounts_base: String,

    /// Base URL of the Web API (profile lookup)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_client_id() -> String {
    "e1487454cb9148dbae59eab08533a2b4".to_string()
}

fn default_redirect_uri() -> String {
    "wejay://callback".to_string()
}

fn default_scope() -> String {
    [
        "user-read-private",
        "user-read-email",
        "playlist-read-private",
        "playlist-modify-private",
        "playlist-modify-public",
        "playlist-read-collaborative",
        "user-top-read",
    ]
    .join(" ")
}

fn default_accounts_base() -> String {
    "https://accounts.spotify.com".to_string()
}

fn default_api_base() -> String {
    "https://api.spotify.com".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
            accounts_base: default_accounts_base(),
            api_base: default_api_base(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl SpotifyConfig {
    /// Authorization endpoint (`{accounts_base}/authorize`)
    pub fn authorization_endpoint(&self) -> String {
        format!("{}/authorize", self.accounts_base.trim_end_matches('/'))
    }

    /// Token endpoint (`{accounts_base}/api/token`)
    pub fn token_endpoint(&self) -> String {
        format!("{}/api/token", self.accounts_base.trim_end_matches('/'))
    }

    /// Current-user profile endpoint (`{api_base}/v1/me`)
    pub fn profile_endpoint(&self) -> String {
        format!("{}/v1/me", self.api_base.trim_end_matches('/'))
    }

    /// Scheme of the redirect URI, e.g. `wejay` for `wejay://callback`
    ///
    /// # Errors
    ///
    /// Returns [`WejayError::Config`] when the redirect URI does not parse.
    pub fn callback_scheme(&self) -> Result<String> {
        let url = Url::parse(&self.redirect_uri)
            .map_err(|e| WejayError::Config(format!("Invalid redirect_uri: {}", e)))?;
        Ok(url.scheme().to_string())
    }
}

/// Credential persistence backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// OS keyring (Keychain, Secret Service, Credential Manager)
    #[default]
    Keyring,
    /// JSON document file on disk
    File,
    /// Process memory; nothing survives exit
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = WejayError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "keyring" => Ok(StoreBackend::Keyring),
            "file" => Ok(StoreBackend::File),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(WejayError::Config(format!(
                "Invalid store backend: {}. Must be one of: keyring, file, memory",
                other
            ))),
        }
    }
}

/// Credential store configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Backend used to persist the credential record
    #[serde(default)]
    pub backend: StoreBackend,

    /// Path of the JSON document file (file backend only)
    ///
    /// Defaults to `users.json` in the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// Resolves the document file path, falling back to the platform data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns [`WejayError::Config`] when no path is configured and the
    /// platform has no resolvable home directory.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dirs = directories::ProjectDirs::from("com", "wejay", "wejay").ok_or_else(|| {
            WejayError::Config("Unable to determine a data directory for the store".to_string())
        })?;
        Ok(dirs.data_dir().join("users.json"))
    }
}

/// Local identity configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IdentityConfig {
    /// Identifier of the signed-in WEJAY user
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns [`WejayError::Config`] if the file exists but cannot be read
    /// or parsed.
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WejayError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| WejayError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(client_id) = std::env::var("WEJAY_SPOTIFY_CLIENT_ID") {
            self.spotify.client_id = client_id;
        }

        if let Ok(redirect_uri) = std::env::var("WEJAY_SPOTIFY_REDIRECT_URI") {
            self.spotify.redirect_uri = redirect_uri;
        }

        if let Ok(scope) = std::env::var("WEJAY_SPOTIFY_SCOPE") {
            self.spotify.scope = scope;
        }

        if let Ok(accounts_base) = std::env::var("WEJAY_SPOTIFY_ACCOUNTS_BASE") {
            tracing::debug!(accounts_base = %accounts_base, "Env override: WEJAY_SPOTIFY_ACCOUNTS_BASE");
            self.spotify.accounts_base = accounts_base;
        }

        if let Ok(api_base) = std::env::var("WEJAY_SPOTIFY_API_BASE") {
            tracing::debug!(api_base = %api_base, "Env override: WEJAY_SPOTIFY_API_BASE");
            self.spotify.api_base = api_base;
        }

        if let Ok(backend) = std::env::var("WEJAY_STORE_BACKEND") {
            match backend.parse::<StoreBackend>() {
                Ok(v) => self.store.backend = v,
                Err(_) => tracing::warn!("Invalid WEJAY_STORE_BACKEND: {}", backend),
            }
        }

        if let Ok(path) = std::env::var("WEJAY_STORE_PATH") {
            self.store.path = Some(PathBuf::from(path));
        }

        if let Ok(user_id) = std::env::var("WEJAY_USER_ID") {
            self.identity.user_id = Some(user_id);
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(user) = &cli.user {
            self.identity.user_id = Some(user.clone());
        }
        if let Some(backend) = cli.store {
            self.store.backend = backend;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`WejayError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.spotify.client_id.trim().is_empty() {
            return Err(WejayError::Config("spotify.client_id cannot be empty".to_string()).into());
        }

        if self.spotify.scope.trim().is_empty() {
            return Err(WejayError::Config("spotify.scope cannot be empty".to_string()).into());
        }

        let redirect = Url::parse(&self.spotify.redirect_uri).map_err(|e| {
            WejayError::Config(format!(
                "Invalid spotify.redirect_uri '{}': {}",
                self.spotify.redirect_uri, e
            ))
        })?;
        if redirect.scheme().is_empty() {
            return Err(
                WejayError::Config("spotify.redirect_uri must have a scheme".to_string()).into(),
            );
        }

        for (name, value) in [
            ("spotify.accounts_base", &self.spotify.accounts_base),
            ("spotify.api_base", &self.spotify.api_base),
        ] {
            Url::parse(value)
                .map_err(|e| WejayError::Config(format!("Invalid {} '{}': {}", name, value, e)))?;
        }

        if self.spotify.timeout_seconds == 0 {
            return Err(WejayError::Config(
                "spotify.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
