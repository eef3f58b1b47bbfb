/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `connect`    - Authorize a Spotify account (PKCE) and store its tokens
- `refresh`    - Refresh an expired access token
- `status`     - Show the stored connection
- `disconnect` - Mark the account disconnected and clear its tokens, or
  remove the record with `--forget`

Every handler builds a [`ConnectionOrchestrator`] from the loaded
configuration and restores the stored credential before acting.
*/

use std::sync::Arc;

use colored::Colorize;

use crate::backend::{
    DocumentStore, IdentityProvider, JsonFileDocumentStore, MemoryDocumentStore, StaticIdentity,
};
use crate::config::{Config, StoreBackend};
use crate::error::{AuthError, Result, WejayError};
use crate::spotify::auth::{
    ConnectionOrchestrator, ConnectionState, CredentialStore, DocumentCredentialStore,
    KeyringCredentialStore, ProfileClient, SessionLauncher, TokenCredential, TokenExchangeClient,
    UserAgent,
};
use crate::spotify::build_http_client;

pub mod console;

pub use console::ConsoleUserAgent;

/// Builds the credential store selected by `config.store.backend`.
///
/// # Errors
///
/// Returns [`WejayError::Config`] when the file backend has no resolvable
/// path.
pub fn build_credential_store(config: &Config) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.store.backend {
        StoreBackend::Keyring => Arc::new(KeyringCredentialStore),
        StoreBackend::File => {
            let path = config.store.resolved_path()?;
            tracing::debug!(path = %path.display(), "Using JSON document store");
            let documents: Arc<dyn DocumentStore> = Arc::new(JsonFileDocumentStore::new(path));
            Arc::new(DocumentCredentialStore::new(documents))
        }
        StoreBackend::Memory => {
            let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
            Arc::new(DocumentCredentialStore::new(documents))
        }
    };
    Ok(store)
}

/// Wires an orchestrator from configuration.
///
/// # Errors
///
/// Returns [`WejayError::Config`] for an unusable redirect URI, store path,
/// or HTTP client.
pub fn build_orchestrator(
    config: &Config,
    agent: Arc<dyn UserAgent>,
) -> Result<ConnectionOrchestrator> {
    let http = build_http_client(&config.spotify)?;
    let identity: Arc<dyn IdentityProvider> =
        Arc::new(StaticIdentity::new(config.identity.user_id.clone()));

    Ok(ConnectionOrchestrator::new(
        &config.spotify,
        identity,
        SessionLauncher::new(agent, config.spotify.callback_scheme()?),
        Arc::new(TokenExchangeClient::new(http.clone(), &config.spotify)),
        Arc::new(ProfileClient::new(http, config.spotify.profile_endpoint())),
        build_credential_store(config)?,
    ))
}

fn user_label(config: &Config) -> String {
    config
        .identity
        .user_id
        .clone()
        .unwrap_or_else(|| "<none>".to_string())
}

fn state_label(state: ConnectionState) -> colored::ColoredString {
    let label = state.to_string();
    match state {
        ConnectionState::Connected => label.green(),
        ConnectionState::Expired | ConnectionState::Refreshing => label.yellow(),
        ConnectionState::Connecting => label.cyan(),
        ConnectionState::Disconnected => label.red(),
    }
}

fn describe(credential: &TokenCredential) -> String {
    format!(
        "{} ({})",
        credential.short_display_name(),
        credential.provider_user_id
    )
}

/// Connect command handler.
pub mod connect {
    use super::*;

    /// Runs the authorization flow on the console.
    ///
    /// Ctrl-C while waiting for the redirect cancels the attempt.
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `open_browser` - Whether to launch the system browser
    pub async fn run_connect(config: Config, open_browser: bool) -> Result<()> {
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(open_browser));
        run_connect_with_agent(config, agent).await
    }

    /// [`run_connect`] with an explicit user agent.
    pub async fn run_connect_with_agent(config: Config, agent: Arc<dyn UserAgent>) -> Result<()> {
        let orchestrator = Arc::new(build_orchestrator(&config, agent)?);

        let interrupt = tokio::spawn({
            let orchestrator = Arc::clone(&orchestrator);
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    orchestrator.dismiss();
                }
            }
        });
        let result = orchestrator.connect().await;
        interrupt.abort();

        match result {
            Ok(credential) => {
                println!(
                    "{}",
                    format!("Connected Spotify account {}", describe(&credential)).green()
                );
                println!("Access token expires at {}", credential.expires_at);
                Ok(())
            }
            Err(AuthError::AuthCancelled) => {
                eprintln!("{}", "Authorization cancelled".yellow());
                Err(WejayError::Auth(AuthError::AuthCancelled).into())
            }
            Err(e) => {
                eprintln!("{}", format!("Spotify connection failed: {}", e).red());
                Err(WejayError::Auth(e).into())
            }
        }
    }
}

/// Refresh command handler.
pub mod refresh {
    use super::*;

    /// Restores the stored credential and refreshes it if expired.
    pub async fn run_refresh(config: Config) -> Result<()> {
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        let orchestrator = build_orchestrator(&config, agent)?;

        let before = orchestrator.load().await.map_err(WejayError::Auth)?;
        if let Err(e) = orchestrator.refresh_if_needed().await {
            eprintln!("{}", format!("Refresh failed: {}", e).red());
            return Err(WejayError::Auth(e).into());
        }

        let after = orchestrator.state();
        match (before, after) {
            (ConnectionState::Expired, ConnectionState::Connected) => {
                println!("{}", "Access token refreshed".green())
            }
            (_, ConnectionState::Connected) => println!("Access token still valid"),
            _ => println!("No connected Spotify account for {}", user_label(&config)),
        }
        if let Some(credential) = orchestrator.credential().await {
            println!("Access token expires at {}", credential.expires_at);
        }
        Ok(())
    }
}

/// Status command handler.
pub mod status {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::Serialize;

    /// Machine-readable status report.
    #[derive(Debug, Serialize)]
    pub struct StatusReport {
        pub user_id: Option<String>,
        pub state: ConnectionState,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub spotify_user_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub display_name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub email: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub scope: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub expires_at: Option<DateTime<Utc>>,
        pub has_refresh_token: bool,
    }

    impl StatusReport {
        pub fn new(
            user_id: Option<String>,
            state: ConnectionState,
            credential: Option<&TokenCredential>,
        ) -> Self {
            Self {
                user_id,
                state,
                spotify_user_id: credential.map(|c| c.provider_user_id.clone()),
                display_name: credential.and_then(|c| c.display_name.clone()),
                email: credential.and_then(|c| c.email.clone()),
                scope: credential.map(|c| c.scope.clone()),
                expires_at: credential.map(|c| c.expires_at),
                has_refresh_token: credential
                    .is_some_and(|c| c.usable_refresh_token().is_some()),
            }
        }
    }

    /// Prints the stored connection.
    pub async fn run_status(config: Config, json: bool) -> Result<()> {
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        let orchestrator = build_orchestrator(&config, agent)?;
        let state = orchestrator.load().await.map_err(WejayError::Auth)?;
        let credential = orchestrator.credential().await;
        let report = StatusReport::new(config.identity.user_id.clone(), state, credential.as_ref());

        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{:<14} {}", "User:".bold(), user_label(&config));
        println!("{:<14} {}", "Spotify:".bold(), state_label(state));
        if let Some(credential) = &credential {
            println!("{:<14} {}", "Account:".bold(), describe(credential));
            if let Some(email) = &credential.email {
                println!("{:<14} {}", "Email:".bold(), email);
            }
            println!("{:<14} {}", "Expires:".bold(), credential.expires_at);
            println!("{:<14} {}", "Scope:".bold(), credential.scope);
        }
        Ok(())
    }
}

/// Disconnect command handler.
pub mod disconnect {
    use super::*;

    /// Marks the stored account disconnected, or with `forget` removes the
    /// record entirely.
    pub async fn run_disconnect(config: Config, forget: bool) -> Result<()> {
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        let orchestrator = build_orchestrator(&config, agent)?;
        if forget {
            orchestrator.forget().await.map_err(WejayError::Auth)?;
            println!(
                "{}",
                format!("Removed Spotify account record for {}", user_label(&config)).green()
            );
        } else {
            orchestrator.disconnect().await.map_err(WejayError::Auth)?;
            println!(
                "{}",
                format!("Disconnected Spotify account for {}", user_label(&config)).green()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{sample_credential, temp_dir};

    fn memory_config(user: Option<&str>) -> Config {
        let mut config = Config::default();
        config.store.backend = StoreBackend::Memory;
        config.identity.user_id = user.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn test_build_orchestrator_starts_disconnected() {
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        let orchestrator = build_orchestrator(&memory_config(Some("u1")), agent).unwrap();
        assert_eq!(orchestrator.state(), ConnectionState::Disconnected);
        assert_eq!(orchestrator.load().await.unwrap(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_build_orchestrator_rejects_bad_redirect_uri() {
        let mut config = memory_config(Some("u1"));
        config.spotify.redirect_uri = "no scheme".to_string();
        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        assert!(build_orchestrator(&config, agent).is_err());
    }

    #[tokio::test]
    async fn test_file_store_backend_reads_saved_credential() {
        let dir = temp_dir();
        let mut config = memory_config(Some("u1"));
        config.store.backend = StoreBackend::File;
        config.store.path = Some(dir.path().join("users.json"));

        let store = build_credential_store(&config).unwrap();
        store.save("u1", &sample_credential(3600)).await.unwrap();

        let agent: Arc<dyn UserAgent> = Arc::new(ConsoleUserAgent::new(false));
        let orchestrator = build_orchestrator(&config, agent).unwrap();
        assert_eq!(orchestrator.load().await.unwrap(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_status_without_user_fails() {
        let err = status::run_status(memory_config(None), true).await.unwrap_err();
        assert!(err.to_string().contains("No signed-in user"));
    }

    #[tokio::test]
    async fn test_disconnect_with_nothing_stored_succeeds() {
        disconnect::run_disconnect(memory_config(Some("u1")), false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_forget_with_nothing_stored_succeeds() {
        disconnect::run_disconnect(memory_config(Some("u1")), true)
            .await
            .unwrap();
    }

    #[test]
    fn test_status_report_from_credential() {
        let credential = sample_credential(3600);
        let report = status::StatusReport::new(
            Some("u1".to_string()),
            ConnectionState::Connected,
            Some(&credential),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["state"], "connected");
        assert_eq!(value["spotify_user_id"], "wizzler");
        assert_eq!(value["has_refresh_token"], true);
        assert!(value.get("access_token").is_none());
    }

    #[test]
    fn test_status_report_without_credential_omits_account_fields() {
        let report =
            status::StatusReport::new(Some("u1".to_string()), ConnectionState::Disconnected, None);
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["state"], "disconnected");
        assert!(value.get("spotify_user_id").is_none());
        assert_eq!(value["has_refresh_token"], false);
    }
}
