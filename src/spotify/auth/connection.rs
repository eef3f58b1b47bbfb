//! Connection orchestrator
//!
//! [`ConnectionOrchestrator`] owns the in-memory [`TokenCredential`] for the
//! signed-in user and drives it through its lifecycle:
//!
//! ```text
//!                connect()                  code exchanged + saved
//! Disconnected ------------> Connecting --------------------------> Connected
//!      ^                        |                                      |
//!      |        any failure     |                       expires_at <= now
//!      +------------------------+                                      v
//!      |                                     refresh_if_needed()    Expired
//!      +-- no refresh token --------------------------------------------+
//!                                                                       |
//!                         Connected <---- saved ---- Refreshing <-------+
//! ```
//!
//! Reads go through the [`CredentialStore`] on [`load`](ConnectionOrchestrator::load);
//! every mutation is written through before it is mirrored in memory.
//!
//! At most one of `connect`, `refresh_if_needed`, `load`, and `disconnect`
//! runs at a time; an overlapping call fails with
//! [`AuthError::OperationInProgress`] instead of queueing.

use std::sync::Arc;

use tokio::sync::{watch, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use url::Url;

use super::credential::{SpotifyAccount, TokenCredential};
use super::exchange::TokenExchange;
use super::pkce::PkcePair;
use super::profile::ProfileLookup;
use super::session::{extract_code, SessionLauncher};
use super::store::CredentialStore;
use crate::backend::IdentityProvider;
use crate::config::SpotifyConfig;
use crate::error::AuthError;

// ---------------------------------------------------------------------------
// ConnectionState
// ---------------------------------------------------------------------------

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No usable credential
    Disconnected,
    /// An authorization attempt is running
    Connecting,
    /// A silent refresh is running
    Refreshing,
    /// A credential with an unexpired access token is held
    Connected,
    /// The held access token has expired; a refresh token may revive it
    Expired,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Refreshing => "refreshing",
            ConnectionState::Connected => "connected",
            ConnectionState::Expired => "expired",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// ConnectionOrchestrator
// ---------------------------------------------------------------------------

/// Connects a Spotify account to the signed-in WEJAY user and keeps its
/// access token fresh.
///
/// All collaborators are injected so tests can substitute doubles.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use wejay::backend::{MemoryDocumentStore, StaticIdentity};
/// use wejay::config::SpotifyConfig;
/// use wejay::spotify::auth::{
///     ConnectionOrchestrator, DocumentCredentialStore, ProfileClient, SessionLauncher,
///     TokenExchangeClient, UserAgent,
/// };
///
/// # async fn example(agent: Arc<dyn UserAgent>) -> Result<(), wejay::error::AuthError> {
/// let config = SpotifyConfig::default();
/// let http = reqwest::Client::new();
/// let orchestrator = ConnectionOrchestrator::new(
///     &config,
///     Arc::new(StaticIdentity::new(Some("user-1".to_string()))),
///     SessionLauncher::new(agent, "wejay"),
///     Arc::new(TokenExchangeClient::new(http.clone(), &config)),
///     Arc::new(ProfileClient::new(http, config.profile_endpoint())),
///     Arc::new(DocumentCredentialStore::new(Arc::new(MemoryDocumentStore::new()))),
/// );
///
/// let credential = orchestrator.connect().await?;
/// println!("connected as {}", credential.short_display_name());
/// # Ok(())
/// # }
/// ```
pub struct ConnectionOrchestrator {
    authorization_endpoint: String,
    client_id: String,
    redirect_uri: String,
    scope: String,
    identity: Arc<dyn IdentityProvider>,
    launcher: SessionLauncher,
    exchange: Arc<dyn TokenExchange>,
    profiles: Arc<dyn ProfileLookup>,
    store: Arc<dyn CredentialStore>,
    credential: RwLock<Option<TokenCredential>>,
    state: watch::Sender<ConnectionState>,
    in_flight: Mutex<()>,
    host: CancellationToken,
}

impl ConnectionOrchestrator {
    /// Creates an orchestrator in the `Disconnected` state.
    pub fn new(
        config: &SpotifyConfig,
        identity: Arc<dyn IdentityProvider>,
        launcher: SessionLauncher,
        exchange: Arc<dyn TokenExchange>,
        profiles: Arc<dyn ProfileLookup>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            authorization_endpoint: config.authorization_endpoint(),
            client_id: config.client_id.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
            identity,
            launcher,
            exchange,
            profiles,
            store,
            credential: RwLock::new(None),
            state,
            in_flight: Mutex::new(()),
            host: CancellationToken::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver that observes every state transition.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Copy of the in-memory credential, if any.
    pub async fn credential(&self) -> Option<TokenCredential> {
        self.credential.read().await.clone()
    }

    /// Tears down the host: any pending authorization session resolves as
    /// [`AuthError::AuthCancelled`], and so does every later `connect()`.
    pub fn dismiss(&self) {
        tracing::debug!("Host dismissed; cancelling authorization sessions");
        self.host.cancel();
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Spotify connection state changed");
        }
    }

    fn current_user(&self) -> Result<String, AuthError> {
        self.identity
            .current_user_id()
            .ok_or(AuthError::NoCurrentUser)
    }

    /// Builds the authorization URL for `pkce`.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidAuthorizationUrl`] if the configured endpoint does
    /// not parse.
    pub fn authorization_url(&self, pkce: &PkcePair) -> Result<Url, AuthError> {
        let mut url = Url::parse(&self.authorization_endpoint).map_err(|e| {
            AuthError::InvalidAuthorizationUrl(format!("{}: {}", self.authorization_endpoint, e))
        })?;
        if url.cannot_be_a_base() {
            return Err(AuthError::InvalidAuthorizationUrl(
                self.authorization_endpoint.clone(),
            ));
        }

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scope)
            .append_pair("code_challenge_method", pkce.method())
            .append_pair("code_challenge", pkce.challenge());
        Ok(url)
    }

    /// Restores the signed-in user's credential from the store.
    ///
    /// Resolves to `Connected`, `Expired`, or `Disconnected` (no record, or a
    /// record marked disconnected).
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationInProgress`] while another operation runs
    /// - [`AuthError::NoCurrentUser`] when nobody is signed in
    /// - [`AuthError::Store`] when the record cannot be read
    pub async fn load(&self) -> Result<ConnectionState, AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::OperationInProgress)?;
        let user_id = self.current_user()?;

        let stored = self
            .store
            .load(&user_id)
            .await?
            .filter(|credential| credential.is_connected);

        let next = match &stored {
            None => ConnectionState::Disconnected,
            Some(credential) if credential.is_expired() => ConnectionState::Expired,
            Some(_) => ConnectionState::Connected,
        };
        *self.credential.write().await = stored;
        self.set_state(next);
        Ok(next)
    }

    /// Runs the full authorization flow and persists the resulting
    /// credential.
    ///
    /// Permitted in any state except while another operation runs; calling
    /// it while connected re-authorizes.  On failure the state returns to
    /// `Disconnected`, the in-memory credential is dropped, and nothing is
    /// written to the store.
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationInProgress`] while another operation runs
    /// - [`AuthError::NoCurrentUser`] when nobody is signed in
    /// - any failure of the attempt itself: `InvalidAuthorizationUrl`,
    ///   `AuthCancelled`, `AuthDenied`, `MissingAuthorizationCode`,
    ///   `TokenExchangeFailed`, `ProfileFetchFailed`, `Store`
    pub async fn connect(&self) -> Result<TokenCredential, AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::OperationInProgress)?;
        let user_id = self.current_user()?;

        self.set_state(ConnectionState::Connecting);
        match self.authorize(&user_id).await {
            Ok(credential) => {
                *self.credential.write().await = Some(credential.clone());
                self.set_state(ConnectionState::Connected);
                tracing::info!(
                    user_id = %user_id,
                    spotify_user = %credential.provider_user_id,
                    "Spotify account connected"
                );
                Ok(credential)
            }
            Err(e) => {
                *self.credential.write().await = None;
                self.set_state(ConnectionState::Disconnected);
                tracing::warn!(user_id = %user_id, error = %e, "Spotify connection failed");
                Err(e)
            }
        }
    }

    async fn authorize(&self, user_id: &str) -> Result<TokenCredential, AuthError> {
        let pkce = PkcePair::generate();
        let url = self.authorization_url(&pkce)?;

        let session = self
            .launcher
            .launch_with_token(url, self.host.child_token())?;
        let redirect = session.wait().await?;
        let code = extract_code(&redirect)?;

        let grant = self.exchange.exchange_code(&code, pkce.verifier()).await?;
        drop(pkce);

        let profile = self.profiles.current_user(&grant.access_token).await?;
        let credential = TokenCredential::new(grant, SpotifyAccount::from(&profile), &self.scope);

        self.store.save(user_id, &credential).await?;
        Ok(credential)
    }

    /// Refreshes the access token when it has expired.
    ///
    /// A no-op (no network traffic) when there is no connected credential or
    /// its `expires_at` is still in the future.
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationInProgress`] while another operation runs
    /// - [`AuthError::RefreshTokenMissing`] when the credential has no
    ///   refresh token; the state drops to `Disconnected` and the stored
    ///   record is marked disconnected
    /// - [`AuthError::TokenExchangeFailed`] / [`AuthError::Store`] when the
    ///   refresh fails; the state stays `Expired`
    pub async fn refresh_if_needed(&self) -> Result<(), AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::OperationInProgress)?;

        let mut credential = match self.credential.read().await.clone() {
            Some(credential) if credential.is_connected => credential,
            _ => return Ok(()),
        };
        if !credential.is_expired() {
            return Ok(());
        }

        self.set_state(ConnectionState::Expired);
        let user_id = self.current_user()?;

        let Some(refresh_token) = credential.usable_refresh_token().map(str::to_string) else {
            tracing::warn!(user_id = %user_id, "Access token expired without a refresh token");
            credential.is_connected = false;
            if let Err(e) = self.store.save(&user_id, &credential).await {
                tracing::warn!(error = %e, "Failed to mark Spotify record disconnected");
            }
            *self.credential.write().await = None;
            self.set_state(ConnectionState::Disconnected);
            return Err(AuthError::RefreshTokenMissing);
        };

        self.set_state(ConnectionState::Refreshing);
        let result = match self.exchange.refresh(&refresh_token).await {
            Ok(grant) => {
                credential.apply_refresh(grant);
                self.store
                    .save(&user_id, &credential)
                    .await
                    .map(|()| credential)
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(credential) => {
                *self.credential.write().await = Some(credential);
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Spotify token refresh failed");
                self.set_state(ConnectionState::Expired);
                Err(e)
            }
        }
    }

    /// Returns a valid access token, refreshing first if needed.
    ///
    /// `Ok(None)` when no account is connected.
    pub async fn access_token(&self) -> Result<Option<String>, AuthError> {
        self.refresh_if_needed().await?;
        Ok(self
            .credential
            .read()
            .await
            .as_ref()
            .filter(|credential| credential.is_connected)
            .map(|credential| credential.access_token.clone()))
    }

    /// Disconnects the account: the stored record is marked disconnected with
    /// its tokens cleared.
    ///
    /// Disconnecting when nothing is stored succeeds.
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationInProgress`] while another operation runs
    /// - [`AuthError::NoCurrentUser`] when nobody is signed in
    /// - [`AuthError::Store`] when the record cannot be read or written
    pub async fn disconnect(&self) -> Result<(), AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::OperationInProgress)?;
        let user_id = self.current_user()?;

        let current = match self.credential.read().await.clone() {
            Some(credential) => Some(credential),
            None => self.store.load(&user_id).await?,
        };
        if let Some(credential) = current {
            self.store
                .save(&user_id, &credential.into_disconnected())
                .await?;
        }

        *self.credential.write().await = None;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(user_id = %user_id, "Spotify account disconnected");
        Ok(())
    }

    /// Removes the stored record entirely, account identity included.
    ///
    /// # Errors
    ///
    /// - [`AuthError::OperationInProgress`] while another operation runs
    /// - [`AuthError::NoCurrentUser`] when nobody is signed in
    /// - [`AuthError::Store`] when the record cannot be removed
    pub async fn forget(&self) -> Result<(), AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::OperationInProgress)?;
        let user_id = self.current_user()?;

        self.store.delete(&user_id).await?;
        *self.credential.write().await = None;
        self.set_state(ConnectionState::Disconnected);
        tracing::info!(user_id = %user_id, "Spotify account record removed");
        Ok(())
    }
}

impl std::fmt::Debug for ConnectionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionOrchestrator")
            .field("state", &self.state())
            .field("client_id", &self.client_id)
            .field("redirect_uri", &self.redirect_uri)
            .finish_non_exhaustive()
    }
}
