//! Spotify account connection over OAuth 2.0 authorization code + PKCE
//!
//! # Module Layout
//!
//! - [`pkce`]       -- code verifier generation and `S256` challenge derivation
//! - [`session`]    -- external user-agent session and redirect callback parsing
//! - [`exchange`]   -- token endpoint client (`authorization_code` and
//!   `refresh_token` grants)
//! - [`profile`]    -- `/v1/me` lookup used to label the connected account
//! - [`credential`] -- the persisted [`TokenCredential`](credential::TokenCredential)
//! - [`store`]      -- credential persistence against the document store or
//!   OS keyring
//! - [`connection`] -- the orchestrator exposing `connect()` and
//!   `refresh_if_needed()`

pub mod connection;
pub mod credential;
pub mod exchange;
pub mod pkce;
pub mod profile;
pub mod session;
pub mod store;

pub use connection::{ConnectionOrchestrator, ConnectionState};
pub use credential::{SpotifyAccount, TokenCredential, TokenGrant};
pub use exchange::{TokenExchange, TokenExchangeClient};
pub use pkce::PkcePair;
pub use profile::{ProfileClient, ProfileLookup, SpotifyUserProfile};
pub use session::{SessionHandle, SessionLauncher, UserAgent};
pub use store::{CredentialStore, DocumentCredentialStore, KeyringCredentialStore};
