//! Credential persistence
//!
//! The orchestrator persists through the [`CredentialStore`] trait, keyed by
//! the local user id.  Two implementations exist:
//!
//! - [`DocumentCredentialStore`] writes the record into the `spotify` field
//!   of the `users/{user_id}` document, leaving the rest of the user
//!   document untouched.
//! - [`KeyringCredentialStore`] keeps the JSON-serialized record in the OS
//!   native keyring (Keychain, Secret Service, Credential Manager).

use std::sync::Arc;

use async_trait::async_trait;

use super::credential::TokenCredential;
use crate::backend::{DocumentStore, Fields};
use crate::error::AuthError;

/// Collection holding user documents.
pub const USERS_COLLECTION: &str = "users";

/// Field of the user document carrying the Spotify record.
pub const SPOTIFY_FIELD: &str = "spotify";

/// Durable owner of the [`TokenCredential`] across sessions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Writes `credential` for `user_id`, replacing any previous record.
    async fn save(&self, user_id: &str, credential: &TokenCredential) -> Result<(), AuthError>;

    /// Reads the record for `user_id`; `Ok(None)` when none was saved.
    async fn load(&self, user_id: &str) -> Result<Option<TokenCredential>, AuthError>;

    /// Removes the record for `user_id`.  Deleting a missing record succeeds.
    async fn delete(&self, user_id: &str) -> Result<(), AuthError>;
}

fn store_error(context: &str, err: impl std::fmt::Display) -> AuthError {
    AuthError::Store(format!("{}: {}", context, err))
}

// ---------------------------------------------------------------------------
// DocumentCredentialStore
// ---------------------------------------------------------------------------

/// [`CredentialStore`] over a generic [`DocumentStore`].
pub struct DocumentCredentialStore {
    documents: Arc<dyn DocumentStore>,
}

impl DocumentCredentialStore {
    pub fn new(documents: Arc<dyn DocumentStore>) -> Self {
        Self { documents }
    }

    async fn write_field(&self, user_id: &str, value: serde_json::Value) -> Result<(), AuthError> {
        let mut fields = Fields::new();
        fields.insert(SPOTIFY_FIELD.to_string(), value);
        self.documents
            .set(USERS_COLLECTION, user_id, fields, true)
            .await
            .map_err(|e| store_error("Failed to write user document", e))
    }
}

#[async_trait]
impl CredentialStore for DocumentCredentialStore {
    async fn save(&self, user_id: &str, credential: &TokenCredential) -> Result<(), AuthError> {
        let value = serde_json::to_value(credential)
            .map_err(|e| store_error("Failed to encode credential", e))?;
        self.write_field(user_id, value).await?;
        tracing::debug!(user_id, connected = credential.is_connected, "Saved Spotify credential");
        Ok(())
    }

    async fn load(&self, user_id: &str) -> Result<Option<TokenCredential>, AuthError> {
        let doc = self
            .documents
            .get(USERS_COLLECTION, user_id)
            .await
            .map_err(|e| store_error("Failed to read user document", e))?;

        match doc.and_then(|mut fields| fields.remove(SPOTIFY_FIELD)) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| store_error("Malformed spotify record", e)),
        }
    }

    async fn delete(&self, user_id: &str) -> Result<(), AuthError> {
        self.write_field(user_id, serde_json::Value::Null).await
    }
}

// ---------------------------------------------------------------------------
// KeyringCredentialStore
// ---------------------------------------------------------------------------

/// [`CredentialStore`] over the OS native keyring.
///
/// The keyring is stateless; this is a zero-field accessor that namespaces
/// entries under `wejay-spotify-{user_id}`.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringCredentialStore;

impl KeyringCredentialStore {
    fn service_name(user_id: &str) -> String {
        format!("wejay-spotify-{}", user_id)
    }

    fn entry(user_id: &str) -> Result<keyring::Entry, AuthError> {
        keyring::Entry::new(&Self::service_name(user_id), user_id)
            .map_err(|e| store_error("Keyring unavailable", e))
    }
}

#[async_trait]
impl CredentialStore for KeyringCredentialStore {
    async fn save(&self, user_id: &str, credential: &TokenCredential) -> Result<(), AuthError> {
        let json = serde_json::to_string(credential)
            .map_err(|e| store_error("Failed to encode credential", e))?;
        Self::entry(user_id)?
            .set_password(&json)
            .map_err(|e| store_error("Keyring write failed", e))
    }

    async fn load(&self, user_id: &str) -> Result<Option<TokenCredential>, AuthError> {
        match Self::entry(user_id)?.get_password() {
            Ok(json) => serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| store_error("Malformed spotify record", e)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(store_error("Keyring read failed", e)),
        }
    }

    async fn delete(&self, user_id: &str) -> Result<(), AuthError> {
        match Self::entry(user_id)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(store_error("Keyring delete failed", e)),
        }
    }
}
