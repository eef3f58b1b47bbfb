//! Identity provider capability

/// Source of the currently signed-in local user.
///
/// Email/password and federated sign-in happen elsewhere; the connection
/// core only asks who is signed in so it can key the credential record.
pub trait IdentityProvider: Send + Sync {
    /// Returns the signed-in user's id, or `None` when nobody is signed in.
    fn current_user_id(&self) -> Option<String>;
}

/// Identity fixed at construction time.
///
/// The CLI resolves the user from `--user`, `WEJAY_USER_ID`, or the config
/// file and hands it over through this type.
///
/// # Examples
///
/// ```
/// use wejay::backend::{IdentityProvider, StaticIdentity};
///
/// let identity = StaticIdentity::new(Some("user-1".to_string()));
/// assert_eq!(identity.current_user_id().as_deref(), Some("user-1"));
///
/// assert!(StaticIdentity::signed_out().current_user_id().is_none());
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    user_id: Option<String>,
}

impl StaticIdentity {
    /// Creates an identity; blank ids are treated as signed out.
    pub fn new(user_id: Option<String>) -> Self {
        Self {
            user_id: user_id.filter(|id| !id.trim().is_empty()),
        }
    }

    /// Identity with nobody signed in.
    pub fn signed_out() -> Self {
        Self { user_id: None }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        self.user_id.clone()
    }
}
