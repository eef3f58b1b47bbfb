//! Authorization session launcher
//!
//! A session presents the authorization URL in an external user agent and
//! resolves once the agent is redirected back to the callback scheme.  The
//! user may take arbitrarily long, so every session is a cancellable
//! [`SessionHandle`]:
//!
//! - [`SessionHandle::wait`] drives the user agent on the caller's task and
//!   resolves with the redirect URL.
//! - [`SessionHandle::cancel`] (or cancelling the token it was launched
//!   with) resolves a pending `wait` as [`AuthError::AuthCancelled`].
//!
//! A launcher allows one live session at a time; launching while a handle is
//! alive fails with [`AuthError::OperationInProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt as _;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::AuthError;

// ---------------------------------------------------------------------------
// UserAgent
// ---------------------------------------------------------------------------

/// Platform surface that shows the authorization page to the user.
///
/// Implementations resolve with the full redirect URL once the provider
/// redirects to `callback_scheme`, or with [`AuthError::AuthCancelled`] when
/// the user abandons the page.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserAgent: Send + Sync {
    async fn open(&self, authorization_url: &Url, callback_scheme: &str) -> Result<Url, AuthError>;
}

// ---------------------------------------------------------------------------
// SessionLauncher
// ---------------------------------------------------------------------------

/// Starts authorization sessions on a [`UserAgent`].
#[derive(Clone)]
pub struct SessionLauncher {
    agent: Arc<dyn UserAgent>,
    callback_scheme: String,
    active: Arc<AtomicBool>,
}

impl SessionLauncher {
    /// Creates a launcher expecting redirects to `callback_scheme`.
    pub fn new(agent: Arc<dyn UserAgent>, callback_scheme: impl Into<String>) -> Self {
        Self {
            agent,
            callback_scheme: callback_scheme.into(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Scheme the user agent is told to wait for.
    pub fn callback_scheme(&self) -> &str {
        &self.callback_scheme
    }

    /// Returns `true` while a [`SessionHandle`] from this launcher is alive.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Launches a session with its own cancellation token.
    ///
    /// # Errors
    ///
    /// [`AuthError::OperationInProgress`] if another session is still alive.
    pub fn launch(&self, authorization_url: Url) -> Result<SessionHandle, AuthError> {
        self.launch_with_token(authorization_url, CancellationToken::new())
    }

    /// Launches a session that is cancelled together with `cancel`.
    ///
    /// Pass a child of a host-owned token so that tearing the host down
    /// resolves the pending session.
    ///
    /// # Errors
    ///
    /// [`AuthError::OperationInProgress`] if another session is still alive.
    pub fn launch_with_token(
        &self,
        authorization_url: Url,
        cancel: CancellationToken,
    ) -> Result<SessionHandle, AuthError> {
        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::warn!("Authorization session already active");
            return Err(AuthError::OperationInProgress);
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        tracing::debug!(scheme = %self.callback_scheme, "Launching authorization session");
        let agent = Arc::clone(&self.agent);
        let scheme = self.callback_scheme.clone();
        let future = async move { agent.open(&authorization_url, &scheme).await }.boxed();

        Ok(SessionHandle {
            future,
            cancel,
            _guard: guard,
        })
    }
}

struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// A pending authorization session.
///
/// Nothing happens until [`wait`](Self::wait) is awaited.  Dropping the
/// handle abandons the session and frees the launcher.
pub struct SessionHandle {
    future: BoxFuture<'static, Result<Url, AuthError>>,
    cancel: CancellationToken,
    _guard: ActiveGuard,
}

impl SessionHandle {
    /// Cancels the session; a pending or future `wait` resolves as
    /// [`AuthError::AuthCancelled`].
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A token that cancels this session when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the redirect.
    ///
    /// A redirect carrying an `error` parameter resolves as
    /// [`AuthError::AuthDenied`].
    ///
    /// # Errors
    ///
    /// - [`AuthError::AuthCancelled`] when cancelled or dismissed by the user
    /// - [`AuthError::AuthDenied`] when the provider reports an error
    pub async fn wait(self) -> Result<Url, AuthError> {
        let SessionHandle {
            future,
            cancel,
            _guard,
        } = self;

        let redirect = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!("Authorization session cancelled");
                return Err(AuthError::AuthCancelled);
            }
            result = future => result?,
        };

        if let Some(denied) = callback_error(&redirect) {
            tracing::info!(error = %denied, "Authorization denied by provider");
            return Err(denied);
        }
        Ok(redirect)
    }
}

impl std::fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Callback parsing
// ---------------------------------------------------------------------------

fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Maps an `error` redirect parameter to [`AuthError::AuthDenied`].
pub fn callback_error(redirect: &Url) -> Option<AuthError> {
    query_param(redirect, "error").map(|error| AuthError::AuthDenied {
        error,
        description: query_param(redirect, "error_description"),
    })
}

/// Extracts the authorization code from a redirect URL.
///
/// Uses the first `code` query parameter.
///
/// # Errors
///
/// - [`AuthError::AuthDenied`] if the redirect carries an `error` parameter
/// - [`AuthError::MissingAuthorizationCode`] if there is no non-empty `code`
///
/// # Examples
///
/// ```
/// use url::Url;
/// use wejay::spotify::auth::session::extract_code;
///
/// let url = Url::parse("wejay://callback?code=abc123").unwrap();
/// assert_eq!(extract_code(&url).unwrap(), "abc123");
/// ```
pub fn extract_code(redirect: &Url) -> Result<String, AuthError> {
    if let Some(denied) = callback_error(redirect) {
        return Err(denied);
    }
    query_param(redirect, "code")
        .filter(|code| !code.is_empty())
        .ok_or(AuthError::MissingAuthorizationCode)
}
