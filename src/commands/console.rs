//! Console user agent
//!
//! The CLI has no embedded browser, so the authorization page is opened in
//! the system browser and the user pastes the `wejay://callback?...` URL the
//! browser was redirected to.
//!
//! Input lines are read on a dedicated OS thread and forwarded over a
//! channel.  A blocking read cannot be interrupted, so it must not live on
//! the runtime's blocking pool: runtime shutdown would wait for it after a
//! cancelled session.

use std::io::BufRead;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use url::Url;

use crate::error::AuthError;
use crate::spotify::auth::UserAgent;

type LineSource = Box<dyn BufRead + Send>;

/// [`UserAgent`] that talks to the user over stdin/stderr.
pub struct ConsoleUserAgent {
    open_browser: bool,
    source: std::sync::Mutex<Option<LineSource>>,
    lines: Mutex<Option<mpsc::Receiver<String>>>,
}

impl ConsoleUserAgent {
    /// Reads redirect URLs from stdin.
    ///
    /// Nothing is read until the first session opens.
    pub fn new(open_browser: bool) -> Self {
        Self::with_input(open_browser, std::io::BufReader::new(std::io::stdin()))
    }

    /// Reads redirect URLs from `input`.
    pub fn with_input(open_browser: bool, input: impl BufRead + Send + 'static) -> Self {
        Self {
            open_browser,
            source: std::sync::Mutex::new(Some(Box::new(input))),
            lines: Mutex::new(None),
        }
    }

    /// Attempts to open `url` in the default browser.
    ///
    /// Failures are ignored; the URL is always printed as well.
    fn try_open_browser(url: &str) {
        #[cfg(target_os = "macos")]
        {
            let _ = std::process::Command::new("open").arg(url).spawn();
        }
        #[cfg(target_os = "linux")]
        {
            let _ = std::process::Command::new("xdg-open").arg(url).spawn();
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux")))]
        {
            let _ = url;
        }
    }

    /// Starts the reader thread on first use.
    ///
    /// The channel closes at end of input or on a read error.
    fn spawn_reader(&self) -> Result<mpsc::Receiver<String>, AuthError> {
        let source = self
            .source
            .lock()
            .map_err(|_| AuthError::AuthCancelled)?
            .take()
            .ok_or(AuthError::AuthCancelled)?;

        let (tx, rx) = mpsc::channel(16);
        std::thread::Builder::new()
            .name("wejay-console-input".to_string())
            .spawn(move || {
                for line in source.lines() {
                    let Ok(line) = line else { break };
                    if tx.blocking_send(line).is_err() {
                        break;
                    }
                }
            })
            .map_err(|e| {
                tracing::warn!(error = %e, "Failed to start console input reader");
                AuthError::AuthCancelled
            })?;
        Ok(rx)
    }
}

#[async_trait]
impl UserAgent for ConsoleUserAgent {
    async fn open(&self, authorization_url: &Url, callback_scheme: &str) -> Result<Url, AuthError> {
        eprintln!("Open this URL to authorize WEJAY with Spotify:\n\n  {}\n", authorization_url);
        if self.open_browser {
            Self::try_open_browser(authorization_url.as_str());
        }
        eprintln!(
            "After approving, paste the {}:// URL your browser was redirected to:",
            callback_scheme
        );

        let mut lines = self.lines.lock().await;
        if lines.is_none() {
            *lines = Some(self.spawn_reader()?);
        }
        let Some(rx) = lines.as_mut() else {
            return Err(AuthError::AuthCancelled);
        };

        loop {
            let Some(line) = rx.recv().await else {
                tracing::debug!("Redirect input closed");
                return Err(AuthError::AuthCancelled);
            };

            let candidate = line.trim();
            if candidate.is_empty() {
                continue;
            }
            match Url::parse(candidate) {
                Ok(url) if url.scheme() == callback_scheme => return Ok(url),
                _ => eprintln!(
                    "Expected a URL starting with {}://, try again:",
                    callback_scheme
                ),
            }
        }
    }
}
