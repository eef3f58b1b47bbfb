//! PKCE code verifier generation and `S256` challenge derivation
//!
//! Implements the client side of RFC 7636:
//!
//! 1. A fresh 64-character `code_verifier` is drawn uniformly from the
//!    unreserved character set `[A-Za-z0-9-._~]` using the thread-local
//!    CSPRNG.
//! 2. The `code_challenge` is `BASE64URL(SHA256(ASCII(code_verifier)))`
//!    without padding.
//! 3. The challenge goes in the authorization URL; the verifier goes in the
//!    token exchange request and is then discarded.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use base64::Engine as _;
use rand::Rng as _;
use sha2::{Digest, Sha256};

/// Number of characters in a generated verifier.
pub const VERIFIER_LENGTH: usize = 64;

/// The unreserved characters a verifier may contain (RFC 7636 section 4.1).
pub const VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// Challenge method sent alongside every challenge.
pub const CHALLENGE_METHOD: &str = "S256";

// ---------------------------------------------------------------------------
// PkcePair
// ---------------------------------------------------------------------------

/// A verifier and the challenge derived from it.
///
/// Created fresh for every connection attempt and never persisted.  The
/// `Debug` implementation redacts the verifier.
///
/// # Examples
///
/// ```
/// use wejay::spotify::auth::pkce::{derive_challenge, PkcePair};
///
/// let pair = PkcePair::generate();
/// assert_eq!(pair.verifier().len(), 64);
/// assert_eq!(pair.challenge(), derive_challenge(pair.verifier()));
/// ```
#[derive(Clone)]
pub struct PkcePair {
    verifier: String,
    challenge: String,
}

impl PkcePair {
    /// Generates a new random verifier and derives its challenge.
    pub fn generate() -> Self {
        Self::from_verifier(generate_verifier())
    }

    /// Builds a pair around a known verifier.
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = derive_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }

    /// The secret sent to the token endpoint.
    pub fn verifier(&self) -> &str {
        &self.verifier
    }

    /// The public value sent to the authorization endpoint.
    pub fn challenge(&self) -> &str {
        &self.challenge
    }

    /// Always [`CHALLENGE_METHOD`].
    pub fn method(&self) -> &'static str {
        CHALLENGE_METHOD
    }
}

impl std::fmt::Debug for PkcePair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkcePair")
            .field("verifier", &"[redacted]")
            .field("challenge", &self.challenge)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

/// Generates a 64-character code verifier from the unreserved charset.
///
/// Each character is an independent uniform draw (`random_range` rejects
/// biased samples), so every character of [`VERIFIER_CHARSET`] is equally
/// likely at every position.
pub fn generate_verifier() -> String {
    let mut rng = rand::rng();
    (0..VERIFIER_LENGTH)
        .map(|_| VERIFIER_CHARSET[rng.random_range(0..VERIFIER_CHARSET.len())] as char)
        .collect()
}

/// Derives the `S256` code challenge for `verifier`.
///
/// SHA-256 over the UTF-8 bytes of the verifier, base64url-encoded without
/// `=` padding.
///
/// # Examples
///
/// ```
/// use wejay::spotify::auth::pkce::derive_challenge;
///
/// // RFC 7636 Appendix B
/// assert_eq!(
///     derive_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
///     "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM",
/// );
/// ```
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
