//! WEJAY - Spotify account connection library
//!
//! This library connects a Spotify account to a WEJAY user with the OAuth 2.0
//! authorization code flow and PKCE, persists the resulting tokens, and keeps
//! the access token fresh.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `spotify::auth`: PKCE, authorization session, token exchange, profile
//!   lookup, credential persistence, and the connection orchestrator
//! - `backend`: identity, document, and blob store capabilities
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//! - `commands`: CLI command handlers
//!
//! # Example
//!
//! ```no_run
//! use wejay::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     wejay::commands::status::run_status(config, false).await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod spotify;

// Re-export commonly used types
pub use config::Config;
pub use error::{AuthError, Result, WejayError};
pub use spotify::auth::{ConnectionOrchestrator, ConnectionState, TokenCredential};

#[cfg(test)]
pub mod test_utils;
