//! Command-line interface definition for WEJAY
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands to connect, refresh, inspect, and disconnect the
//! Spotify account attached to the local WEJAY user.

use clap::{Parser, Subcommand};

use crate::config::StoreBackend;

/// WEJAY - Spotify account connection
///
/// Connect a Spotify account with OAuth 2.0 + PKCE and keep its access token
/// fresh.
#[derive(Parser, Debug, Clone)]
#[command(name = "wejay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Local WEJAY user id the Spotify account belongs to
    #[arg(short, long, env = "WEJAY_USER")]
    pub user: Option<String>,

    /// Override the credential store backend
    #[arg(long, value_enum)]
    pub store: Option<StoreBackend>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for WEJAY
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Authorize WEJAY to use a Spotify account
    ///
    /// Opens the Spotify consent page, then waits for the `wejay://callback`
    /// redirect URL to be pasted back.
    Connect {
        /// Print the authorization URL without trying to open a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Refresh the stored access token if it has expired
    Refresh,

    /// Show the connection state of the stored Spotify account
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Disconnect the Spotify account and clear its tokens
    Disconnect {
        /// Remove the stored record entirely instead of marking it disconnected
        #[arg(long)]
        forget: bool,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            json_logs: false,
            user: None,
            store: None,
            command: Commands::Status { json: false },
        }
    }
}
