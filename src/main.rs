//! WEJAY - Spotify account connection CLI
//!
#![doc = "WEJAY - Spotify account connection CLI"]
#![doc = "Main entry point for the wejay binary."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use wejay::cli::{Cli, Commands};
use wejay::commands;
use wejay::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Connect { no_browser } => {
            tracing::info!("Starting Spotify connection");
            commands::connect::run_connect(config, !no_browser).await?;
            Ok(())
        }
        Commands::Refresh => {
            tracing::info!("Refreshing Spotify access token");
            commands::refresh::run_refresh(config).await?;
            Ok(())
        }
        Commands::Status { json } => {
            commands::status::run_status(config, json).await?;
            Ok(())
        }
        Commands::Disconnect { forget } => {
            tracing::info!("Disconnecting Spotify account");
            commands::disconnect::run_disconnect(config, forget).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output.
/// Logs go to stderr so `status --json` stays machine-readable.
fn init_tracing(verbose: bool, json: bool) {
    let default_directive = if verbose { "wejay=debug" } else { "wejay=info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
