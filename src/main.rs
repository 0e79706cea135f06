//! uaactl - command-line client for UAA identity providers
//!
#![doc = "Main entry point for the uaactl application."]

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use uaactl::cli::{Cli, Commands};
use uaactl::commands;
use uaactl::commands::implicit_token::ImplicitTokenOptions;
use uaactl::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Initialize tracing
    init_tracing(cli.verbose);

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    // Execute command
    match cli.command {
        Commands::Target {
            url,
            skip_ssl_validation,
        } => commands::target::run_target(config, &config_path, url, skip_ssl_validation).await,
        Commands::Context => commands::context::run_context(&config),
        Commands::Info => commands::info::run_info(&config).await,
        Commands::GetImplicitToken {
            client_id,
            scope,
            format,
            port,
            timeout_seconds,
        } => {
            tracing::info!("Starting implicit grant for client {}", client_id);
            commands::implicit_token::run_implicit_token(
                config,
                &config_path,
                ImplicitTokenOptions {
                    client_id,
                    scope,
                    format,
                    port,
                    timeout_seconds,
                },
            )
            .await
        }
        Commands::GetTokenKeys => commands::token_keys::run_token_keys(&config).await,
        Commands::Userinfo => commands::userinfo::run_userinfo(&config).await,
    }
}

/// Logs go to stderr so JSON on stdout stays machine-readable.
fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "uaactl=debug" } else { "uaactl=warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
