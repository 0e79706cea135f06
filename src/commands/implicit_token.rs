//! `get-implicit-token` command
//!
//! Runs the implicit grant against the active target and stores the captured
//! token as the active auth context.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::auth::{BrowserLauncher, ImplicitGrant, ImplicitGrantConfig, SystemBrowser};
use crate::config::{AuthContext, Config};
use crate::error::Result;
use crate::uaa::{TokenFormat, TokenResponse};

/// Grant type recorded on contexts created by this command.
pub const IMPLICIT_GRANT_TYPE: &str = "implicit";

/// Options of one `get-implicit-token` invocation.
#[derive(Debug, Clone)]
pub struct ImplicitTokenOptions {
    pub client_id: String,
    pub scope: String,
    pub format: TokenFormat,
    /// Overrides `implicit.port` from the session file
    pub port: Option<u16>,
    /// Overrides `implicit.timeout_seconds`; `Some(0)` disables the deadline
    pub timeout_seconds: Option<u64>,
}

/// Obtain a token with the system browser and save it.
pub async fn run_implicit_token(
    config: Config,
    config_path: &Path,
    options: ImplicitTokenOptions,
) -> Result<()> {
    run_with_launcher(config, config_path, options, SystemBrowser).await
}

async fn run_with_launcher(
    mut config: Config,
    config_path: &Path,
    options: ImplicitTokenOptions,
    launcher: impl BrowserLauncher + 'static,
) -> Result<()> {
    config.ensure_target()?;

    let grant_config = grant_config(&config, &options);
    let token = capture_token(ImplicitGrant::new(grant_config, launcher)).await?;

    config.add_context(AuthContext::new(
        options.client_id,
        "",
        IMPLICIT_GRANT_TYPE,
        token,
    ))?;
    config.save(config_path)?;

    println!("{}", "Access token added to active context.".green());
    Ok(())
}

fn grant_config(config: &Config, options: &ImplicitTokenOptions) -> ImplicitGrantConfig {
    let timeout = match options.timeout_seconds {
        Some(0) => None,
        Some(seconds) => Some(Duration::from_secs(seconds)),
        None => config.implicit.timeout(),
    };

    ImplicitGrantConfig {
        base_url: config.target_url().to_string(),
        client_id: options.client_id.clone(),
        scope: options.scope.clone(),
        token_format: options.format,
        port: options.port.unwrap_or(config.implicit.port),
        timeout,
    }
}

/// Start listening, send the user to the provider, and wait for the token.
pub async fn capture_token(grant: ImplicitGrant) -> Result<TokenResponse> {
    let pending = grant.start().await?;
    let url = pending.authorize()?;

    eprintln!("Launching browser window to {url}");
    eprintln!(
        "{}",
        format!(
            "Waiting for the redirect to http://localhost:{} ...",
            pending.port()
        )
        .dimmed()
    );

    pending.done().await
}
