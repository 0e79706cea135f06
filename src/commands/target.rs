//! `target` command

use std::path::Path;

use anyhow::Context as _;
use colored::Colorize;

use crate::config::{Config, Target, MISSING_TARGET};
use crate::error::Result;
use crate::uaa::{build_url, http_client, info};

/// Show the active target, or verify and save a new one.
///
/// A new target is only saved once its `/info` endpoint answers.
pub async fn run_target(
    config: Config,
    config_path: &Path,
    url: Option<String>,
    skip_ssl_validation: bool,
) -> Result<()> {
    match url {
        Some(url) => set_target(config, config_path, &url, skip_ssl_validation).await,
        None => show_target(&config).await,
    }
}

async fn show_target(config: &Config) -> Result<()> {
    let Some(target) = config.active_target() else {
        println!("{}", MISSING_TARGET.yellow());
        return Ok(());
    };

    let client = http_client(config)?;
    let (status, version) = match info(&client, config).await {
        Ok(info) => ("OK".green(), info.app.version),
        Err(e) => {
            tracing::debug!(error = %e, "target did not answer /info");
            ("ERROR".red(), "unknown".to_string())
        }
    };

    println!("Target:              {}", target.base_url);
    println!("Status:              {}", status);
    println!("UAA Version:         {}", version);
    println!("SkipSSLValidation:   {}", target.skip_ssl_validation);
    Ok(())
}

async fn set_target(
    config: Config,
    config_path: &Path,
    url: &str,
    skip_ssl_validation: bool,
) -> Result<()> {
    let base_url = url.trim_end_matches('/');
    build_url(base_url, "/info")?;

    let mut updated = config;
    updated.add_target(Target::new(base_url, skip_ssl_validation));

    let client = http_client(&updated)?;
    info(&client, &updated)
        .await
        .with_context(|| format!("The target {base_url} could not be set."))?;

    updated.save(config_path)?;

    tracing::info!(url = base_url, "target saved");
    println!("{} {}", "Target set to".green(), base_url);
    Ok(())
}
