//! `info` command

use crate::commands::print_json;
use crate::config::Config;
use crate::error::Result;
use crate::uaa::{http_client, info};

/// Print the target's `/info` document.
pub async fn run_info(config: &Config) -> Result<()> {
    config.ensure_target()?;
    let client = http_client(config)?;
    let info = info(&client, config).await?;
    print_json(&info)
}
