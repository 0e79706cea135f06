//! `get-token-keys` command

use crate::commands::print_json;
use crate::config::Config;
use crate::error::Result;
use crate::uaa::{http_client, token_keys};

/// Print the target's token signing keys.
pub async fn run_token_keys(config: &Config) -> Result<()> {
    config.ensure_target()?;
    let client = http_client(config)?;
    let keys = token_keys(&client, config).await?;
    print_json(&keys)
}
