//! `userinfo` command

use crate::commands::print_json;
use crate::config::Config;
use crate::error::Result;
use crate::uaa::{http_client, userinfo};

/// Print `/userinfo` for the active auth context.
pub async fn run_userinfo(config: &Config) -> Result<()> {
    config.ensure_context()?;
    let client = http_client(config)?;
    let claims = userinfo(&client, config).await?;
    print_json(&claims)
}
