//! `context` command

use crate::commands::print_json;
use crate::config::Config;
use crate::error::Result;

/// Print the active auth context as JSON.
///
/// # Errors
///
/// Fails with guidance when there is no target or no stored token.
pub fn run_context(config: &Config) -> Result<()> {
    config.ensure_context()?;
    match config.active_context() {
        Some(context) => print_json(context),
        None => Ok(()),
    }
}
