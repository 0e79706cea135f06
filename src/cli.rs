//! Command-line interface definition for uaactl
//!
//! This module defines the CLI structure using clap's derive API. Global flags
//! feed [`Config`](crate::config::Config) rather than process-wide state.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::uaa::TokenFormat;

/// uaactl - command-line client for a UAA identity provider
#[derive(Parser, Debug, Clone)]
#[command(name = "uaactl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to the session file (defaults to ~/.uaactl/config.yaml)
    #[arg(short, long, global = true, env = "UAACTL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Identity zone subdomain to switch into
    #[arg(short = 'z', long, global = true, env = "UAACTL_ZONE_SUBDOMAIN")]
    pub zone: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for uaactl
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Set or show the identity provider to talk to
    Target {
        /// Base URL of the identity provider; omit to show the current target
        url: Option<String>,

        /// Accept invalid TLS certificates from this target
        #[arg(short = 'k', long)]
        skip_ssl_validation: bool,
    },

    /// Show the active auth context
    Context,

    /// Show the target's server information
    Info,

    /// Obtain a token through the implicit grant using a browser
    GetImplicitToken {
        /// Client registered for the implicit grant
        client_id: String,

        /// Space-delimited scopes to request
        #[arg(short, long, default_value = "openid")]
        scope: String,

        /// Access token format
        #[arg(long, value_enum, default_value_t = TokenFormat::Jwt)]
        format: TokenFormat,

        /// Local port for the redirect (overrides the session file)
        #[arg(long)]
        port: Option<u16>,

        /// Seconds to wait for the redirect; 0 waits indefinitely
        #[arg(long)]
        timeout_seconds: Option<u64>,
    },

    /// Show the token signing keys
    #[command(alias = "token-keys")]
    GetTokenKeys,

    /// Show claims about the user of the active context
    Userinfo,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
