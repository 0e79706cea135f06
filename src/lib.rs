//! uaactl - command-line client library for UAA identity providers
//!
//! This library provides the pieces behind the `uaactl` binary: a request
//! layer for calling the identity provider, a browser-mediated implicit-grant
//! token capture, and the persisted session configuration.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `uaa`: Request layer (authenticated and unauthenticated) and resource calls
//! - `auth`: Callback listener, browser launcher, and implicit-grant orchestration
//! - `config`: Session file, targets, auth contexts, and overrides
//! - `commands`: Handlers for each CLI subcommand
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use uaactl::auth::{ImplicitGrant, ImplicitGrantConfig, SystemBrowser};
//! use uaactl::uaa::TokenFormat;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let grant = ImplicitGrant::new(
//!         ImplicitGrantConfig {
//!             base_url: "https://login.example.com".to_string(),
//!             client_id: "cf".to_string(),
//!             scope: "openid".to_string(),
//!             token_format: TokenFormat::Jwt,
//!             port: 8080,
//!             timeout: None,
//!         },
//!         SystemBrowser,
//!     );
//!
//!     let pending = grant.start().await?;
//!     pending.authorize()?;
//!     let token = pending.done().await?;
//!     println!("{}", token.access_token);
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod uaa;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, UaaError};
pub use uaa::{TokenFormat, TokenResponse};

#[cfg(test)]
pub mod test_utils;
