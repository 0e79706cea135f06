//! Request layer and identity-provider calls
//!
//! # Module Layout
//!
//! - [`requester`]  -- authenticated and unauthenticated HTTP operations
//! - [`token_keys`] -- signing-key retrieval with the `/token_key` fallback
//! - [`info`]       -- `/info` and `/userinfo`
//! - [`token`]      -- the token response captured by grants
//! - [`url`]        -- target URL construction

pub mod info;
pub mod requester;
pub mod token;
pub mod token_keys;
pub mod url;

use std::time::Duration;

use ::url::Url;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{Result, UaaError};

pub use info::{info, userinfo, AppInfo, UaaInfo};
pub use requester::{
    AuthenticatedRequester, Requester, UnauthenticatedRequester, ZONE_SUBDOMAIN_HEADER,
};
pub use token::{TokenFormat, TokenResponse};
pub use token_keys::{token_keys, Jwk};
pub use self::url::{build_url, build_url_with_query};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the HTTP client used for calls against the active target.
///
/// Certificate validation is disabled only when the active target was saved
/// with `skip_ssl_validation`.
pub fn http_client(config: &Config) -> Result<reqwest::Client> {
    let skip_ssl_validation = config
        .active_target()
        .map(|t| t.skip_ssl_validation)
        .unwrap_or(false);

    if skip_ssl_validation {
        tracing::warn!("TLS certificate validation is disabled for this target");
    }

    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(concat!("uaactl/", env!("CARGO_PKG_VERSION")))
        .danger_accept_invalid_certs(skip_ssl_validation)
        .build()
        .map_err(|e| UaaError::Config(format!("failed to build HTTP client: {e}")).into())
}

/// Deserializes a response body, reporting a shape mismatch as
/// [`UaaError::Parse`].
pub fn parse_response<T: DeserializeOwned>(body: &[u8], url: &Url) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(url = %url, error = %e, "unexpected response shape");
        UaaError::Parse {
            url: url.to_string(),
        }
        .into()
    })
}
