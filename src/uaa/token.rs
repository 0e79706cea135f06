//! Token response and token format types

use serde::{Deserialize, Serialize};

/// The result of a successful grant.
///
/// Constructed once per successful capture and persisted by the calling
/// command into the active auth context.
///
/// # Examples
///
/// ```
/// use uaactl::uaa::TokenResponse;
///
/// let token: TokenResponse = serde_json::from_str(
///     r#"{"access_token":"tok","token_type":"bearer","expires_in":43199}"#,
/// )
/// .unwrap();
/// assert_eq!(token.access_token, "tok");
/// assert_eq!(token.expires_in, 43199);
/// assert!(token.jti.is_empty());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Opaque access token
    pub access_token: String,

    /// Token type, normally `bearer`
    #[serde(default)]
    pub token_type: String,

    /// Space-delimited granted scopes
    #[serde(default)]
    pub scope: String,

    /// Token identifier
    #[serde(default)]
    pub jti: String,

    /// Seconds until expiration; zero when unknown
    #[serde(default)]
    pub expires_in: i32,
}

/// Token format requested from the authorization endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TokenFormat {
    /// Signed JWT access tokens
    #[default]
    Jwt,
    /// Opaque reference tokens
    Opaque,
}

impl TokenFormat {
    /// Value sent as the `token_format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFormat::Jwt => "jwt",
            TokenFormat::Opaque => "opaque",
        }
    }
}

impl std::fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
