//! Token-signing key retrieval
//!
//! Newer servers expose every signing key at `/token_keys`. Older servers
//! only expose the single active key at `/token_key`; when the collection
//! endpoint answers 404 the single key is fetched instead and wrapped into a
//! one-element collection.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::uaa::requester::{Requester, UnauthenticatedRequester};
use crate::uaa::{build_url, parse_response};

/// A JSON Web Key used to sign issued tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, e.g. `RSA`
    #[serde(default)]
    pub kty: String,

    /// RSA public exponent
    #[serde(default)]
    pub e: String,

    /// Intended key use, e.g. `sig`
    #[serde(default, rename = "use")]
    pub usage: String,

    /// Key identifier
    #[serde(default)]
    pub kid: String,

    /// Signing algorithm, e.g. `RS256`
    #[serde(default)]
    pub alg: String,

    /// PEM encoded public key
    #[serde(default)]
    pub value: String,

    /// RSA modulus
    #[serde(default)]
    pub n: String,
}

#[derive(Debug, Deserialize)]
struct JwkSet {
    keys: Vec<Jwk>,
}

/// Fetches the keys the target uses to sign tokens.
///
/// # Errors
///
/// Returns [`UaaError::Request`](crate::error::UaaError::Request) for upstream
/// failures and [`UaaError::Parse`](crate::error::UaaError::Parse) when a body
/// does not have the expected shape.
pub async fn token_keys(client: &Client, config: &Config) -> Result<Vec<Jwk>> {
    let keys_url = build_url(config.target_url(), "/token_keys")?;

    match UnauthenticatedRequester
        .get(client, config, "/token_keys", "")
        .await
    {
        Ok(body) => {
            let set: JwkSet = parse_response(&body, &keys_url)?;
            Ok(set.keys)
        }
        Err(err) if is_not_found(&err) => {
            tracing::debug!("/token_keys not available, falling back to /token_key");
            let key_url = build_url(config.target_url(), "/token_key")?;
            let body = UnauthenticatedRequester
                .get(client, config, "/token_key", "")
                .await?;
            let key: Jwk = parse_response(&body, &key_url)?;
            Ok(vec![key])
        }
        Err(err) => Err(err),
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<crate::error::UaaError>()
        .is_some_and(|e| e.is_not_found())
}
