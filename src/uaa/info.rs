//! Server information and user information calls

use std::collections::BTreeMap;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::uaa::requester::{AuthenticatedRequester, Requester, UnauthenticatedRequester};
use crate::uaa::{build_url, parse_response};

/// The document served at `/info`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UaaInfo {
    /// Application metadata
    #[serde(default)]
    pub app: AppInfo,

    /// Named links advertised by the server
    #[serde(default)]
    pub links: BTreeMap<String, String>,

    /// Login prompts; the shape varies between server versions
    #[serde(default)]
    pub prompts: serde_json::Value,

    /// Name of the identity zone that answered
    #[serde(default)]
    pub zone_name: String,

    /// SAML entity identifier
    #[serde(default, rename = "entityID")]
    pub entity_id: String,

    #[serde(default)]
    pub commit_id: String,

    #[serde(default)]
    pub timestamp: String,
}

/// Application metadata inside [`UaaInfo`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppInfo {
    /// Server version string
    #[serde(default)]
    pub version: String,
}

/// Fetches `/info` without credentials.
pub async fn info(client: &Client, config: &Config) -> Result<UaaInfo> {
    let url = build_url(config.target_url(), "/info")?;
    let body = UnauthenticatedRequester
        .get(client, config, "/info", "")
        .await?;
    parse_response(&body, &url)
}

/// Fetches `/userinfo` for the active auth context.
pub async fn userinfo(client: &Client, config: &Config) -> Result<serde_json::Value> {
    let url = build_url(config.target_url(), "/userinfo")?;
    let body = AuthenticatedRequester
        .get(client, config, "/userinfo", "")
        .await?;
    parse_response(&body, &url)
}
