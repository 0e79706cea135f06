//! Authenticated and unauthenticated HTTP calls against the active target
//!
//! Both capability variants expose the same five operations through the
//! [`Requester`] trait; they differ only in how [`Requester::bearer_token`]
//! resolves credentials. Every call:
//!
//! - sets `Accept: application/json` (write calls also set the matching
//!   `Content-Type`),
//! - adds `X-Identity-Zone-Subdomain` when a zone subdomain is configured,
//! - returns the raw body for any 2xx status and a generic
//!   [`UaaError::Request`] for everything else.
//!
//! No call is retried here.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use url::Url;

use crate::config::Config;
use crate::error::{Result, UaaError};
use crate::uaa::url::build_url_with_query;

/// Header used to switch the identity zone a request targets.
pub const ZONE_SUBDOMAIN_HEADER: &str = "X-Identity-Zone-Subdomain";

/// HTTP operations against the configured target.
///
/// Implementors only decide which bearer token (if any) to present; request
/// construction, zone switching and error classification are shared.
///
/// # Examples
///
/// ```no_run
/// use uaactl::config::Config;
/// use uaactl::uaa::{Requester, UnauthenticatedRequester};
///
/// # async fn example() -> uaactl::error::Result<()> {
/// let config = Config::with_target_url("https://login.example.com");
/// let client = reqwest::Client::new();
/// let body = UnauthenticatedRequester
///     .get(&client, &config, "/info", "")
///     .await?;
/// println!("{}", String::from_utf8_lossy(&body));
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Requester: Send + Sync {
    /// Resolves the bearer token to present when calling `url`.
    ///
    /// Returning an error aborts the call before any network I/O.
    fn bearer_token(&self, config: &Config, url: &Url) -> Result<Option<String>>;

    /// Issues a `GET`.
    async fn get(
        &self,
        client: &Client,
        config: &Config,
        path: &str,
        query: &str,
    ) -> Result<Vec<u8>> {
        let (request, url) = self.prepare(client, config, Method::GET, path, query)?;
        execute(request, url).await
    }

    /// Issues a `DELETE`.
    async fn delete(
        &self,
        client: &Client,
        config: &Config,
        path: &str,
        query: &str,
    ) -> Result<Vec<u8>> {
        let (request, url) = self.prepare(client, config, Method::DELETE, path, query)?;
        execute(request, url).await
    }

    /// Issues a `POST` with an `application/x-www-form-urlencoded` body.
    async fn post_form<B>(
        &self,
        client: &Client,
        config: &Config,
        path: &str,
        query: &str,
        body: &B,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let (request, url) = self.prepare(client, config, Method::POST, path, query)?;
        execute(request.form(body), url).await
    }

    /// Issues a `POST` with an `application/json` body.
    async fn post_json<B>(
        &self,
        client: &Client,
        config: &Config,
        path: &str,
        query: &str,
        body: &B,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let (request, url) = self.prepare(client, config, Method::POST, path, query)?;
        execute(request.json(body), url).await
    }

    /// Issues a `PUT` with an `application/json` body.
    async fn put_json<B>(
        &self,
        client: &Client,
        config: &Config,
        path: &str,
        query: &str,
        body: &B,
    ) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized + Sync,
    {
        let (request, url) = self.prepare(client, config, Method::PUT, path, query)?;
        execute(request.json(body), url).await
    }

    /// Builds the request with the headers every call carries.
    fn prepare(
        &self,
        client: &Client,
        config: &Config,
        method: Method,
        path: &str,
        query: &str,
    ) -> Result<(RequestBuilder, Url)> {
        let url = build_url_with_query(config.target_url(), path, query)?;

        let mut request = client
            .request(method, url.clone())
            .header(ACCEPT, "application/json");

        if let Some(zone) = config.zone_subdomain.as_deref().filter(|z| !z.is_empty()) {
            request = request.header(ZONE_SUBDOMAIN_HEADER, zone);
        }

        if let Some(token) = self.bearer_token(config, &url)? {
            request = request.header(AUTHORIZATION, format!("bearer {token}"));
        }

        Ok((request, url))
    }
}

/// Calls the target without credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnauthenticatedRequester;

impl Requester for UnauthenticatedRequester {
    fn bearer_token(&self, _config: &Config, _url: &Url) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Calls the target with the access token of the active auth context.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthenticatedRequester;

impl Requester for AuthenticatedRequester {
    fn bearer_token(&self, config: &Config, url: &Url) -> Result<Option<String>> {
        match config.active_context() {
            Some(context) if !context.token.access_token.is_empty() => {
                Ok(Some(context.token.access_token.clone()))
            }
            _ => Err(UaaError::MissingToken {
                url: url.to_string(),
            }
            .into()),
        }
    }
}

/// Sends the request and classifies the response.
///
/// Status codes and transport details are logged at debug level only; the
/// returned error names nothing but the URL.
async fn execute(request: RequestBuilder, url: Url) -> Result<Vec<u8>> {
    let target = url.to_string();
    tracing::debug!(url = %target, "calling identity provider");

    let response = request.send().await.map_err(|e| {
        tracing::debug!(url = %target, error = %e, "request failed before a response");
        UaaError::Request {
            url: target.clone(),
            status: None,
        }
    })?;

    let status = response.status();
    let body = response.bytes().await.map_err(|e| {
        tracing::debug!(url = %target, error = %e, "failed to read response body");
        UaaError::Request {
            url: target.clone(),
            status: Some(status.as_u16()),
        }
    })?;

    if !status.is_success() {
        tracing::debug!(
            url = %target,
            status = status.as_u16(),
            body = %String::from_utf8_lossy(&body),
            "identity provider returned an error status"
        );
        return Err(UaaError::Request {
            url: target,
            status: Some(status.as_u16()),
        }
        .into());
    }

    tracing::debug!(url = %target, status = status.as_u16(), bytes = body.len(), "call succeeded");
    Ok(body.to_vec())
}
