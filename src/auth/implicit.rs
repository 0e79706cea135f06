//! Implicit-grant token capture
//!
//! The implicit grant returns the access token in the fragment of the redirect
//! URL. This module stands in for a browser-based OAuth client: it listens on
//! a loopback port, sends the user to `/oauth/authorize` with a
//! `http://localhost:<port>` redirect, and turns the captured fragment into a
//! [`TokenResponse`].
//!
//! # Flow overview
//!
//! 1. [`ImplicitGrant::start`] checks the target URL, binds the callback
//!    listener and starts waiting in a background task.
//! 2. [`PendingImplicitGrant::authorize`] builds the authorization URL and
//!    hands it to the [`BrowserLauncher`].
//! 3. [`PendingImplicitGrant::done`] resolves once the redirect arrives, the
//!    deadline passes, or the provider reports an error.
//!
//! `authorize` only exists on the value returned by `start`, so the browser
//! can never be sent off before the port is bound.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use url::Url;

use crate::auth::browser::BrowserLauncher;
use crate::auth::callback::{CallbackPage, CallbackServer, CapturedParameters};
use crate::error::{Result, UaaError};
use crate::uaa::{build_url, TokenFormat, TokenResponse};

// ---------------------------------------------------------------------------
// Callback page
// ---------------------------------------------------------------------------

const CALLBACK_CSS: &str = r#"<style>
	@import url('https://fonts.googleapis.com/css?family=Source+Sans+Pro');
	html {
		background: #f8f8f8;
		font-family: "Source Sans Pro", sans-serif;
	}
</style>"#;

// Browsers drop the fragment before issuing requests, so it is sent back to
// the listener as a query string. The listener's answer replaces the page.
const CALLBACK_SCRIPT: &str = r##"<script>
	var req = new XMLHttpRequest();
	req.onload = function () {
		document.open();
		document.write(req.responseText);
		document.close();
	};
	req.open("GET", "/" + location.hash.replace("#","?"));
	req.send();
</script>"##;

const PENDING_HTML: &str = r#"<body>
	<h1>Implicit Grant</h1>
	<p>The UAA redirected you to this page with an access token.</p>
	<p>Passing the token to uaactl...</p>
</body>"#;

const COMPLETE_HTML: &str = r#"<body>
	<h1>Implicit Grant: Success</h1>
	<p>The UAA redirected you to this page with an access token.</p>
	<p>The token has been added to the CLI's active context. You may close this window.</p>
</body>"#;

fn callback_page() -> CallbackPage {
    CallbackPage {
        css: CALLBACK_CSS.to_string(),
        pending_html: PENDING_HTML.to_string(),
        script: CALLBACK_SCRIPT.to_string(),
        complete_html: COMPLETE_HTML.to_string(),
    }
}

/// A redirect completes the grant when it carries a token or an OAuth error.
fn is_complete(params: &CapturedParameters) -> bool {
    params.has_value("access_token") || params.has_value("error")
}

impl TryFrom<CapturedParameters> for TokenResponse {
    type Error = anyhow::Error;

    /// Converts a captured redirect into a token.
    ///
    /// A missing or non-numeric `expires_in` becomes `0`. A redirect carrying
    /// `error` becomes [`UaaError::AuthorizationDenied`].
    fn try_from(params: CapturedParameters) -> Result<Self> {
        if let Some(error) = params.get("error").filter(|e| !e.is_empty()) {
            let reason = match params.get("error_description").filter(|d| !d.is_empty()) {
                Some(description) => format!("{error}: {description}"),
                None => error.to_string(),
            };
            return Err(UaaError::AuthorizationDenied(reason).into());
        }

        let field = |key: &str| params.get(key).unwrap_or_default().to_string();

        Ok(TokenResponse {
            access_token: field("access_token"),
            token_type: field("token_type"),
            scope: field("scope"),
            jti: field("jti"),
            expires_in: params
                .get("expires_in")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
        })
    }
}

// ---------------------------------------------------------------------------
// ImplicitGrantConfig
// ---------------------------------------------------------------------------

/// Parameters of one implicit-grant authorization.
///
/// # Examples
///
/// ```
/// use uaactl::auth::ImplicitGrantConfig;
/// use uaactl::uaa::TokenFormat;
///
/// let config = ImplicitGrantConfig {
///     base_url: "https://login.example.com".to_string(),
///     client_id: "cf".to_string(),
///     scope: "openid".to_string(),
///     token_format: TokenFormat::Jwt,
///     port: 8080,
///     timeout: None,
/// };
/// assert_eq!(config.token_format.as_str(), "jwt");
/// ```
#[derive(Debug, Clone)]
pub struct ImplicitGrantConfig {
    /// Base URL of the identity provider
    pub base_url: String,

    /// Client registered for the implicit grant
    pub client_id: String,

    /// Space-delimited scopes to request
    pub scope: String,

    /// Requested access token format
    pub token_format: TokenFormat,

    /// Local port for the redirect; `0` lets the OS choose
    pub port: u16,

    /// How long to wait for the redirect; `None` waits indefinitely
    pub timeout: Option<Duration>,
}

// ---------------------------------------------------------------------------
// ImplicitGrant
// ---------------------------------------------------------------------------

/// An implicit grant that has not started listening yet.
pub struct ImplicitGrant {
    config: ImplicitGrantConfig,
    launcher: Arc<dyn BrowserLauncher>,
}

impl ImplicitGrant {
    /// Creates a grant that opens the authorization URL with `launcher`.
    pub fn new(config: ImplicitGrantConfig, launcher: impl BrowserLauncher + 'static) -> Self {
        Self {
            config,
            launcher: Arc::new(launcher),
        }
    }

    /// Builds the `/oauth/authorize` URL redirecting to `port`.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Config`] if the base URL is malformed.
    ///
    /// # Examples
    ///
    /// ```
    /// use uaactl::auth::{ImplicitGrant, ImplicitGrantConfig};
    /// use uaactl::uaa::TokenFormat;
    ///
    /// let grant = ImplicitGrant::new(
    ///     ImplicitGrantConfig {
    ///         base_url: "https://login.example.com".to_string(),
    ///         client_id: "cf".to_string(),
    ///         scope: "openid".to_string(),
    ///         token_format: TokenFormat::Opaque,
    ///         port: 8080,
    ///         timeout: None,
    ///     },
    ///     |_: &str| -> uaactl::error::Result<()> { Ok(()) },
    /// );
    ///
    /// let url = grant.authorization_url(8080).unwrap();
    /// assert_eq!(
    ///     url.as_str(),
    ///     "https://login.example.com/oauth/authorize?response_type=token&client_id=cf\
    ///      &scope=openid&token_format=opaque&redirect_uri=http%3A%2F%2Flocalhost%3A8080"
    /// );
    /// ```
    pub fn authorization_url(&self, port: u16) -> Result<Url> {
        let mut url = build_url(&self.config.base_url, "/oauth/authorize")?;
        url.query_pairs_mut()
            .append_pair("response_type", "token")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("scope", &self.config.scope)
            .append_pair("token_format", self.config.token_format.as_str())
            .append_pair("redirect_uri", &format!("http://localhost:{port}"));
        Ok(url)
    }

    /// Binds the callback listener and starts waiting for the redirect.
    ///
    /// Returns as soon as the port is bound; the wait runs in a background
    /// task until the returned [`PendingImplicitGrant`] is consumed or dropped.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Config`] for a malformed base URL, before anything
    /// is bound, and [`UaaError::Bind`] if the port is unavailable.
    pub async fn start(self) -> Result<PendingImplicitGrant> {
        self.authorization_url(self.config.port)?;

        let listener = CallbackServer::new(callback_page(), self.config.port, is_complete)
            .listen()
            .await?;
        let port = listener.port();
        let deadline = self.config.timeout;

        let (done_tx, done_rx) = oneshot::channel();
        let (abandon_tx, abandon_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                captured = listener.capture(deadline) => {
                    captured.and_then(TokenResponse::try_from)
                }
                _ = abandon_rx => {
                    tracing::debug!(port, "implicit grant abandoned");
                    return;
                }
            };
            if done_tx.send(outcome).is_err() {
                tracing::debug!(port, "implicit grant result discarded");
            }
        });

        tracing::debug!(port, client_id = %self.config.client_id, "implicit grant started");

        Ok(PendingImplicitGrant {
            grant: self,
            port,
            done_rx,
            abandon_tx,
        })
    }
}

// ---------------------------------------------------------------------------
// PendingImplicitGrant
// ---------------------------------------------------------------------------

/// An implicit grant whose callback listener is bound and waiting.
///
/// Dropping it abandons the grant and releases the port.
pub struct PendingImplicitGrant {
    grant: ImplicitGrant,
    port: u16,
    done_rx: oneshot::Receiver<Result<TokenResponse>>,
    abandon_tx: oneshot::Sender<()>,
}

impl PendingImplicitGrant {
    /// The port the listener is bound to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Sends the user to the authorization endpoint.
    ///
    /// The redirect URI uses the port actually bound. A browser that fails to
    /// launch is only logged: the returned URL can still be opened by hand.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Config`] if the authorization URL cannot be built.
    pub fn authorize(&self) -> Result<Url> {
        let url = self.grant.authorization_url(self.port)?;

        tracing::info!(url = %url, "launching browser window");
        if let Err(e) = self.grant.launcher.launch(url.as_str()) {
            tracing::warn!(error = %e, "could not launch a browser");
        }

        Ok(url)
    }

    /// Waits for the redirect and returns the captured token.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Timeout`] once the configured deadline passes,
    /// [`UaaError::AuthorizationDenied`] if the provider redirected with an
    /// error, and [`UaaError::ListenerClosed`] if the listener stopped early.
    pub async fn done(self) -> Result<TokenResponse> {
        let Self {
            done_rx,
            abandon_tx,
            port,
            ..
        } = self;

        let outcome = done_rx.await;
        drop(abandon_tx);

        match outcome {
            Ok(result) => {
                if result.is_ok() {
                    tracing::info!(port, "implicit grant completed");
                }
                result
            }
            Err(_) => Err(UaaError::ListenerClosed.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::browser::MockBrowserLauncher;

    fn grant_config(base_url: &str, port: u16) -> ImplicitGrantConfig {
        ImplicitGrantConfig {
            base_url: base_url.to_string(),
            client_id: "cf".to_string(),
            scope: "openid scim.read".to_string(),
            token_format: TokenFormat::Jwt,
            port,
            timeout: Some(Duration::from_secs(10)),
        }
    }

    fn no_browser() -> MockBrowserLauncher {
        let mut launcher = MockBrowserLauncher::new();
        launcher.expect_launch().times(0);
        launcher
    }

    #[test]
    fn test_authorization_url_carries_request_parameters() {
        let grant = ImplicitGrant::new(grant_config("https://login.example.com/uaa", 0), no_browser());
        let url = grant.authorization_url(9090).unwrap();

        assert_eq!(url.path(), "/uaa/oauth/authorize");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("response_type".to_string(), "token".to_string()),
                ("client_id".to_string(), "cf".to_string()),
                ("scope".to_string(), "openid scim.read".to_string()),
                ("token_format".to_string(), "jwt".to_string()),
                ("redirect_uri".to_string(), "http://localhost:9090".to_string()),
            ]
        );
    }

    #[test]
    fn test_captured_parameters_become_token() {
        let params = CapturedParameters::from_query(
            "access_token=tok&token_type=bearer&scope=a+b&jti=j1&expires_in=120",
        );
        let token = TokenResponse::try_from(params).unwrap();
        assert_eq!(
            token,
            TokenResponse {
                access_token: "tok".to_string(),
                token_type: "bearer".to_string(),
                scope: "a b".to_string(),
                jti: "j1".to_string(),
                expires_in: 120,
            }
        );
    }

    #[test]
    fn test_missing_or_invalid_expiry_is_zero() {
        let missing = TokenResponse::try_from(CapturedParameters::from_query("access_token=tok")).unwrap();
        assert_eq!(missing.expires_in, 0);

        let invalid = TokenResponse::try_from(CapturedParameters::from_query(
            "access_token=tok&expires_in=soon",
        ))
        .unwrap();
        assert_eq!(invalid.expires_in, 0);
        assert_eq!(invalid.access_token, "tok");
    }

    #[test]
    fn test_error_redirect_is_denied() {
        let params = CapturedParameters::from_query(
            "error=access_denied&error_description=User+denied+access",
        );
        assert!(is_complete(&params));

        let err = TokenResponse::try_from(params).unwrap_err();
        match err.downcast_ref::<UaaError>() {
            Some(UaaError::AuthorizationDenied(reason)) => {
                assert_eq!(reason, "access_denied: User denied access")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_conversion_page_renders_listener_answer() {
        let page = callback_page().conversion_page();
        assert!(page.contains(r##"location.hash.replace("#","?")"##));
        assert!(page.contains("req.onload"));
        assert!(page.contains("document.write(req.responseText)"));
        assert!(page.contains("Passing the token to uaactl"));

        let terminal = callback_page().terminal_page();
        assert!(terminal.contains("Implicit Grant: Success"));
        assert!(!terminal.contains("<script>"));
    }

    #[test]
    fn test_completion_requires_token_value() {
        assert!(!is_complete(&CapturedParameters::from_query("")));
        assert!(!is_complete(&CapturedParameters::from_query("access_token=")));
        assert!(is_complete(&CapturedParameters::from_query("access_token=t")));
    }

    #[tokio::test]
    async fn test_malformed_base_fails_before_binding_or_launching() {
        let grant = ImplicitGrant::new(grant_config("not a url", 0), no_browser());
        let err = grant.start().await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_bind_failure_never_launches_browser() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let grant = ImplicitGrant::new(grant_config("https://login.example.com", port), no_browser());
        let err = grant.start().await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Bind { .. })
        ));
    }

    #[tokio::test]
    async fn test_authorize_launches_with_bound_port() {
        let mut launcher = MockBrowserLauncher::new();
        launcher
            .expect_launch()
            .withf(|url| url.contains("response_type=token") && !url.ends_with("localhost%3A0"))
            .times(1)
            .returning(|_| Ok(()));

        let grant = ImplicitGrant::new(grant_config("https://login.example.com", 0), launcher);
        let pending = grant.start().await.unwrap();
        let url = pending.authorize().unwrap();

        let redirect = format!("http://localhost:{}", pending.port());
        assert!(url.query_pairs().any(|(k, v)| k == "redirect_uri" && v == redirect));
    }

    #[tokio::test]
    async fn test_launch_failure_still_returns_url() {
        let mut launcher = MockBrowserLauncher::new();
        launcher
            .expect_launch()
            .times(1)
            .returning(|_| Err(UaaError::Browser("no display".to_string()).into()));

        let grant = ImplicitGrant::new(grant_config("https://login.example.com", 0), launcher);
        let pending = grant.start().await.unwrap();
        assert!(pending.authorize().is_ok());
    }

    #[tokio::test]
    async fn test_deadline_yields_timeout() {
        let mut config = grant_config("https://login.example.com", 0);
        config.timeout = Some(Duration::from_millis(100));

        let pending = ImplicitGrant::new(config, no_browser()).start().await.unwrap();
        let err = pending.done().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Timeout(_))
        ));
    }
}
