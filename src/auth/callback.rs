//! Single-use local HTTP listener for browser redirects
//!
//! The listener moves through `Idle -> Listening -> Captured -> Stopped`,
//! expressed as types:
//!
//! - [`CallbackServer`] is idle: it only knows its page, port and completion
//!   predicate.
//! - [`CallbackServer::listen`] binds the port on every loopback address
//!   `localhost` may resolve to and yields a [`CallbackListener`]. A bind
//!   failure is returned immediately.
//! - [`CallbackListener::capture`] serves requests until one satisfies the
//!   predicate, hands its query parameters back, and tears the socket down.
//!
//! A request that does not satisfy the predicate gets the conversion page,
//! whose script re-requests `/` with the URL fragment as the query string.
//! Browsers never send fragments, so this is how a fragment-carried token
//! reaches the server. Once a result has been captured every further request
//! gets the terminal page and nothing is delivered again.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{RawQuery, State};
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinSet;
use tokio::sync::{oneshot, watch, Mutex};

use crate::error::{Result, UaaError};

/// How long in-flight responses may take to finish once a result is captured.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Attempts at finding a port free on both loopback addresses when the OS
/// picks it.
const EPHEMERAL_BIND_ATTEMPTS: usize = 5;

/// Query parameters captured from the converted redirect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedParameters(HashMap<String, String>);

impl CapturedParameters {
    /// Parses a `application/x-www-form-urlencoded` query string.
    ///
    /// Values are percent-decoded; the last occurrence of a repeated key wins.
    ///
    /// # Examples
    ///
    /// ```
    /// use uaactl::auth::CapturedParameters;
    ///
    /// let params = CapturedParameters::from_query("access_token=tok&scope=openid+scim.read");
    /// assert_eq!(params.get("access_token"), Some("tok"));
    /// assert_eq!(params.get("scope"), Some("openid scim.read"));
    /// assert_eq!(params.get("jti"), None);
    /// ```
    pub fn from_query(query: &str) -> Self {
        Self(
            url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
                .into_owned()
                .collect(),
        )
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns `true` when `key` is present with a non-empty value.
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Number of captured parameters.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` when nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Decides whether a request carries the result the listener waits for.
pub type CompletionPredicate = Arc<dyn Fn(&CapturedParameters) -> bool + Send + Sync>;

/// The fragments the listener assembles into its two pages.
#[derive(Debug, Clone)]
pub struct CallbackPage {
    /// Stylesheet shared by both pages, including its `<style>` element
    pub css: String,
    /// Body shown while the fragment is being forwarded
    pub pending_html: String,
    /// Script that converts the fragment into a query, including `<script>`
    pub script: String,
    /// Body shown once the result has been captured
    pub complete_html: String,
}

impl CallbackPage {
    /// Page served to requests that do not complete the capture.
    pub fn conversion_page(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n{}\n</head>\n{}\n{}\n</html>\n",
            self.css, self.pending_html, self.script
        )
    }

    /// Page served to the completing request and everything after it.
    pub fn terminal_page(&self) -> String {
        format!(
            "<!DOCTYPE html>\n<html>\n<head>\n{}\n</head>\n{}\n</html>\n",
            self.css, self.complete_html
        )
    }
}

/// An unbound callback listener.
pub struct CallbackServer {
    page: CallbackPage,
    port: u16,
    is_complete: CompletionPredicate,
}

impl CallbackServer {
    /// Creates a listener for `port` (`0` lets the OS choose).
    pub fn new<P>(page: CallbackPage, port: u16, is_complete: P) -> Self
    where
        P: Fn(&CapturedParameters) -> bool + Send + Sync + 'static,
    {
        Self {
            page,
            port,
            is_complete: Arc::new(is_complete),
        }
    }

    /// Binds the port on `127.0.0.1` and, where IPv6 is available, `[::1]`.
    ///
    /// The redirect URI names `localhost`, which browsers may resolve to
    /// either address, so the port has to be ours on both.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Bind`] if the port is in use on either address or
    /// not permitted.
    pub async fn listen(self) -> Result<CallbackListener> {
        let (listeners, port) = self.bind_loopback().await?;

        tracing::info!(port, addresses = listeners.len(), "callback listener bound");

        let (capture_tx, capture_rx) = oneshot::channel();
        let state = Arc::new(CallbackState {
            page: self.page,
            is_complete: self.is_complete,
            capture_tx: Mutex::new(Some(capture_tx)),
        });

        Ok(CallbackListener {
            listeners,
            port,
            state,
            capture_rx,
        })
    }

    async fn bind_loopback(&self) -> Result<(Vec<TcpListener>, u16)> {
        let attempts = if self.port == 0 {
            EPHEMERAL_BIND_ATTEMPTS
        } else {
            1
        };

        let mut last_error = None;
        for _ in 0..attempts {
            let ipv4 = TcpListener::bind(SocketAddr::from((Ipv4Addr::LOCALHOST, self.port)))
                .await
                .map_err(|e| self.bind_error(&e))?;
            let port = ipv4
                .local_addr()
                .map_err(|e| self.bind_error(&e))?
                .port();

            match TcpListener::bind(SocketAddr::from((Ipv6Addr::LOCALHOST, port))).await {
                Ok(ipv6) => return Ok((vec![ipv4, ipv6], port)),
                Err(e) if e.kind() == ErrorKind::AddrInUse => {
                    tracing::debug!(port, "port already taken on [::1]");
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::debug!(port, error = %e, "IPv6 loopback unavailable, listening on 127.0.0.1 only");
                    return Ok((vec![ipv4], port));
                }
            }
        }

        let message = last_error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "address in use".to_string());
        Err(UaaError::Bind {
            port: self.port,
            message,
        }
        .into())
    }

    fn bind_error(&self, e: &std::io::Error) -> UaaError {
        UaaError::Bind {
            port: self.port,
            message: e.to_string(),
        }
    }
}

/// A bound callback listener waiting to serve.
pub struct CallbackListener {
    listeners: Vec<TcpListener>,
    port: u16,
    state: Arc<CallbackState>,
    capture_rx: oneshot::Receiver<CapturedParameters>,
}

impl CallbackListener {
    /// The port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serves until a request completes the capture, then stops.
    ///
    /// With a `deadline`, gives up once it elapses. The sockets are closed before
    /// this returns, whatever the outcome. Dropping the returned future also
    /// closes the sockets.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Timeout`] when the deadline elapses and
    /// [`UaaError::ListenerClosed`] when the server stops on its own.
    pub async fn capture(self, deadline: Option<Duration>) -> Result<CapturedParameters> {
        let Self {
            listeners,
            port,
            state,
            capture_rx,
        } = self;

        let (shutdown_tx, shutdown_rx) = watch::channel(());
        let router = Router::new()
            .route("/", get(handle_callback))
            .with_state(state);

        let mut servers = JoinSet::new();
        for listener in listeners {
            let mut shutdown = shutdown_rx.clone();
            let server = axum::serve(listener, router.clone())
                .with_graceful_shutdown(async move {
                    let _ = shutdown.changed().await;
                })
                .into_future();
            servers.spawn(server);
        }

        let server = serve_until_stopped(&mut servers);
        tokio::pin!(server);

        let outcome = tokio::select! {
            captured = wait_for_capture(capture_rx, deadline) => captured,
            served = &mut server => {
                if let Err(e) = served {
                    tracing::warn!(port, error = %e, "callback listener failed");
                }
                return Err(UaaError::ListenerClosed.into());
            }
        };

        let _ = shutdown_tx.send(());
        drop(shutdown_tx);
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(port, error = %e, "callback listener shut down with an error"),
            Err(_) => tracing::debug!(port, "closing callback connections still open"),
        }
        tracing::info!(port, "callback listener stopped");

        outcome.map_err(Into::into)
    }
}

/// Resolves when every server has stopped, with the first error seen.
async fn serve_until_stopped(servers: &mut JoinSet<std::io::Result<()>>) -> std::io::Result<()> {
    let mut outcome = Ok(());
    while let Some(joined) = servers.join_next().await {
        let served = joined.map_err(|e| std::io::Error::new(ErrorKind::Other, e)).and_then(|served| served);
        if outcome.is_ok() {
            outcome = served;
        }
    }
    outcome
}

async fn wait_for_capture(
    capture_rx: oneshot::Receiver<CapturedParameters>,
    deadline: Option<Duration>,
) -> std::result::Result<CapturedParameters, UaaError> {
    match deadline {
        Some(limit) => match tokio::time::timeout(limit, capture_rx).await {
            Ok(received) => received.map_err(|_| UaaError::ListenerClosed),
            Err(_) => Err(UaaError::Timeout(limit)),
        },
        None => capture_rx.await.map_err(|_| UaaError::ListenerClosed),
    }
}

struct CallbackState {
    page: CallbackPage,
    is_complete: CompletionPredicate,
    capture_tx: Mutex<Option<oneshot::Sender<CapturedParameters>>>,
}

async fn handle_callback(
    State(state): State<Arc<CallbackState>>,
    RawQuery(query): RawQuery,
) -> Html<String> {
    let params = CapturedParameters::from_query(query.as_deref().unwrap_or_default());

    // Held for the whole decision so racing requests cannot both deliver.
    let mut capture_tx = state.capture_tx.lock().await;

    if capture_tx.is_none() {
        tracing::debug!("result already captured, ignoring request");
        return Html(state.page.terminal_page());
    }

    if !(state.is_complete)(&params) {
        tracing::debug!("serving fragment conversion page");
        return Html(state.page.conversion_page());
    }

    if let Some(tx) = capture_tx.take() {
        tracing::debug!(parameters = params.len(), "callback captured");
        if tx.send(params).is_err() {
            tracing::warn!("nothing is waiting for the captured callback");
        }
    }

    Html(state.page.terminal_page())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_page() -> CallbackPage {
        CallbackPage {
            css: "<style>html { background: #f8f8f8; }</style>".to_string(),
            pending_html: "<body><h1>Pending</h1></body>".to_string(),
            script: "<script>location.hash</script>".to_string(),
            complete_html: "<body><h1>Done</h1></body>".to_string(),
        }
    }

    fn token_server(port: u16) -> CallbackServer {
        CallbackServer::new(test_page(), port, |p: &CapturedParameters| {
            p.has_value("access_token")
        })
    }

    fn http() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    #[test]
    fn test_from_query_decodes_values() {
        let params = CapturedParameters::from_query("?scope=a%20b&token_type=bearer&flag");
        assert_eq!(params.get("scope"), Some("a b"));
        assert_eq!(params.get("token_type"), Some("bearer"));
        assert_eq!(params.get("flag"), Some(""));
        assert!(!params.has_value("flag"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn test_from_empty_query() {
        assert!(CapturedParameters::from_query("").is_empty());
    }

    #[test]
    fn test_pages_differ_only_in_script_and_body() {
        let page = test_page();
        let conversion = page.conversion_page();
        let terminal = page.terminal_page();

        assert!(conversion.contains("location.hash"));
        assert!(conversion.contains("Pending"));
        assert!(!terminal.contains("<script>"));
        assert!(terminal.contains("Done"));
        assert!(terminal.contains("<style>"));
    }

    #[tokio::test]
    async fn test_listen_on_port_zero_reports_assigned_port() {
        let listener = token_server(0).listen().await.unwrap();
        assert_ne!(listener.port(), 0);
    }

    #[tokio::test]
    async fn test_bind_failure_is_reported() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = occupied.local_addr().unwrap().port();

        let err = token_server(port).listen().await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Bind { port: p, .. }) if *p == port
        ));
    }

    #[tokio::test]
    async fn test_port_taken_on_ipv6_loopback_is_reported() {
        let Ok(occupied) = std::net::TcpListener::bind("[::1]:0") else {
            return; // no IPv6 loopback on this host
        };
        let port = occupied.local_addr().unwrap().port();

        let err = token_server(port).listen().await.err().unwrap();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Bind { port: p, .. }) if *p == port
        ));
    }

    #[tokio::test]
    async fn test_capture_over_ipv6_loopback() {
        if std::net::TcpListener::bind("[::1]:0").is_err() {
            return; // no IPv6 loopback on this host
        }

        let listener = token_server(0).listen().await.unwrap();
        let port = listener.port();
        let capture = tokio::spawn(listener.capture(Some(Duration::from_secs(10))));

        let body = http()
            .get(format!("http://[::1]:{port}/?access_token=v6"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(body.contains("Done"));

        let captured = capture.await.unwrap().unwrap();
        assert_eq!(captured.get("access_token"), Some("v6"));
    }

    #[tokio::test]
    async fn test_conversion_then_capture() {
        let listener = token_server(0).listen().await.unwrap();
        let base = format!("http://127.0.0.1:{}/", listener.port());
        let capture = tokio::spawn(listener.capture(Some(Duration::from_secs(10))));

        let first = http().get(&base).send().await.unwrap();
        assert!(first.status().is_success());
        let first = first.text().await.unwrap();
        assert!(first.contains("location.hash"));

        let second = http()
            .get(format!("{base}?access_token=tok&token_type=bearer"))
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert!(second.contains("Done"));
        assert!(!second.contains("location.hash"));

        let captured = capture.await.unwrap().unwrap();
        assert_eq!(captured.get("access_token"), Some("tok"));
        assert_eq!(captured.get("token_type"), Some("bearer"));
    }

    #[tokio::test]
    async fn test_concurrent_matching_requests_deliver_once() {
        let listener = token_server(0).listen().await.unwrap();
        let base = format!("http://127.0.0.1:{}/", listener.port());
        let capture = tokio::spawn(listener.capture(Some(Duration::from_secs(10))));

        let client = http();
        let (a, b) = tokio::join!(
            client.get(format!("{base}?access_token=first")).send(),
            client.get(format!("{base}?access_token=second")).send(),
        );

        for response in [a, b].into_iter().flatten() {
            let body = response.text().await.unwrap_or_default();
            assert!(!body.contains("location.hash"));
        }

        let captured = capture.await.unwrap().unwrap();
        let token = captured.get("access_token").unwrap();
        assert!(token == "first" || token == "second");
    }

    #[tokio::test]
    async fn test_deadline_closes_socket() {
        let listener = token_server(0).listen().await.unwrap();
        let port = listener.port();

        let err = listener
            .capture(Some(Duration::from_millis(100)))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::Timeout(_))
        ));

        let rebound = token_server(port).listen().await;
        assert!(rebound.is_ok(), "port should be released after timeout");
    }
}
