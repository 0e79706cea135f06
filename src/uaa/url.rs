//! Target URL construction shared by the request layer and the
//! authorization URL builder.

use url::Url;

use crate::error::{Result, UaaError};

/// Joins `path` onto the target `base` URL.
///
/// Any path already present on the base is kept, and exactly one slash
/// separates it from `path`. Bases that cannot be parsed, or that cannot carry
/// a path (e.g. `mailto:`), are configuration errors.
///
/// # Examples
///
/// ```
/// use uaactl::uaa::build_url;
///
/// let url = build_url("https://login.example.com/uaa/", "/oauth/authorize").unwrap();
/// assert_eq!(url.as_str(), "https://login.example.com/uaa/oauth/authorize");
///
/// assert!(build_url("not a url", "/info").is_err());
/// ```
pub fn build_url(base: &str, path: &str) -> Result<Url> {
    let mut url = Url::parse(base)
        .map_err(|e| UaaError::Config(format!("invalid target URL {base:?}: {e}")))?;

    if url.cannot_be_a_base() {
        return Err(UaaError::Config(format!("invalid target URL {base:?}: not a base URL")).into());
    }

    let joined = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    url.set_path(&joined);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}

/// Like [`build_url`], then attaches a pre-encoded query string.
///
/// An empty `query` leaves the URL without a `?`.
pub fn build_url_with_query(base: &str, path: &str, query: &str) -> Result<Url> {
    let mut url = build_url(base, path)?;
    let query = query.trim_start_matches('?');
    if !query.is_empty() {
        url.set_query(Some(query));
    }
    Ok(url)
}
