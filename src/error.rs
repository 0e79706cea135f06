//! Error types for uaactl
//!
//! This module defines the error taxonomy shared by the request layer, the
//! implicit-grant capture subsystem and the command handlers, using
//! `thiserror` for ergonomic error handling.
//!
//! Upstream failures are reported with deliberately generic messages that
//! identify the called URL but never the transport internals. The status code
//! of a failed call is kept on the error value so callers can still branch on
//! it (see [`UaaError::is_not_found`]).

use std::time::Duration;

use thiserror::Error;

/// Main error type for uaactl operations
#[derive(Error, Debug)]
pub enum UaaError {
    /// Configuration-related errors, including malformed target URLs
    #[error("Configuration error: {0}")]
    Config(String),

    /// The local redirect listener could not bind its port
    #[error("could not start the callback listener on port {port}: {message}")]
    Bind {
        /// Port that was requested
        port: u16,
        /// Reason reported by the operating system
        message: String,
    },

    /// A non-2xx response or transport failure from an upstream call
    #[error("an unknown error occurred while calling {url}")]
    Request {
        /// The URL that was called
        url: String,
        /// HTTP status when the server answered; `None` for transport failures
        status: Option<u16>,
    },

    /// An authenticated call was attempted without a token in context
    #[error("an access token is required to call {url}")]
    MissingToken {
        /// The URL that would have been called
        url: String,
    },

    /// The server answered with a body that does not match the expected shape
    #[error("an unknown error occurred while parsing response from {url}")]
    Parse {
        /// The URL whose response could not be parsed
        url: String,
    },

    /// The browser redirect did not arrive before the deadline
    #[error("no authorization response was received within {0:?}")]
    Timeout(Duration),

    /// The callback listener stopped without delivering a result
    #[error("the callback listener stopped before a token was received")]
    ListenerClosed,

    /// The identity provider redirected back with an OAuth error
    #[error("the authorization server denied the request: {0}")]
    AuthorizationDenied(String),

    /// The platform browser could not be launched
    #[error("Browser launch error: {0}")]
    Browser(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl UaaError {
    /// Returns `true` when this is an upstream failure that answered 404.
    pub fn is_not_found(&self) -> bool {
        matches!(self, UaaError::Request { status: Some(404), .. })
    }
}

/// Result type alias for uaactl operations
///
/// Uses `anyhow::Error` so handlers can attach context while typed
/// [`UaaError`] values remain recoverable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_display_names_url_only() {
        let error = UaaError::Request {
            url: "https://uaa.example.com/Users".to_string(),
            status: Some(500),
        };
        assert_eq!(
            error.to_string(),
            "an unknown error occurred while calling https://uaa.example.com/Users"
        );
        assert!(!error.to_string().contains("500"));
    }

    #[test]
    fn test_missing_token_display() {
        let error = UaaError::MissingToken {
            url: "https://uaa.example.com/userinfo".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "an access token is required to call https://uaa.example.com/userinfo"
        );
    }

    #[test]
    fn test_parse_error_display() {
        let error = UaaError::Parse {
            url: "https://uaa.example.com/token_keys".to_string(),
        };
        assert!(error
            .to_string()
            .contains("an unknown error occurred while parsing response from"));
    }

    #[test]
    fn test_is_not_found_only_for_404_requests() {
        let not_found = UaaError::Request {
            url: "u".to_string(),
            status: Some(404),
        };
        let server_error = UaaError::Request {
            url: "u".to_string(),
            status: Some(500),
        };
        let transport = UaaError::Request {
            url: "u".to_string(),
            status: None,
        };
        assert!(not_found.is_not_found());
        assert!(!server_error.is_not_found());
        assert!(!transport.is_not_found());
        assert!(!UaaError::ListenerClosed.is_not_found());
    }

    #[test]
    fn test_bind_error_display() {
        let error = UaaError::Bind {
            port: 8080,
            message: "address in use".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "could not start the callback listener on port 8080: address in use"
        );
    }

    #[test]
    fn test_config_error_display() {
        let error = UaaError::Config("invalid target".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid target");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: UaaError = io_error.into();
        assert!(matches!(error, UaaError::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UaaError>();
    }

    #[test]
    fn test_downcast_through_anyhow() {
        let result: Result<()> = Err(UaaError::ListenerClosed.into());
        let err = result.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UaaError>(),
            Some(UaaError::ListenerClosed)
        ));
    }
}
