//! Test utilities for uaactl
//!
//! This module provides common test utilities including temporary directory
//! management, preconfigured sessions, and assertion helpers.

use tempfile::TempDir;

use crate::config::{AuthContext, Config};
use crate::error::Result;
use crate::uaa::TokenResponse;

/// Create a temporary directory for testing
///
/// # Returns
///
/// Returns a TempDir that will be cleaned up when dropped
pub fn temp_dir() -> TempDir {
    TempDir::new().expect("Failed to create temporary directory")
}

/// Create a configuration targeting `url` with an active context holding
/// `access_token`.
///
/// An empty `access_token` still creates the context, which is how tests
/// exercise the missing-token path.
pub fn config_with_token(url: &str, access_token: &str) -> Config {
    let mut config = Config::with_target_url(url);
    config
        .add_context(AuthContext::new(
            "admin",
            "",
            "client_credentials",
            TokenResponse {
                access_token: access_token.to_string(),
                token_type: "bearer".to_string(),
                ..Default::default()
            },
        ))
        .expect("target was just added");
    config
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: Result<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = format!("{:#}", e);
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UaaError;

    #[test]
    fn test_temp_dir_creation() {
        let dir = temp_dir();
        assert!(dir.path().exists());
    }

    #[test]
    fn test_config_with_token() {
        let config = config_with_token("http://localhost:1", "tok");
        assert_eq!(config.target_url(), "http://localhost:1");
        assert_eq!(config.active_context().unwrap().token.access_token, "tok");
    }

    #[test]
    fn test_assert_error_contains_success() {
        let result: Result<()> = Err(UaaError::Config("test error message".to_string()).into());
        assert_error_contains(result, "test error");
    }

    #[test]
    #[should_panic(expected = "Expected error containing")]
    fn test_assert_error_contains_ok() {
        let result: Result<()> = Ok(());
        assert_error_contains(result, "error");
    }

    #[test]
    #[should_panic(expected = "does not contain")]
    fn test_assert_error_contains_wrong_message() {
        let result: Result<()> = Err(UaaError::Config("different error".to_string()).into());
        assert_error_contains(result, "not present");
    }
}
