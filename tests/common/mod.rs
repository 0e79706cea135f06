use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use uaactl::config::{AuthContext, Config};
use uaactl::uaa::TokenResponse;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
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

/// HTTP client that never routes loopback traffic through a proxy.
#[allow(dead_code)]
pub fn loopback_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("failed to build client")
}
