//! Configuration and session state for uaactl
//!
//! This module handles loading, validating and saving the persisted session
//! file, which records the known targets, the active target, and per target
//! the named auth contexts holding tokens. Environment variables and CLI flags
//! are layered on top after the file is read.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UaaError};
use crate::uaa::TokenResponse;

/// Guidance shown when a command needs a target and none is set.
pub const MISSING_TARGET: &str = "You must set a target in order to use this command.";

/// Guidance shown when a command needs a token and none is stored.
pub const MISSING_CONTEXT: &str = "You must have a token in your context to perform this command.";

/// Main configuration structure for uaactl
///
/// # Examples
///
/// ```
/// use uaactl::config::{AuthContext, Config};
/// use uaactl::uaa::TokenResponse;
///
/// let mut config = Config::with_target_url("https://login.example.com");
/// config.add_context(AuthContext::new(
///     "cf",
///     "",
///     "implicit",
///     TokenResponse {
///         access_token: "tok".to_string(),
///         ..Default::default()
///     },
/// ))
/// .unwrap();
///
/// assert_eq!(config.target_url(), "https://login.example.com");
/// assert_eq!(config.active_context().unwrap().token.access_token, "tok");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Key of the active entry in `targets`
    #[serde(default)]
    pub active_target_name: String,

    /// Known targets, keyed by base URL
    #[serde(default)]
    pub targets: BTreeMap<String, Target>,

    /// Implicit-grant capture settings
    #[serde(default)]
    pub implicit: ImplicitConfig,

    /// Identity-zone subdomain to switch into for this invocation
    #[serde(skip)]
    pub zone_subdomain: Option<String>,

    /// Verbose output for this invocation
    #[serde(skip)]
    pub verbose: bool,
}

/// An identity provider the CLI can talk to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Target {
    /// Base URL of the identity provider
    pub base_url: String,

    /// Accept invalid TLS certificates from this target
    #[serde(default)]
    pub skip_ssl_validation: bool,

    /// Key of the active entry in `contexts`
    #[serde(default)]
    pub active_context_name: String,

    /// Stored auth contexts, keyed by [`AuthContext::name`]
    #[serde(default)]
    pub contexts: BTreeMap<String, AuthContext>,
}

impl Target {
    /// Creates a target with no stored contexts.
    pub fn new(base_url: impl Into<String>, skip_ssl_validation: bool) -> Self {
        Self {
            base_url: base_url.into(),
            skip_ssl_validation,
            ..Default::default()
        }
    }
}

/// A token obtained for a client (and optionally a user) on one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthContext {
    /// OAuth client the token was issued to
    pub client_id: String,

    /// User the token was issued for, empty for client-only grants
    #[serde(default)]
    pub username: String,

    /// Grant that produced the token, e.g. `implicit`
    #[serde(default)]
    pub grant_type: String,

    /// The token itself
    #[serde(flatten)]
    pub token: TokenResponse,
}

impl AuthContext {
    /// Creates a context for the given grant result.
    pub fn new(
        client_id: impl Into<String>,
        username: impl Into<String>,
        grant_type: impl Into<String>,
        token: TokenResponse,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            username: username.into(),
            grant_type: grant_type.into(),
            token,
        }
    }

    /// Key under which the context is stored on its target.
    pub fn name(&self) -> String {
        format!("client:{} user:{}", self.client_id, self.username)
    }
}

/// Implicit-grant capture settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitConfig {
    /// Local port for the redirect listener; `0` picks a free port
    #[serde(default = "default_implicit_port")]
    pub port: u16,

    /// Seconds to wait for the browser redirect; `0` waits indefinitely
    #[serde(default = "default_implicit_timeout")]
    pub timeout_seconds: u64,
}

fn default_implicit_port() -> u16 {
    8080
}

fn default_implicit_timeout() -> u64 {
    300
}

impl Default for ImplicitConfig {
    fn default() -> Self {
        Self {
            port: default_implicit_port(),
            timeout_seconds: default_implicit_timeout(),
        }
    }
}

impl ImplicitConfig {
    /// The capture deadline, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

impl Config {
    /// Creates a configuration whose only (and active) target is `url`.
    pub fn with_target_url(url: impl Into<String>) -> Self {
        let mut config = Self::default();
        config.add_target(Target::new(url, false));
        config
    }

    /// Default location of the session file: `~/.uaactl/config.yaml`.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Config`] if no home directory can be determined.
    pub fn default_path() -> Result<PathBuf> {
        let dirs = directories::BaseDirs::new().ok_or_else(|| {
            UaaError::Config("could not determine the home directory".to_string())
        })?;
        Ok(dirs.home_dir().join(".uaactl").join("config.yaml"))
    }

    /// Load configuration from file with environment and CLI overrides
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| UaaError::Config(format!("Failed to read config file: {}", e)))?;
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&contents)
            .map_err(|e| UaaError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(zone) = std::env::var("UAACTL_ZONE_SUBDOMAIN") {
            if !zone.is_empty() {
                self.zone_subdomain = Some(zone);
            }
        }

        if let Ok(port) = std::env::var("UAACTL_IMPLICIT_PORT") {
            if let Ok(value) = port.parse() {
                self.implicit.port = value;
            } else {
                tracing::warn!("Invalid UAACTL_IMPLICIT_PORT: {}", port);
            }
        }

        if let Ok(timeout) = std::env::var("UAACTL_IMPLICIT_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.implicit.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid UAACTL_IMPLICIT_TIMEOUT_SECONDS: {}", timeout);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let Some(zone) = cli.zone.as_ref().filter(|z| !z.is_empty()) {
            self.zone_subdomain = Some(zone.clone());
        }
        if cli.verbose {
            self.verbose = true;
        }
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns error if the active target or context names an entry that does
    /// not exist.
    pub fn validate(&self) -> Result<()> {
        if self.active_target_name.is_empty() {
            return Ok(());
        }

        let target = self.targets.get(&self.active_target_name).ok_or_else(|| {
            UaaError::Config(format!(
                "active target {} is not among the saved targets",
                self.active_target_name
            ))
        })?;

        if !target.active_context_name.is_empty()
            && !target.contexts.contains_key(&target.active_context_name)
        {
            return Err(UaaError::Config(format!(
                "active context {} is not among the saved contexts of {}",
                target.active_context_name, target.base_url
            ))
            .into());
        }

        Ok(())
    }

    /// Writes the session file, creating its directory if needed.
    ///
    /// On unix the file is readable by the owner only, since it holds tokens.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(UaaError::Io)?;
            }
        }

        let contents = serde_yaml::to_string(self).map_err(UaaError::Yaml)?;
        std::fs::write(path, contents).map_err(UaaError::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(UaaError::Io)?;
        }

        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Adds (or replaces) a target and makes it active.
    ///
    /// Contexts already stored for the same base URL are kept.
    pub fn add_target(&mut self, target: Target) {
        let name = target.base_url.clone();
        match self.targets.get_mut(&name) {
            Some(existing) => existing.skip_ssl_validation = target.skip_ssl_validation,
            None => {
                self.targets.insert(name.clone(), target);
            }
        }
        self.active_target_name = name;
    }

    /// The active target, if one is set.
    pub fn active_target(&self) -> Option<&Target> {
        self.targets.get(&self.active_target_name)
    }

    /// Base URL of the active target, or `""` when none is set.
    pub fn target_url(&self) -> &str {
        self.active_target()
            .map(|t| t.base_url.as_str())
            .unwrap_or("")
    }

    /// Stores `context` on the active target and makes it active.
    ///
    /// # Errors
    ///
    /// Returns [`UaaError::Config`] when no target is set.
    pub fn add_context(&mut self, context: AuthContext) -> Result<()> {
        let target = self
            .targets
            .get_mut(&self.active_target_name)
            .ok_or_else(|| UaaError::Config(MISSING_TARGET.to_string()))?;
        let name = context.name();
        target.contexts.insert(name.clone(), context);
        target.active_context_name = name;
        Ok(())
    }

    /// The active auth context of the active target, if any.
    pub fn active_context(&self) -> Option<&AuthContext> {
        let target = self.active_target()?;
        target.contexts.get(&target.active_context_name)
    }

    /// Fails with [`MISSING_TARGET`] when no target is set.
    pub fn ensure_target(&self) -> Result<()> {
        if self.active_target().is_none() {
            return Err(UaaError::Config(MISSING_TARGET.to_string()).into());
        }
        Ok(())
    }

    /// Fails when no target is set or the target has no active context.
    pub fn ensure_context(&self) -> Result<()> {
        self.ensure_target()?;
        if self.active_context().is_none() {
            return Err(UaaError::Config(MISSING_CONTEXT.to_string()).into());
        }
        Ok(())
    }
}
