//! Platform browser launching

use crate::error::{Result, UaaError};

/// Opens a URL in the user's browser.
///
/// Closures of the form `Fn(&str) -> Result<()>` implement this trait, which
/// is how tests observe the authorization URL without a real browser.
///
/// # Examples
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use uaactl::auth::BrowserLauncher;
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let recorder = {
///     let seen = Arc::clone(&seen);
///     move |url: &str| -> uaactl::error::Result<()> {
///         seen.lock().unwrap().push(url.to_string());
///         Ok(())
///     }
/// };
///
/// recorder.launch("http://localhost:8080/").unwrap();
/// assert_eq!(seen.lock().unwrap().len(), 1);
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait BrowserLauncher: Send + Sync {
    /// Opens `url`; may block briefly while spawning an external process.
    fn launch(&self, url: &str) -> Result<()>;
}

impl<F> BrowserLauncher for F
where
    F: Fn(&str) -> Result<()> + Send + Sync,
{
    fn launch(&self, url: &str) -> Result<()> {
        self(url)
    }
}

/// Launches the operating system's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn launch(&self, url: &str) -> Result<()> {
        let mut command = platform_command(url);
        command
            .spawn()
            .map(|_| ())
            .map_err(|e| UaaError::Browser(format!("{e}")).into())
    }
}

#[cfg(target_os = "macos")]
fn platform_command(url: &str) -> std::process::Command {
    let mut command = std::process::Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn platform_command(url: &str) -> std::process::Command {
    // `cmd /C start` would split the query string on `&`.
    let mut command = std::process::Command::new("rundll32");
    command.args(["url.dll,FileProtocolHandler", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_command(url: &str) -> std::process::Command {
    let mut command = std::process::Command::new("xdg-open");
    command.arg(url);
    command
}
