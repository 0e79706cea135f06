//! Browser-mediated token capture
//!
//! # Module Layout
//!
//! - [`callback`] -- single-use loopback listener that receives the redirect
//! - [`implicit`] -- implicit-grant orchestration on top of the listener
//! - [`browser`]  -- platform browser launching

pub mod browser;
pub mod callback;
pub mod implicit;

pub use browser::{BrowserLauncher, SystemBrowser};
pub use callback::{CallbackListener, CallbackPage, CallbackServer, CapturedParameters};
pub use implicit::{ImplicitGrant, ImplicitGrantConfig, PendingImplicitGrant};
