//! Browser abstraction for driving signup pages.
//!
//! Defines the `BrowserEngine` and `PageSession` traits that abstract over
//! the browser backend (currently Chromium via chromiumoxide). The
//! interpreter and orchestrator only see these traits, so tests drive them
//! with scripted in-memory sessions instead of a real browser.

pub mod chromium;

use crate::adapter::Target;
use crate::error::EngineError;
use crate::proxy::ProxyCredential;
use async_trait::async_trait;
use thiserror::Error;

/// Launch-time options for one browser session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub headless: bool,
    /// Outbound proxy for this session; `None` runs direct.
    pub proxy: Option<ProxyCredential>,
}

/// A low-level page action failure, before the interpreter applies the
/// step's required/optional policy and retry budget.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActionError(pub String);

/// A browser backend that can launch isolated sessions.
#[async_trait]
pub trait BrowserEngine: Send + Sync {
    /// Launch one isolated browser process with a single page.
    async fn launch(&self, opts: &LaunchOptions) -> Result<Box<dyn PageSession>, EngineError>;
}

/// One live page inside one browser process.
///
/// All interaction goes through [`Target`] descriptors; the backend decides
/// how to locate them. Every method is fallible — signup pages are brittle
/// and callers are expected to apply retry policy.
#[async_trait]
pub trait PageSession: Send {
    /// Navigate to a URL, waiting up to `timeout_ms` for the load.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), EngineError>;

    /// Whether the target currently resolves to a visible element.
    async fn is_visible(&mut self, target: &Target) -> Result<bool, ActionError>;

    async fn click(&mut self, target: &Target) -> Result<(), ActionError>;

    async fn fill(&mut self, target: &Target, value: &str) -> Result<(), ActionError>;

    async fn check(&mut self, target: &Target) -> Result<(), ActionError>;

    async fn scroll_into_view(&mut self, target: &Target) -> Result<(), ActionError>;

    /// Release the page and its browser process. Consumes the session so it
    /// cannot be used after close.
    async fn close(self: Box<Self>) -> Result<(), ActionError>;
}
