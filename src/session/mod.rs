//! Remote browser session capability.
//!
//! Agents only see the [`RemoteSession`] and [`SessionConnector`] traits.
//! Two backends implement them:
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | W3C WebDriver | [`webdriver`] | Remote hub or cloud grid, full JS |
//! | Static HTML | [`static_html`] | Plain HTTP fetch, CSS only, no scripts |
//!
//! Every session is owned by exactly one agent for its whole lifetime, so
//! implementations never need internal locking across agents.

pub mod static_html;
pub mod webdriver;

use crate::models::EnvironmentDescriptor;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};

/// How to find elements on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Css(String),
    XPath(String),
}

impl Locator {
    pub fn css(selector: &str) -> Self {
        Locator::Css(selector.to_string())
    }

    pub fn xpath(expr: &str) -> Self {
        Locator::XPath(expr.to_string())
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Css(s) => write!(f, "css:{s}"),
            Locator::XPath(s) => write!(f, "xpath:{s}"),
        }
    }
}

/// Opaque reference to an element inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub(crate) String);

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not open session: {0}")]
    Setup(String),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("remote end returned {status}: {message}")]
    Remote { status: u16, message: String },
    #[error("unexpected response: {0}")]
    Protocol(String),
    #[error("no page loaded")]
    NoPage,
    #[error("stale element {0:?}")]
    StaleElement(ElementHandle),
    #[error("unsupported locator {0}")]
    UnsupportedLocator(Locator),
    #[error("timed out after {0:?} waiting for {1}")]
    Timeout(Duration, Locator),
}

/// The operations an agent needs from a live browser page.
#[async_trait]
pub trait RemoteSession: Send + Sync {
    async fn navigate(&mut self, url: &str) -> Result<(), SessionError>;

    /// Absolute URL of the loaded page after redirects. Relative links on
    /// the page resolve against it.
    async fn current_url(&self) -> Result<String, SessionError>;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>, SessionError>;

    async fn find_all_within(
        &self,
        parent: &ElementHandle,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>, SessionError>;

    /// Visible text of the element.
    async fn text(&self, element: &ElementHandle) -> Result<String, SessionError>;

    /// Attribute (or DOM property) value, `None` when absent.
    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, SessionError>;

    async fn execute(&self, script: &str) -> Result<serde_json::Value, SessionError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), SessionError>;

    async fn close(self: Box<Self>) -> Result<(), SessionError>;

    /// Poll until `locator` matches at least one element or `timeout` passes.
    ///
    /// Always checks at least once, so a zero timeout is a single lookup.
    async fn wait_for(
        &self,
        locator: &Locator,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), SessionError> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find_all(locator).await {
                Ok(found) if !found.is_empty() => return Ok(()),
                Ok(_) => {}
                Err(e @ SessionError::UnsupportedLocator(_)) => return Err(e),
                Err(e) => tracing::debug!(%locator, error = %e, "wait_for lookup failed"),
            }
            if Instant::now() >= deadline {
                return Err(SessionError::Timeout(timeout, locator.clone()));
            }
            sleep(poll).await;
        }
    }
}

/// Opens one session per environment descriptor.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open(
        &self,
        environment: &EnvironmentDescriptor,
    ) -> Result<Box<dyn RemoteSession>, SessionError>;
}
