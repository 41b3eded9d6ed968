//! Browser session boundary.
//!
//! Every component takes an explicit session handle instead of mutating a
//! shared driver, so independent posts can run on independent sessions.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gramflow_common::content_hash;
use tracing::debug;
use webdriver_client::WebDriverSession;

/// WebDriver key strings for the keys the engine dispatches.
pub mod keys {
    pub const ARROW_RIGHT: &str = "\u{E014}";
}

/// DOM snapshot of the currently rendered page.
#[derive(Debug, Clone)]
pub struct PageState {
    pub url: String,
    pub html: String,
}

impl PageState {
    /// Stable fingerprint of the rendered DOM. Deliberately ignores the URL:
    /// a positional re-address changes the URL without changing the carousel
    /// when no further position exists, and that must not count as progress.
    pub fn fingerprint(&self) -> String {
        content_hash(self.html.as_bytes())
    }
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    /// Snapshot of the current DOM and URL.
    async fn page_state(&self) -> Result<PageState>;

    /// Click the first element matching a CSS selector. `Ok(false)` when no
    /// element matched; `Err` only on session-level failure.
    async fn click(&self, css: &str) -> Result<bool>;

    /// Dispatch one key press to the focused content element.
    async fn send_key(&self, key: &str) -> Result<()>;

    /// Press-move-release gesture between viewport coordinates.
    async fn pointer_drag(&self, from: (i64, i64), to: (i64, i64)) -> Result<()>;

    /// Block until the page has had `timeout` to settle.
    async fn wait_settled(&self, timeout: Duration) -> Result<()>;
}

/// `BrowserSession` backed by a remote WebDriver session.
pub struct WebDriverBrowser {
    session: WebDriverSession,
}

impl WebDriverBrowser {
    pub fn new(session: WebDriverSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl BrowserSession for WebDriverBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        debug!(url, "Navigating");
        self.session
            .navigate(url)
            .await
            .context("WebDriver navigate failed")
    }

    async fn page_state(&self) -> Result<PageState> {
        let url = self
            .session
            .current_url()
            .await
            .context("WebDriver current_url failed")?;
        let html = self
            .session
            .page_source()
            .await
            .context("WebDriver page_source failed")?;
        Ok(PageState { url, html })
    }

    async fn click(&self, css: &str) -> Result<bool> {
        let Some(element) = self
            .session
            .find_element(css)
            .await
            .context("WebDriver find_element failed")?
        else {
            return Ok(false);
        };
        self.session
            .click(&element)
            .await
            .context("WebDriver click failed")?;
        Ok(true)
    }

    async fn send_key(&self, key: &str) -> Result<()> {
        self.session
            .send_key(key)
            .await
            .context("WebDriver key dispatch failed")
    }

    async fn pointer_drag(&self, from: (i64, i64), to: (i64, i64)) -> Result<()> {
        self.session
            .pointer_drag(from, to)
            .await
            .context("WebDriver pointer actions failed")
    }

    async fn wait_settled(&self, timeout: Duration) -> Result<()> {
        tokio::time::sleep(timeout).await;
        Ok(())
    }
}
