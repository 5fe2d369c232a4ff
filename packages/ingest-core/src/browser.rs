//! Browser transport seam and the run-scoped session.
//!
//! The rendering engine itself is an external collaborator: the engine
//! only sees the [`BrowserPage`] primitives (navigate, wait, click,
//! scroll, evaluate). [`BrowserSession`] layers the shared behaviors on
//! top (identity rotation, cookie consent, lazy-load scrolling) and
//! is acquired once per run and released on every exit path.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::thread_rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DelayRange;
use crate::error::{BrowserError, BrowserResult};
use crate::pacing::{sample_range, PacingPolicy, PacingProfile};

/// What to wait for after navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaitStrategy {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

/// A matched DOM element, reduced to its attributes and text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageElement {
    /// Element attributes by name.
    pub attributes: HashMap<String, String>,

    /// Text content, when requested by the selector strategy.
    pub text: Option<String>,
}

impl PageElement {
    /// Create an empty element.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an attribute, builder-style.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Set the text content, builder-style.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Look up an attribute.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// One rendering-engine page, exposed as primitives.
///
/// Implementations wrap a real driver (e.g. a chromiumoxide `Page`);
/// tests use the scripted mock in [`crate::testing`].
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Navigate and wait for the given load state.
    async fn navigate(
        &self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> BrowserResult<()>;

    /// Wait for a selector to be attached; `Ok(false)` on timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> BrowserResult<bool>;

    /// Whether any match for the selector is currently visible.
    async fn is_visible(&self, selector: &str) -> BrowserResult<bool>;

    /// Click the first match for the selector.
    async fn click(&self, selector: &str) -> BrowserResult<()>;

    /// Wait for network quiescence.
    async fn wait_for_network_idle(&self, timeout: Duration) -> BrowserResult<()>;

    /// Evaluate a script and return its JSON value.
    async fn evaluate(&self, script: &str) -> BrowserResult<serde_json::Value>;

    /// All matches for a selector, as attribute/text data.
    async fn query_all(&self, selector: &str) -> BrowserResult<Vec<PageElement>>;

    /// Full-page visual snapshot for diagnostics.
    async fn screenshot(&self) -> BrowserResult<Vec<u8>>;

    /// URL the page currently points at.
    async fn current_url(&self) -> String;

    /// Close the page.
    async fn close(&self) -> BrowserResult<()>;
}

/// Factory for pages; the browser process itself lives behind it.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Open a page with the given client identity.
    async fn open_page(&self, user_agent: &str) -> BrowserResult<Box<dyn BrowserPage>>;
}

/// The run-scoped browser session.
pub struct BrowserSession {
    page: Box<dyn BrowserPage>,
    user_agent: String,
}

impl BrowserSession {
    /// Acquire a session with a randomly rotated client identity.
    pub async fn open(browser: &dyn Browser, user_agents: &[String]) -> BrowserResult<Self> {
        let user_agent = user_agents
            .choose(&mut thread_rng())
            .cloned()
            .ok_or_else(|| BrowserError::Navigation {
                url: String::new(),
                reason: "no user agents configured".to_string(),
            })?;
        let page = browser.open_page(&user_agent).await?;
        info!(%user_agent, "browser session opened");
        Ok(Self { page, user_agent })
    }

    /// The primitives of the underlying page.
    pub fn page(&self) -> &dyn BrowserPage {
        self.page.as_ref()
    }

    /// The identity this session presents.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Navigate to a listing page.
    pub async fn navigate(
        &self,
        url: &str,
        wait: WaitStrategy,
        timeout: Duration,
    ) -> BrowserResult<()> {
        info!(%url, "navigating");
        self.page.navigate(url, wait, timeout).await?;
        debug!(%url, "navigation complete");
        Ok(())
    }

    /// Try each consent selector and click the first visible one, then
    /// wait for network quiescence and pause. A no-op when no selector
    /// is visible, never an error.
    pub async fn handle_cookie_consent(
        &self,
        selectors: &[String],
        timeout: Duration,
        pacing: &PacingPolicy,
    ) -> bool {
        for selector in selectors {
            match self.page.is_visible(selector).await {
                Ok(true) => {}
                Ok(false) => continue,
                Err(e) => {
                    debug!(%selector, error = %e, "consent visibility check failed");
                    continue;
                }
            }
            info!(%selector, "cookie consent detected, accepting");
            if let Err(e) = self.page.click(selector).await {
                warn!(%selector, error = %e, "consent click failed, continuing without it");
                return false;
            }
            if let Err(e) = self.page.wait_for_network_idle(timeout).await {
                debug!(error = %e, "network did not settle after consent click");
            }
            pacing.pause(PacingProfile::PerElement).await;
            return true;
        }
        debug!("no cookie consent popup detected");
        false
    }

    /// Trigger lazy-loading by scrolling to the document's current
    /// height, polling height between scrolls. Stops when the height is
    /// unchanged twice in a row or `max_scrolls` is reached. Returns
    /// whether any growth occurred.
    pub async fn scroll_to_bottom(
        &self,
        max_scrolls: u32,
        delay: DelayRange,
    ) -> BrowserResult<bool> {
        let mut previous = self.document_height().await?;
        let mut unchanged = 0u32;
        let mut grew = false;

        for scroll in 1..=max_scrolls {
            self.page
                .evaluate("window.scrollTo(0, document.body.scrollHeight)")
                .await?;
            tokio::time::sleep(sample_range(delay)).await;

            let height = self.document_height().await?;
            if (height - previous).abs() < f64::EPSILON {
                unchanged += 1;
                if unchanged >= 2 {
                    debug!(scroll, "page height settled, stopping scroll");
                    break;
                }
            } else {
                unchanged = 0;
                grew = true;
                debug!(scroll, height, "page grew after scroll");
            }
            previous = height;
        }
        Ok(grew)
    }

    async fn document_height(&self) -> BrowserResult<f64> {
        let value = self.page.evaluate("document.body.scrollHeight").await?;
        Ok(value.as_f64().unwrap_or_default())
    }

    /// Release the session. Called on every exit path of a run.
    pub async fn close(self) -> BrowserResult<()> {
        info!("closing browser session");
        self.page.close().await
    }
}
