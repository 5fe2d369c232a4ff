//! Run configuration.
//!
//! A run is driven by one explicitly constructed [`RunConfig`] value,
//! created at startup and passed by reference to every component that
//! needs it. There is no global configuration lookup.

use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::IngestError;
use crate::types::CategoryMap;

/// Selectors for cookie consent and the DOM fallback strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectorConfig {
    /// Cookie-consent buttons, tried in order; clicking is a no-op when
    /// none are visible.
    pub cookie_consent: Vec<String>,

    /// Primary selector for listing items.
    pub dom_primary: String,

    /// Looser selector retried when the primary matches nothing.
    pub dom_secondary: Option<String>,

    /// Attribute carrying the record id, when the site exposes one.
    pub id_attribute: Option<String>,

    /// Regex with one capture group deriving the id from an item link.
    pub id_link_pattern: String,

    /// Origin prepended to relative hrefs.
    pub link_base: Option<String>,
}

impl SelectorConfig {
    /// Compile the id-from-link pattern.
    pub fn id_pattern(&self) -> Result<Regex, IngestError> {
        let pattern = Regex::new(&self.id_link_pattern)
            .map_err(|e| IngestError::Config(format!("invalid id link pattern: {e}")))?;
        if pattern.captures_len() < 2 {
            return Err(IngestError::Config(
                "id link pattern must have one capture group".to_string(),
            ));
        }
        Ok(pattern)
    }
}

/// How to reach the embedded state blob on a rendered page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StateLocator {
    /// A JSON `<script>` tag, e.g. `script[id="__NEXT_DATA__"]`.
    ScriptTag { selector: String },

    /// A window-scoped expression, e.g. `() => window.__SERVER_DATA__`.
    WindowExpression { script: String },
}

/// How page URLs are derived from a category seed URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PageUrlStyle {
    /// The seed URL serves every page; the listing grows via lazy-load.
    SeedOnly,

    /// Page number appended as a query parameter.
    QueryParam { param: String },
}

impl PageUrlStyle {
    /// Build the URL for a given page number.
    pub fn page_url(&self, seed_url: &str, page_number: u32) -> String {
        match self {
            PageUrlStyle::SeedOnly => seed_url.to_string(),
            PageUrlStyle::QueryParam { param } => {
                let joiner = if seed_url.contains('?') { '&' } else { '?' };
                format!("{seed_url}{joiner}{param}={page_number}")
            }
        }
    }
}

/// Inclusive delay interval in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    /// Create a new range.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }
}

/// Delay profiles for the pacing policy.
///
/// Purely a throttling mechanism against anti-automation defenses; it
/// carries no correctness obligation and can be disabled wholesale for
/// deterministic tests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Master switch; when false every delay is zero.
    pub enabled: bool,

    /// Between listing pages of one category.
    pub inter_page: DelayRange,

    /// Between categories.
    pub inter_category: DelayRange,

    /// Between individual elements on a page.
    pub per_element: DelayRange,

    /// After a recoverable error, longer than the others.
    pub error_backoff: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            inter_page: DelayRange::new(5_000, 12_000),
            inter_category: DelayRange::new(3_000, 6_000),
            per_element: DelayRange::new(500, 2_000),
            error_backoff: DelayRange::new(12_000, 20_000),
        }
    }
}

impl PacingConfig {
    /// A config with all delays disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Complete configuration for one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Source tag stamped on every output record (e.g. "Meetup").
    pub source: String,

    /// Ordered category → seed URL mapping.
    pub categories: CategoryMap,

    /// Selector set for consent handling and DOM extraction.
    pub selectors: SelectorConfig,

    /// Where the embedded state blob lives.
    pub state_locator: StateLocator,

    /// How page URLs are derived.
    pub page_url_style: PageUrlStyle,

    /// Navigation timeout in milliseconds.
    pub navigation_timeout_ms: u64,

    /// Element/selector wait timeout in milliseconds.
    pub element_timeout_ms: u64,

    /// Maximum lazy-load scrolls per page.
    pub max_scrolls: u32,

    /// Delay between lazy-load scrolls.
    pub scroll_delay: DelayRange,

    /// Pacing profiles.
    pub pacing: PacingConfig,

    /// User agents; one is picked at random per session.
    pub user_agents: Vec<String>,
}

impl RunConfig {
    /// Create a config with conservative defaults for timing and scrolling.
    pub fn new(
        source: impl Into<String>,
        categories: CategoryMap,
        selectors: SelectorConfig,
        state_locator: StateLocator,
    ) -> Self {
        Self {
            source: source.into(),
            categories,
            selectors,
            state_locator,
            page_url_style: PageUrlStyle::SeedOnly,
            navigation_timeout_ms: 120_000,
            element_timeout_ms: 30_000,
            max_scrolls: 10,
            scroll_delay: DelayRange::new(3_000, 5_000),
            pacing: PacingConfig::default(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36"
                    .to_string(),
            ],
        }
    }

    /// Set the page URL style.
    pub fn with_page_url_style(mut self, style: PageUrlStyle) -> Self {
        self.page_url_style = style;
        self
    }

    /// Set the navigation timeout.
    pub fn with_navigation_timeout_ms(mut self, ms: u64) -> Self {
        self.navigation_timeout_ms = ms;
        self
    }

    /// Set the element wait timeout.
    pub fn with_element_timeout_ms(mut self, ms: u64) -> Self {
        self.element_timeout_ms = ms;
        self
    }

    /// Set the lazy-load scroll limit.
    pub fn with_max_scrolls(mut self, max_scrolls: u32) -> Self {
        self.max_scrolls = max_scrolls;
        self
    }

    /// Set the pacing config.
    pub fn with_pacing(mut self, pacing: PacingConfig) -> Self {
        self.pacing = pacing;
        self
    }

    /// Replace the user-agent pool.
    pub fn with_user_agents(
        mut self,
        user_agents: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.user_agents = user_agents.into_iter().map(|u| u.into()).collect();
        self
    }

    /// Navigation timeout as a `Duration`.
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    /// Element wait timeout as a `Duration`.
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    /// Validate at startup. Any failure here is fatal to the run.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.source.trim().is_empty() {
            return Err(IngestError::Config("source must not be empty".to_string()));
        }
        if self.categories.is_empty() {
            return Err(IngestError::Config(
                "at least one category is required".to_string(),
            ));
        }
        if self.selectors.dom_primary.trim().is_empty() {
            return Err(IngestError::Config(
                "dom_primary selector must not be empty".to_string(),
            ));
        }
        if self.user_agents.is_empty() {
            return Err(IngestError::Config(
                "at least one user agent is required".to_string(),
            ));
        }
        self.selectors.id_pattern()?;
        Ok(())
    }
}
