//! Dual-strategy field extraction.
//!
//! Extraction is polymorphic over two strategies with explicit, ordered
//! fallback dispatch: the embedded-state strategy is tried first, and a
//! structural mismatch degrades to the DOM strategy. A page always
//! yields a (possibly empty) candidate list; the only error that can
//! cross the page boundary is a transport failure, which the driver
//! treats as a page-granularity failure.

pub mod dom;
pub mod embedded;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::browser::BrowserPage;
use crate::config::{RunConfig, StateLocator};
use crate::error::{ExtractError, ExtractResult, IngestError};
use crate::failure::FailureRecorder;
use crate::types::{CandidateRecord, PageContext, Venue, VenueFields};

pub use dom::DomExtractor;
pub use embedded::{fetch_state_blob, EmbeddedEvent, EmbeddedSchema, EmbeddedState};

/// Which strategy produced a page's candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionStrategy {
    /// Parsed from the site-injected state blob.
    EmbeddedState,

    /// Extracted from rendered markup.
    Dom,
}

/// Everything extracted from one listing page.
#[derive(Debug)]
pub struct PageExtraction {
    /// Strategy that produced the candidates.
    pub strategy: ExtractionStrategy,

    /// Candidates in encounter order.
    pub candidates: Vec<CandidateRecord>,

    /// Page-scoped venue map for reference resolution.
    pub venues: HashMap<String, Venue>,

    /// Pagination metadata read from the blob, when published.
    pub total_pages: Option<u32>,

    /// Elements skipped as malformed.
    pub elements_skipped: usize,
}

impl PageExtraction {
    /// Resolve a candidate's venue reference against this page's map.
    ///
    /// A reference that cannot be resolved degrades to the unavailable
    /// sentinel; the record is never dropped for missing enrichment.
    pub fn resolve_venue(&self, candidate: &CandidateRecord) -> VenueFields {
        match &candidate.venue_ref {
            Some(venue_ref) => match self.venues.get(venue_ref) {
                Some(venue) => VenueFields::from(venue),
                None => {
                    warn!(
                        record = %candidate.id,
                        venue = %venue_ref,
                        "venue reference not found in page state"
                    );
                    VenueFields::unavailable()
                }
            },
            None => {
                debug!(record = %candidate.id, "no venue reference on record");
                VenueFields::unavailable()
            }
        }
    }
}

/// The per-page extraction pipeline.
pub struct ExtractionPipeline {
    schema: Arc<dyn EmbeddedSchema>,
    locator: StateLocator,
    dom: DomExtractor,
    element_timeout: Duration,
}

impl ExtractionPipeline {
    /// Build the pipeline from config and the site's embedded schema.
    pub fn new(config: &RunConfig, schema: Arc<dyn EmbeddedSchema>) -> Result<Self, IngestError> {
        Ok(Self {
            schema,
            locator: config.state_locator.clone(),
            dom: DomExtractor::new(&config.selectors, config.element_timeout())?,
            element_timeout: config.element_timeout(),
        })
    }

    /// Extract candidates from the current page.
    ///
    /// Fetches the embedded blob once; pagination metadata is read from
    /// it even when candidate projection falls back to the DOM
    /// strategy, since some sites publish page counts without entity
    /// data.
    pub async fn extract_page(
        &self,
        page: &dyn BrowserPage,
        ctx: &PageContext,
        failures: &mut FailureRecorder,
    ) -> ExtractResult<PageExtraction> {
        let blob = match fetch_state_blob(page, &self.locator, self.element_timeout).await {
            Ok(blob) => Some(blob),
            Err(ExtractError::Unavailable { reason }) => {
                warn!(
                    category = %ctx.category.name,
                    page = ctx.page_number,
                    %reason,
                    "embedded state blob unavailable"
                );
                None
            }
            Err(e) => return Err(e),
        };
        let total_pages = blob.as_ref().and_then(|b| self.schema.total_pages(b));

        if let Some(blob) = &blob {
            match self.schema.project(blob) {
                Ok(state) => {
                    let (candidates, venues, skipped) = state.into_candidates();
                    debug!(
                        category = %ctx.category.name,
                        page = ctx.page_number,
                        count = candidates.len(),
                        "candidates from embedded state"
                    );
                    return Ok(PageExtraction {
                        strategy: ExtractionStrategy::EmbeddedState,
                        candidates,
                        venues,
                        total_pages,
                        elements_skipped: skipped,
                    });
                }
                Err(ExtractError::Unavailable { reason }) => {
                    warn!(
                        category = %ctx.category.name,
                        page = ctx.page_number,
                        %reason,
                        "embedded projection unavailable, falling back to DOM strategy"
                    );
                }
                Err(e) => return Err(e),
            }
        }

        let (candidates, skipped) = self.dom.extract(page, ctx, failures).await?;
        debug!(
            category = %ctx.category.name,
            page = ctx.page_number,
            count = candidates.len(),
            "candidates from DOM fallback"
        );
        Ok(PageExtraction {
            strategy: ExtractionStrategy::Dom,
            candidates,
            venues: HashMap::new(),
            total_pages,
            elements_skipped: skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::failure::testing_recorder;
    use crate::testing::{stub_blob, MockBrowser, ScriptedPage, StubSchema};
    use crate::types::{Category, CategoryMap};

    fn test_config() -> RunConfig {
        RunConfig::new(
            "Testsite",
            CategoryMap::new().with("tech", "https://x.test/tech"),
            SelectorConfig {
                cookie_consent: vec![],
                dom_primary: "a.card".to_string(),
                dom_secondary: None,
                id_attribute: None,
                id_link_pattern: r"/events/(\d+)".to_string(),
                link_base: Some("https://x.test".to_string()),
            },
            StateLocator::ScriptTag {
                selector: "script#state".to_string(),
            },
        )
    }

    fn pipeline() -> ExtractionPipeline {
        ExtractionPipeline::new(&test_config(), Arc::new(StubSchema)).unwrap()
    }

    async fn navigate(browser: &MockBrowser, url: &str) -> crate::testing::MockPage {
        let page = browser.open("ua").await;
        page.navigate(
            url,
            crate::browser::WaitStrategy::DomContentLoaded,
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        page
    }

    #[tokio::test]
    async fn test_embedded_strategy_preferred() {
        let browser = MockBrowser::new().with_state_script("script#state").with_page(
            "https://x.test/tech",
            ScriptedPage::new().with_state(stub_blob(&[("1", "https://x.test/events/1")], Some(2))),
        );
        let page = navigate(&browser, "https://x.test/tech").await;

        let ctx = PageContext::first(Category::new("tech", "https://x.test/tech"));
        let mut failures = testing_recorder();
        let extraction = pipeline()
            .extract_page(&page, &ctx, &mut failures)
            .await
            .unwrap();

        assert_eq!(extraction.strategy, ExtractionStrategy::EmbeddedState);
        assert_eq!(extraction.candidates.len(), 1);
        assert_eq!(extraction.total_pages, Some(2));
    }

    #[tokio::test]
    async fn test_malformed_blob_falls_back_to_dom() {
        let browser = MockBrowser::new().with_state_script("script#state").with_page(
            "https://x.test/tech",
            ScriptedPage::new()
                // Blob present but not the shape the schema expects.
                .with_state(serde_json::json!({ "unexpected": true }))
                .with_elements(
                    "a.card",
                    vec![crate::browser::PageElement::new().with_attribute("href", "/events/7/")],
                ),
        );
        let page = navigate(&browser, "https://x.test/tech").await;

        let ctx = PageContext::first(Category::new("tech", "https://x.test/tech"));
        let mut failures = testing_recorder();
        let extraction = pipeline()
            .extract_page(&page, &ctx, &mut failures)
            .await
            .unwrap();

        assert_eq!(extraction.strategy, ExtractionStrategy::Dom);
        assert_eq!(extraction.candidates.len(), 1);
        assert_eq!(extraction.candidates[0].id, "7");
    }

    #[tokio::test]
    async fn test_missing_blob_yields_empty_dom_list_without_error() {
        // No state, no elements: extraction still returns a list.
        let browser = MockBrowser::new()
            .with_state_script("script#state")
            .with_page("https://x.test/tech", ScriptedPage::new());
        let page = navigate(&browser, "https://x.test/tech").await;

        let ctx = PageContext::first(Category::new("tech", "https://x.test/tech"));
        let mut failures = testing_recorder();
        let extraction = pipeline()
            .extract_page(&page, &ctx, &mut failures)
            .await
            .unwrap();

        assert_eq!(extraction.strategy, ExtractionStrategy::Dom);
        assert!(extraction.candidates.is_empty());
        assert_eq!(extraction.total_pages, None);
    }

    #[tokio::test]
    async fn test_missing_venue_reference_degrades_to_unavailable() {
        let extraction = PageExtraction {
            strategy: ExtractionStrategy::EmbeddedState,
            candidates: vec![],
            venues: HashMap::new(),
            total_pages: None,
            elements_skipped: 0,
        };
        let candidate =
            CandidateRecord::new("1", "https://x.test/events/1").with_venue_ref("v-missing");

        let venue = extraction.resolve_venue(&candidate);
        assert!(venue.venue_name.is_unavailable());
        assert!(venue.latitude.is_unavailable());
    }
}
