//! DOM fallback extraction strategy.
//!
//! Used when the embedded state blob is unavailable. Only the fields
//! the markup exposes are populated (typically id and link) and
//! everything else carries the unavailable sentinel so downstream code
//! can tell "not attempted" from "not present".

use std::time::Duration;

use regex::Regex;
use tracing::{info, warn};

use crate::browser::{BrowserPage, PageElement};
use crate::config::SelectorConfig;
use crate::error::{ExtractError, ExtractResult, IngestError};
use crate::failure::FailureRecorder;
use crate::types::{CandidateRecord, PageContext};

/// Extracts candidates from rendered markup via configured selectors.
pub struct DomExtractor {
    primary: String,
    secondary: Option<String>,
    id_attribute: Option<String>,
    id_pattern: Regex,
    link_base: Option<String>,
    element_timeout: Duration,
}

impl DomExtractor {
    /// Compile the extractor from the selector config.
    pub fn new(selectors: &SelectorConfig, element_timeout: Duration) -> Result<Self, IngestError> {
        Ok(Self {
            primary: selectors.dom_primary.clone(),
            secondary: selectors.dom_secondary.clone(),
            id_attribute: selectors.id_attribute.clone(),
            id_pattern: selectors.id_pattern()?,
            link_base: selectors.link_base.clone(),
            element_timeout,
        })
    }

    /// Extract candidates from the current page.
    ///
    /// Zero matches on the primary selector fall through to the
    /// secondary, looser one. Malformed elements are skipped through
    /// the failure recorder; the page itself never fails here short of
    /// a transport error. Returns candidates plus the skipped count.
    pub async fn extract(
        &self,
        page: &dyn BrowserPage,
        ctx: &PageContext,
        failures: &mut FailureRecorder,
    ) -> ExtractResult<(Vec<CandidateRecord>, usize)> {
        let attached = page
            .wait_for_selector(&self.primary, self.element_timeout)
            .await?;
        let mut elements = if attached {
            page.query_all(&self.primary).await?
        } else {
            Vec::new()
        };

        if elements.is_empty() {
            if let Some(secondary) = &self.secondary {
                elements = page.query_all(secondary).await?;
                if !elements.is_empty() {
                    info!(selector = %secondary, "primary selector matched nothing, using secondary");
                }
            }
        }

        let mut candidates = Vec::with_capacity(elements.len());
        let mut skipped = 0usize;
        for (index, element) in elements.iter().enumerate() {
            match self.parse_element(index, element) {
                Ok(candidate) => candidates.push(candidate),
                Err(e) => {
                    // Per-element, non-fatal: skip and keep the page.
                    failures.record_element_failure(ctx, &e);
                    skipped += 1;
                }
            }
        }
        Ok((candidates, skipped))
    }

    fn parse_element(&self, index: usize, element: &PageElement) -> ExtractResult<CandidateRecord> {
        let raw = element.attribute("href");
        let link = raw.map(clean_link).filter(|l| !l.is_empty());

        // The id can hide in the part the link cleaner strips, so the
        // pattern is tried against the cleaned link and the raw href.
        let id = self
            .id_attribute
            .as_deref()
            .and_then(|attr| element.attribute(attr))
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .or_else(|| link.as_deref().and_then(|l| self.capture_id(l)))
            .or_else(|| raw.and_then(|l| self.capture_id(l)));

        match (id, link) {
            (Some(id), Some(link)) => Ok(CandidateRecord::new(id, self.resolve_link(link))),
            (id, link) => Err(ExtractError::Element {
                index,
                reason: format!(
                    "missing required fields (id: {}, link: {})",
                    id.as_deref().unwrap_or("absent"),
                    link.as_deref().unwrap_or("absent"),
                ),
            }),
        }
    }

    fn capture_id(&self, link: &str) -> Option<String> {
        self.id_pattern
            .captures(link)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn resolve_link(&self, link: String) -> String {
        if link.starts_with("http") {
            return link;
        }
        match &self.link_base {
            Some(base) => format!("{}{}", base.trim_end_matches('/'), link),
            None => {
                warn!(%link, "relative link with no configured base");
                link
            }
        }
    }
}

/// Strip the query string from a raw href.
fn clean_link(raw: &str) -> String {
    raw.split('?').next().unwrap_or(raw).trim().to_string()
}
