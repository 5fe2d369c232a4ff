//! Embedded-state extraction strategy.
//!
//! Script-rendered listing sites inject a structured state blob into
//! the page (a framework hydration payload). Parsing it is preferred
//! over the DOM because it carries full field data and venue
//! enrichment. The blob's shape is site-owned and versioned: a
//! site-provided [`EmbeddedSchema`] validates the expected shape at the
//! parse boundary and any mismatch surfaces as
//! [`ExtractError::Unavailable`], which triggers the DOM fallback.

use std::collections::HashMap;
use std::time::Duration;

use indexmap::IndexMap;
use tracing::warn;

use crate::browser::BrowserPage;
use crate::config::StateLocator;
use crate::error::{ExtractError, ExtractResult};
use crate::types::{CandidateRecord, Venue};

/// A primary entity projected from the embedded state.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedEvent {
    pub id: String,
    pub link: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_time: Option<String>,
    pub attendees_count: Option<u64>,

    /// Weak reference into the page's venue map.
    pub venue_ref: Option<String>,
}

/// Validated projection of one page's embedded state.
///
/// Two id-keyed maps: primary entities (events) in encounter order and
/// related entities (venues) for reference lookup.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedState {
    pub events: IndexMap<String, EmbeddedEvent>,
    pub venues: HashMap<String, Venue>,
}

impl EmbeddedState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event, keyed by its id.
    pub fn insert_event(&mut self, event: EmbeddedEvent) {
        self.events.insert(event.id.clone(), event);
    }

    /// Add a venue, keyed by its id.
    pub fn insert_venue(&mut self, venue: Venue) {
        self.venues.insert(venue.id.clone(), venue);
    }

    /// Convert events into candidates in encounter order.
    ///
    /// Events without a link cannot produce a usable record and are
    /// skipped per-element; missing venue references are NOT a reason
    /// to drop a candidate; enrichment resolves later and degrades to
    /// the unavailable sentinel.
    pub fn into_candidates(self) -> (Vec<CandidateRecord>, HashMap<String, Venue>, usize) {
        let mut candidates = Vec::with_capacity(self.events.len());
        let mut skipped = 0usize;

        for (id, event) in self.events {
            let Some(link) = event.link else {
                warn!(event = %id, "embedded event has no link, skipping");
                skipped += 1;
                continue;
            };
            let mut candidate = CandidateRecord::new(id, link);
            candidate.title = event.title.into();
            candidate.description = event.description.into();
            candidate.date_time_raw = event.date_time.into();
            candidate.attendees_count = event.attendees_count.into();
            candidate.venue_ref = event.venue_ref;
            candidates.push(candidate);
        }
        (candidates, self.venues, skipped)
    }
}

/// Site-owned schema for the embedded state blob.
///
/// Implementations validate the expected shape on entry and raise
/// `Unavailable` on any mismatch rather than silently mis-keying data.
pub trait EmbeddedSchema: Send + Sync {
    /// Read pagination metadata from the raw blob. `None` when the site
    /// does not publish page counts.
    fn total_pages(&self, blob: &serde_json::Value) -> Option<u32>;

    /// Validate and project the raw blob into typed entity state.
    fn project(&self, blob: &serde_json::Value) -> ExtractResult<EmbeddedState>;
}

/// Fetch the raw state blob through the configured locator.
///
/// Every failure mode here (script tag absent, text unparsable,
/// window expression null, evaluation refused) is `Unavailable`: the
/// page may still be extractable via the DOM.
pub async fn fetch_state_blob(
    page: &dyn BrowserPage,
    locator: &StateLocator,
    timeout: Duration,
) -> ExtractResult<serde_json::Value> {
    match locator {
        StateLocator::ScriptTag { selector } => {
            let attached = page
                .wait_for_selector(selector, timeout)
                .await
                .map_err(|e| unavailable(format!("waiting for state script failed: {e}")))?;
            if !attached {
                return Err(unavailable(format!("state script {selector} not attached")));
            }
            let elements = page
                .query_all(selector)
                .await
                .map_err(|e| unavailable(format!("querying state script failed: {e}")))?;
            let text = elements
                .first()
                .and_then(|e| e.text.as_deref())
                .ok_or_else(|| unavailable(format!("state script {selector} has no content")))?;
            serde_json::from_str(text)
                .map_err(|e| unavailable(format!("state blob unparsable: {e}")))
        }
        StateLocator::WindowExpression { script } => {
            let value = page
                .evaluate(script)
                .await
                .map_err(|e| unavailable(format!("state expression failed: {e}")))?;
            if value.is_null() {
                return Err(unavailable("state expression returned null".to_string()));
            }
            Ok(value)
        }
    }
}

fn unavailable(reason: String) -> ExtractError {
    ExtractError::Unavailable { reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_candidates_preserves_order_and_fields() {
        let mut state = EmbeddedState::new();
        state.insert_event(EmbeddedEvent {
            id: "2".to_string(),
            link: Some("https://example.com/events/2".to_string()),
            title: Some("Second".to_string()),
            venue_ref: Some("v1".to_string()),
            ..Default::default()
        });
        state.insert_event(EmbeddedEvent {
            id: "1".to_string(),
            link: Some("https://example.com/events/1".to_string()),
            attendees_count: Some(12),
            ..Default::default()
        });

        let (candidates, _, skipped) = state.into_candidates();
        assert_eq!(skipped, 0);
        assert_eq!(candidates.len(), 2);
        // Encounter order, not id order.
        assert_eq!(candidates[0].id, "2");
        assert_eq!(candidates[1].id, "1");
        assert_eq!(candidates[0].venue_ref.as_deref(), Some("v1"));
        assert!(candidates[0].description.is_unavailable());
    }

    #[test]
    fn test_into_candidates_skips_linkless_events() {
        let mut state = EmbeddedState::new();
        state.insert_event(EmbeddedEvent {
            id: "1".to_string(),
            link: None,
            ..Default::default()
        });
        state.insert_event(EmbeddedEvent {
            id: "2".to_string(),
            link: Some("https://example.com/events/2".to_string()),
            ..Default::default()
        });

        let (candidates, _, skipped) = state.into_candidates();
        assert_eq!(skipped, 1);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "2");
    }
}
