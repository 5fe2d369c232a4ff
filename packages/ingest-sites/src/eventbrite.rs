//! Eventbrite profile.
//!
//! Eventbrite exposes `window.__SERVER_DATA__` with reliable pagination
//! metadata (`search_data.events.pagination.page_count`) and, on search
//! pages, an event list under `search_data.events.results`. Results are
//! projected when the list is published; a blob carrying pagination
//! only defers to the rendered cards. Pages are addressed with a
//! `?page=N` query parameter.

use serde::Deserialize;
use serde_json::Value;

use ingest_core::extract::{EmbeddedEvent, EmbeddedSchema, EmbeddedState};
use ingest_core::types::{CategoryMap, Venue};
use ingest_core::{ExtractError, PageUrlStyle, RunConfig, SelectorConfig, StateLocator};

use crate::identity::BASE_USER_AGENTS;

const PAGE_COUNT_POINTER: &str = "/search_data/events/pagination/page_count";
const EVENTS_POINTER: &str = "/search_data/events";

#[derive(Debug, Deserialize)]
struct ServerEvents {
    /// Absent on non-search surfaces; an empty list is a real empty page.
    results: Option<Vec<EventbriteResult>>,
}

#[derive(Debug, Deserialize)]
struct EventbriteResult {
    id: String,
    url: Option<String>,
    name: Option<String>,
    summary: Option<String>,
    start_date: Option<String>,
    start_time: Option<String>,
    primary_venue: Option<EventbriteVenue>,
}

impl EventbriteResult {
    fn date_time(&self) -> Option<String> {
        match (&self.start_date, &self.start_time) {
            (Some(date), Some(time)) => Some(format!("{date} {time}")),
            (Some(date), None) => Some(date.clone()),
            (None, _) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct EventbriteVenue {
    id: String,
    name: Option<String>,
    address: Option<EventbriteAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct EventbriteAddress {
    localized_address_display: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

/// Schema of Eventbrite's server-data blob.
pub struct EventbriteSchema;

impl EmbeddedSchema for EventbriteSchema {
    fn total_pages(&self, blob: &Value) -> Option<u32> {
        blob.pointer(PAGE_COUNT_POINTER)?.as_u64().map(|v| v as u32)
    }

    fn project(&self, blob: &Value) -> Result<EmbeddedState, ExtractError> {
        let events = blob
            .pointer(EVENTS_POINTER)
            .ok_or_else(|| ExtractError::Unavailable {
                reason: "no search_data.events in server data".to_string(),
            })?;
        let parsed: ServerEvents =
            serde_json::from_value(events.clone()).map_err(|e| ExtractError::Unavailable {
                reason: format!("server data events do not match the known shape: {e}"),
            })?;
        let results = parsed.results.ok_or_else(|| ExtractError::Unavailable {
            reason: "server data carries pagination only, no event results".to_string(),
        })?;

        let mut state = EmbeddedState::new();
        for result in results {
            let date_time = result.date_time();
            let venue_ref = result.primary_venue.as_ref().map(|v| v.id.clone());
            if let Some(venue) = result.primary_venue {
                let address = venue.address.unwrap_or_default();
                state.insert_venue(Venue {
                    id: venue.id,
                    name: venue.name,
                    address: address.localized_address_display,
                    city: address.city,
                    state: address.region,
                    country: address.country,
                    lat: None,
                    lon: None,
                });
            }
            state.insert_event(EmbeddedEvent {
                id: result.id,
                link: result.url,
                title: result.name,
                description: result.summary,
                date_time,
                attendees_count: None,
                venue_ref,
            });
        }
        Ok(state)
    }
}

/// Run configuration for Eventbrite's Madrid search listings.
pub fn profile() -> RunConfig {
    RunConfig::new(
        "Eventbrite",
        CategoryMap::new().with(
            "Tecnologia",
            "https://www.eventbrite.com/d/spain--madrid/science-and-tech--events--this-weekend/",
        ),
        SelectorConfig {
            cookie_consent: vec![
                r#"[data-automation="gdpr-agree-button"]"#.to_string(),
                r#"button:has-text("Aceptar todas")"#.to_string(),
                r#"button:has-text("Accept All")"#.to_string(),
            ],
            dom_primary: "a.event-card-link[data-event-id]".to_string(),
            dom_secondary: Some("div.event-card".to_string()),
            id_attribute: Some("data-event-id".to_string()),
            id_link_pattern: r"e=(\d+)".to_string(),
            link_base: Some("https://www.eventbrite.com".to_string()),
        },
        StateLocator::WindowExpression {
            script: "() => window.__SERVER_DATA__".to_string(),
        },
    )
    .with_page_url_style(PageUrlStyle::QueryParam {
        param: "page".to_string(),
    })
    .with_user_agents(BASE_USER_AGENTS.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_count_read_from_server_data() {
        let blob = json!({
            "search_data": {
                "events": {
                    "pagination": { "page_count": 5, "page_number": 1 }
                }
            }
        });
        assert_eq!(EventbriteSchema.total_pages(&blob), Some(5));
        assert_eq!(EventbriteSchema.total_pages(&json!({})), None);
    }

    #[test]
    fn test_results_projected_when_published() {
        let blob = json!({
            "search_data": { "events": {
                "pagination": { "page_count": 2, "page_number": 1 },
                "results": [
                    {
                        "id": "990011",
                        "url": "https://www.eventbrite.com/e/ai-night-tickets-990011",
                        "name": "AI Night",
                        "summary": "Talks and demos",
                        "start_date": "2026-08-29",
                        "start_time": "19:00",
                        "primary_venue": {
                            "id": "v-77",
                            "name": "Espacio Open",
                            "address": {
                                "localized_address_display": "Calle Gran Via 1, Madrid",
                                "city": "Madrid",
                                "region": "MD",
                                "country": "ES",
                            },
                        },
                    },
                    { "id": "990012", "url": "https://www.eventbrite.com/e/x-tickets-990012" },
                ],
            } }
        });

        let state = EventbriteSchema.project(&blob).unwrap();
        assert_eq!(state.events.len(), 2);

        let event = &state.events["990011"];
        assert_eq!(event.title.as_deref(), Some("AI Night"));
        assert_eq!(event.date_time.as_deref(), Some("2026-08-29 19:00"));
        assert_eq!(event.venue_ref.as_deref(), Some("v-77"));
        assert_eq!(state.venues["v-77"].city.as_deref(), Some("Madrid"));
        assert_eq!(state.venues["v-77"].state.as_deref(), Some("MD"));

        // A result without a venue still projects.
        assert!(state.events["990012"].venue_ref.is_none());
    }

    #[test]
    fn test_pagination_only_blob_defers_to_dom() {
        let blob = json!({
            "search_data": { "events": {
                "pagination": { "page_count": 2, "page_number": 1 },
            } }
        });
        let err = EventbriteSchema.project(&blob).unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));

        let err = EventbriteSchema.project(&json!({})).unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));
    }

    #[test]
    fn test_empty_results_list_projects_an_empty_page() {
        let blob = json!({
            "search_data": { "events": { "results": [] } }
        });
        let state = EventbriteSchema.project(&blob).unwrap();
        assert!(state.events.is_empty());
    }

    #[test]
    fn test_mismatched_result_entry_is_unavailable() {
        // A result without an id means the payload changed shape.
        let blob = json!({
            "search_data": { "events": {
                "results": [ { "url": "https://www.eventbrite.com/e/x-tickets-1" } ],
            } }
        });
        let err = EventbriteSchema.project(&blob).unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));
    }

    #[test]
    fn test_profile_validates() {
        assert!(profile().validate().is_ok());
    }

    #[test]
    fn test_pages_are_query_addressed() {
        let profile = profile();
        let url = profile
            .page_url_style
            .page_url("https://www.eventbrite.com/d/spain--madrid/all-events/", 3);
        assert_eq!(
            url,
            "https://www.eventbrite.com/d/spain--madrid/all-events/?page=3"
        );
    }
}
