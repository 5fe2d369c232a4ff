//! Meetup profile.
//!
//! Meetup renders search results through a Next.js hydration payload:
//! a `__NEXT_DATA__` script tag whose `props.pageProps.__APOLLO_STATE__`
//! object holds the normalized entity cache. Events and venues sit
//! under `Event:<id>` and `Venue:<id>` keys; an event's venue is either
//! inlined with an `id` or a weak `__ref` of the form `Venue:<id>`.
//!
//! Meetup publishes no page count. The seed URL serves the whole
//! listing and grows under lazy-load scrolling, so a crawl is a single
//! logical page per category.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use ingest_core::extract::{EmbeddedEvent, EmbeddedSchema, EmbeddedState};
use ingest_core::types::{CategoryMap, Venue};
use ingest_core::{ExtractError, RunConfig, SelectorConfig, StateLocator};

use crate::identity::BASE_USER_AGENTS;

const APOLLO_STATE_POINTER: &str = "/props/pageProps/__APOLLO_STATE__";
const EVENT_KEY_PREFIX: &str = "Event:";
const VENUE_KEY_PREFIX: &str = "Venue:";

#[derive(Debug, Deserialize)]
struct MeetupEvent {
    id: String,
    #[serde(rename = "eventUrl")]
    event_url: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "dateTime")]
    date_time: Option<String>,
    rsvps: Option<MeetupRsvps>,
    venue: Option<MeetupVenueRef>,
}

#[derive(Debug, Deserialize)]
struct MeetupRsvps {
    #[serde(rename = "totalCount")]
    total_count: Option<u64>,
}

/// A venue on an event entry: inlined with an id, or a cache reference
/// like `Venue:12345`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MeetupVenueRef {
    Inline { id: String },
    Reference {
        #[serde(rename = "__ref")]
        reference: String,
    },
}

impl MeetupVenueRef {
    fn venue_id(&self) -> String {
        match self {
            MeetupVenueRef::Inline { id } => id.clone(),
            MeetupVenueRef::Reference { reference } => reference
                .rsplit(':')
                .next()
                .unwrap_or(reference)
                .to_string(),
        }
    }
}

/// Schema of Meetup's Apollo entity cache.
pub struct MeetupSchema;

impl EmbeddedSchema for MeetupSchema {
    fn total_pages(&self, _blob: &Value) -> Option<u32> {
        None
    }

    fn project(&self, blob: &Value) -> Result<EmbeddedState, ExtractError> {
        let apollo = blob
            .pointer(APOLLO_STATE_POINTER)
            .and_then(Value::as_object)
            .ok_or_else(|| ExtractError::Unavailable {
                reason: "no Apollo state under props.pageProps".to_string(),
            })?;
        if apollo.is_empty() {
            return Err(ExtractError::Unavailable {
                reason: "Apollo state is empty".to_string(),
            });
        }

        let mut state = EmbeddedState::new();
        for (key, value) in apollo {
            if key.starts_with(EVENT_KEY_PREFIX) {
                let event: MeetupEvent =
                    serde_json::from_value(value.clone()).map_err(|e| {
                        ExtractError::Unavailable {
                            reason: format!("event entry {key} does not match the known shape: {e}"),
                        }
                    })?;
                state.insert_event(EmbeddedEvent {
                    id: event.id,
                    link: event.event_url,
                    title: event.title,
                    description: event.description,
                    date_time: event.date_time,
                    attendees_count: event.rsvps.and_then(|r| r.total_count),
                    venue_ref: event.venue.as_ref().map(MeetupVenueRef::venue_id),
                });
            } else if key.starts_with(VENUE_KEY_PREFIX) {
                let venue: Venue = serde_json::from_value(value.clone()).map_err(|e| {
                    ExtractError::Unavailable {
                        reason: format!("venue entry {key} does not match the known shape: {e}"),
                    }
                })?;
                state.insert_venue(venue);
            } else {
                debug!(%key, "ignoring non-entity cache entry");
            }
        }

        if state.events.is_empty() {
            return Err(ExtractError::Unavailable {
                reason: "Apollo state holds no event entities".to_string(),
            });
        }
        Ok(state)
    }
}

/// Run configuration for Meetup's Madrid search listings.
pub fn profile() -> RunConfig {
    RunConfig::new(
        "Meetup",
        CategoryMap::new()
            .with(
                "Tecnologia",
                "https://www.meetup.com/es-ES/find/?location=es--Madrid&source=EVENTS&categoryId=546&eventType=inPerson&dateRange=this-week",
            )
            .with(
                "Actividades sociales",
                "https://www.meetup.com/es-ES/find/?location=es--Madrid&source=EVENTS&categoryId=652&eventType=inPerson&dateRange=this-week",
            ),
        SelectorConfig {
            cookie_consent: vec![
                r#"button[id="onetrust-accept-btn-handler"]"#.to_string(),
                r#"button:has-text("Aceptar todas")"#.to_string(),
            ],
            dom_primary: r#"a[id="event-card-in-search-results"]"#.to_string(),
            dom_secondary: None,
            id_attribute: None,
            id_link_pattern: r"/events/(\d+)/?$".to_string(),
            link_base: Some("https://www.meetup.com".to_string()),
        },
        StateLocator::ScriptTag {
            selector: r#"script[id="__NEXT_DATA__"][type="application/json"]"#.to_string(),
        },
    )
    .with_user_agents(BASE_USER_AGENTS.iter().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn apollo_blob(state: Value) -> Value {
        json!({ "props": { "pageProps": { "__APOLLO_STATE__": state } } })
    }

    #[test]
    fn test_projects_events_and_venues_from_apollo_state() {
        let blob = apollo_blob(json!({
            "ROOT_QUERY": { "__typename": "Query" },
            "Event:305000001": {
                "__typename": "Event",
                "id": "305000001",
                "eventUrl": "https://www.meetup.com/rust-madrid/events/305000001/",
                "title": "Rust Madrid",
                "dateTime": "2026-08-27T19:00+02:00",
                "rsvps": { "totalCount": 42 },
                "venue": { "__ref": "Venue:27000001" },
            },
            "Venue:27000001": {
                "__typename": "Venue",
                "id": "27000001",
                "name": "Campus Madrid",
                "city": "Madrid",
                "lat": 40.39,
                "lon": -3.69,
            },
        }));

        let state = MeetupSchema.project(&blob).unwrap();
        assert_eq!(state.events.len(), 1);
        assert_eq!(state.venues.len(), 1);

        let event = &state.events["305000001"];
        assert_eq!(event.attendees_count, Some(42));
        // The __ref resolves to the bare venue id.
        assert_eq!(event.venue_ref.as_deref(), Some("27000001"));
        assert_eq!(
            state.venues["27000001"].name.as_deref(),
            Some("Campus Madrid")
        );
    }

    #[test]
    fn test_inline_venue_id_used_directly() {
        let blob = apollo_blob(json!({
            "Event:1": {
                "id": "1",
                "eventUrl": "https://www.meetup.com/g/events/1/",
                "venue": { "id": "9" },
            },
        }));

        let state = MeetupSchema.project(&blob).unwrap();
        assert_eq!(state.events["1"].venue_ref.as_deref(), Some("9"));
    }

    #[test]
    fn test_missing_apollo_state_is_unavailable() {
        let err = MeetupSchema
            .project(&json!({ "props": { "pageProps": {} } }))
            .unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));

        let err = MeetupSchema.project(&apollo_blob(json!({}))).unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));
    }

    #[test]
    fn test_mismatched_event_entry_is_unavailable() {
        // An Event entry without an id means the cache changed shape.
        let blob = apollo_blob(json!({
            "Event:1": { "eventUrl": "https://www.meetup.com/g/events/1/" },
        }));
        let err = MeetupSchema.project(&blob).unwrap_err();
        assert!(matches!(err, ExtractError::Unavailable { .. }));
    }

    #[test]
    fn test_no_pagination_metadata() {
        assert_eq!(MeetupSchema.total_pages(&json!({})), None);
    }

    #[test]
    fn test_profile_validates() {
        assert!(profile().validate().is_ok());
    }
}
