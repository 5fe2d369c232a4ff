//! Site profiles driven end to end against the scripted mock browser.

use std::sync::Arc;

use serde_json::json;

use ingest_core::testing::{MemoryArtifactStore, MockBrowser, ScriptedPage};
use ingest_core::{
    CategoryStatus, DelayRange, ExtractionStrategy, MemorySink, Orchestrator, PacingConfig,
    PageElement, RunConfig,
};
use ingest_core::types::CategoryMap;
use ingest_sites::{meetup, eventbrite, EventbriteSchema, MeetupSchema};

fn deterministic(mut profile: RunConfig, categories: CategoryMap) -> RunConfig {
    profile.categories = categories;
    profile.scroll_delay = DelayRange::new(0, 0);
    profile
        .with_pacing(PacingConfig::disabled())
        .with_max_scrolls(1)
        .with_user_agents(["test-agent"])
}

#[tokio::test]
async fn test_meetup_run_projects_apollo_state() {
    let seed = "https://www.meetup.com/find/?categoryId=546";
    let blob = json!({
        "props": { "pageProps": { "__APOLLO_STATE__": {
            "ROOT_QUERY": { "__typename": "Query" },
            "Event:305000001": {
                "id": "305000001",
                "eventUrl": "https://www.meetup.com/rust-madrid/events/305000001/",
                "title": "Rust Madrid",
                "description": "Monthly meetup",
                "dateTime": "2026-08-27T19:00+02:00",
                "rsvps": { "totalCount": 42 },
                "venue": { "__ref": "Venue:27000001" },
            },
            "Event:305000002": {
                "id": "305000002",
                "eventUrl": "https://www.meetup.com/go-madrid/events/305000002/",
                "title": "Go Madrid",
            },
            "Venue:27000001": {
                "id": "27000001",
                "name": "Campus Madrid",
                "city": "Madrid",
                "lat": 40.39,
                "lon": -3.69,
            },
        } } }
    });

    let browser = MockBrowser::new()
        .with_state_script(r#"script[id="__NEXT_DATA__"][type="application/json"]"#)
        .with_page(seed, ScriptedPage::new().with_state(blob));

    let config = deterministic(meetup::profile(), CategoryMap::new().with("Tecnologia", seed));
    let mut sink = MemorySink::new();
    let report = Orchestrator::new(
        config,
        browser,
        Arc::new(MeetupSchema),
        Arc::new(MemoryArtifactStore::new()),
    )
    .run(&mut sink)
    .await
    .unwrap();

    // No page count published: exactly one page per category.
    assert_eq!(report.pages_fetched, 1);
    assert_eq!(report.records_emitted, 2);
    assert_eq!(report.categories[0].status, CategoryStatus::Completed);

    let enriched = sink.records().iter().find(|r| r.id == "305000001").unwrap();
    assert_eq!(enriched.source, "Meetup");
    assert!(enriched.title.is_present());
    assert!(enriched.venue.venue_name.is_present());
    assert!(enriched.venue.latitude.is_present());

    let bare = sink.records().iter().find(|r| r.id == "305000002").unwrap();
    assert!(bare.venue.venue_name.is_unavailable());
}

#[tokio::test]
async fn test_meetup_falls_back_to_dom_cards_when_state_is_gone() {
    let seed = "https://www.meetup.com/find/?categoryId=652";
    let browser = MockBrowser::new()
        .with_state_script(r#"script[id="__NEXT_DATA__"][type="application/json"]"#)
        .with_page(
            seed,
            ScriptedPage::new().with_elements(
                r#"a[id="event-card-in-search-results"]"#,
                vec![PageElement::new()
                    .with_attribute("href", "/rust-madrid/events/305000009/?recSource=rec")],
            ),
        );

    let config = deterministic(
        meetup::profile(),
        CategoryMap::new().with("Actividades sociales", seed),
    );
    let mut sink = MemorySink::new();
    let report = Orchestrator::new(
        config,
        browser,
        Arc::new(MeetupSchema),
        Arc::new(MemoryArtifactStore::new()),
    )
    .run(&mut sink)
    .await
    .unwrap();

    assert_eq!(report.records_emitted, 1);
    let record = &sink.records()[0];
    assert_eq!(record.id, "305000009");
    assert_eq!(
        record.link,
        "https://www.meetup.com/rust-madrid/events/305000009/"
    );
    assert!(record.title.is_unavailable());
}

#[tokio::test]
async fn test_eventbrite_paginates_by_server_data_and_extracts_cards() {
    let seed = "https://www.eventbrite.com/d/spain--madrid/science-and-tech--events/";
    let server_data = |page_number: u32| {
        json!({
            "search_data": { "events": { "pagination": {
                "page_count": 2,
                "page_number": page_number,
            } } }
        })
    };
    let card = |id: &str| {
        PageElement::new()
            .with_attribute("data-event-id", id)
            .with_attribute("href", format!("https://www.eventbrite.com/e/x-tickets-{id}"))
    };

    let browser = MockBrowser::new()
        .with_state_expression("() => window.__SERVER_DATA__")
        .with_page(
            format!("{seed}?page=1"),
            ScriptedPage::new()
                .with_state(server_data(1))
                .with_elements("a.event-card-link[data-event-id]", vec![card("11"), card("12")]),
        )
        .with_page(
            format!("{seed}?page=2"),
            ScriptedPage::new()
                .with_state(server_data(2))
                .with_elements("a.event-card-link[data-event-id]", vec![card("13")]),
        );

    let config = deterministic(
        eventbrite::profile(),
        CategoryMap::new().with("Tecnologia", seed),
    );
    let mut sink = MemorySink::new();
    let report = Orchestrator::new(
        config,
        browser.clone(),
        Arc::new(EventbriteSchema),
        Arc::new(MemoryArtifactStore::new()),
    )
    .run(&mut sink)
    .await
    .unwrap();

    // Pagination metadata comes from the blob even though candidates
    // come from the rendered cards.
    assert_eq!(report.pages_fetched, 2);
    assert_eq!(report.records_emitted, 3);
    assert_eq!(browser.navigation_count(&format!("{seed}?page=3")), 0);

    let ids: Vec<&str> = sink.records().iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["11", "12", "13"]);
    assert!(sink.records()[0].venue.venue_name.is_unavailable());
}

#[tokio::test]
async fn test_eventbrite_projects_results_when_server_data_carries_them() {
    let seed = "https://www.eventbrite.com/d/spain--madrid/science-and-tech--events/";
    let blob = json!({
        "search_data": { "events": {
            "pagination": { "page_count": 1, "page_number": 1 },
            "results": [{
                "id": "990011",
                "url": "https://www.eventbrite.com/e/ai-night-tickets-990011",
                "name": "AI Night",
                "start_date": "2026-08-29",
                "primary_venue": {
                    "id": "v-77",
                    "name": "Espacio Open",
                    "address": { "city": "Madrid" },
                },
            }],
        } }
    });
    let browser = MockBrowser::new()
        .with_state_expression("() => window.__SERVER_DATA__")
        .with_page(
            format!("{seed}?page=1"),
            ScriptedPage::new().with_state(blob),
        );

    let config = deterministic(
        eventbrite::profile(),
        CategoryMap::new().with("Tecnologia", seed),
    );
    let mut sink = MemorySink::new();
    let report = Orchestrator::new(
        config,
        browser,
        Arc::new(EventbriteSchema),
        Arc::new(MemoryArtifactStore::new()),
    )
    .run(&mut sink)
    .await
    .unwrap();

    // No rendered cards were scripted: the record can only have come
    // from the projected results list.
    assert_eq!(report.records_emitted, 1);
    let record = &sink.records()[0];
    assert_eq!(record.id, "990011");
    assert!(record.title.is_present());
    assert!(record.venue.venue_name.is_present());
    assert!(record.venue.latitude.is_unavailable());
}

#[tokio::test]
async fn test_eventbrite_secondary_selector_catches_redesigned_cards() {
    let seed = "https://www.eventbrite.com/d/spain--madrid/science-and-tech--events/";
    let browser = MockBrowser::new()
        .with_state_expression("() => window.__SERVER_DATA__")
        .with_page(
            format!("{seed}?page=1"),
            ScriptedPage::new().with_elements(
                "div.event-card",
                vec![PageElement::new()
                    .with_attribute("href", "https://www.eventbrite.com/checkout?e=990011")],
            ),
        );

    let config = deterministic(
        eventbrite::profile(),
        CategoryMap::new().with("Tecnologia", seed),
    );
    let mut sink = MemorySink::new();
    let report = Orchestrator::new(
        config,
        browser,
        Arc::new(EventbriteSchema),
        Arc::new(MemoryArtifactStore::new()),
    )
    .run(&mut sink)
    .await
    .unwrap();

    assert_eq!(report.records_emitted, 1);
    // The id sits in the query string the link cleaner strips.
    assert_eq!(sink.records()[0].id, "990011");
}

#[test]
fn test_strategy_types_are_site_agnostic() {
    // Both profiles validate; the strategy enum stays the same across them.
    assert!(meetup::profile().validate().is_ok());
    assert!(eventbrite::profile().validate().is_ok());
    assert_ne!(ExtractionStrategy::EmbeddedState, ExtractionStrategy::Dom);
}
