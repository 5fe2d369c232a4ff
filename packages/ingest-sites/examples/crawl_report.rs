//! Drives the Meetup profile against the scripted mock browser and
//! prints the run report. Useful for eyeballing log output and report
//! shape without a real rendering engine:
//!
//! ```sh
//! RUST_LOG=info cargo run -p ingest-sites --example crawl_report
//! ```

use std::sync::Arc;

use serde_json::json;

use ingest_core::testing::{MemoryArtifactStore, MockBrowser, ScriptedPage};
use ingest_core::types::CategoryMap;
use ingest_core::{DelayRange, MemorySink, Orchestrator, PacingConfig};
use ingest_sites::{meetup, MeetupSchema};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let seed = "https://www.meetup.com/find/?categoryId=546";
    let blob = json!({
        "props": { "pageProps": { "__APOLLO_STATE__": {
            "Event:1": {
                "id": "1",
                "eventUrl": "https://www.meetup.com/rust-madrid/events/1/",
                "title": "Rust Madrid",
                "rsvps": { "totalCount": 42 },
                "venue": { "__ref": "Venue:9" },
            },
            "Venue:9": { "id": "9", "name": "Campus Madrid", "city": "Madrid" },
        } } }
    });
    let browser = MockBrowser::new()
        .with_state_script(r#"script[id="__NEXT_DATA__"][type="application/json"]"#)
        .with_page(seed, ScriptedPage::new().with_state(blob));

    let mut config = meetup::profile()
        .with_pacing(PacingConfig::disabled())
        .with_max_scrolls(1);
    config.categories = CategoryMap::new().with("Tecnologia", seed);
    config.scroll_delay = DelayRange::new(0, 0);

    let orchestrator = Orchestrator::new(
        config,
        browser,
        Arc::new(MeetupSchema),
        Arc::new(MemoryArtifactStore::new()),
    );
    let mut sink = MemorySink::new();
    let report = orchestrator.run(&mut sink).await?;

    println!(
        "{}: {} records over {} pages ({} completed, {} empty, {} failed)",
        report.source,
        report.records_emitted,
        report.pages_fetched,
        report.categories_completed,
        report.categories_empty,
        report.categories_failed,
    );
    for record in sink.records() {
        println!("{}", serde_json::to_string_pretty(record)?);
    }
    Ok(())
}
