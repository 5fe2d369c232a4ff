//! Shared ingestion engine for paginated, script-rendered listing sites.
//!
//! The engine turns a category → seed URL map into an ordered stream of
//! normalized records. One [`Orchestrator`] run owns one browser
//! session, one run-scoped [`Deduplicator`], and one [`PacingPolicy`];
//! each category is driven through a pagination loop that fetches a
//! rendered page, extracts candidates through the dual-strategy
//! pipeline (embedded state first, DOM markup as fallback), and emits
//! survivors to a [`RecordSink`].
//!
//! Site specifics live entirely in data ([`RunConfig`]) plus one trait
//! ([`EmbeddedSchema`]) describing the shape of the site's embedded
//! state blob. The rendering engine itself sits behind the [`Browser`]
//! and [`BrowserPage`] seams, so the whole engine runs against the
//! scripted mock in [`testing`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use ingest_core::{MemorySink, Orchestrator};
//! # use ingest_core::{Browser, EmbeddedSchema, ArtifactStore, RunConfig};
//! # async fn run(
//! #     config: RunConfig,
//! #     browser: impl Browser,
//! #     schema: Arc<dyn EmbeddedSchema>,
//! #     artifacts: Arc<dyn ArtifactStore>,
//! # ) -> ingest_core::Result<()> {
//! let orchestrator = Orchestrator::new(config, browser, schema, artifacts);
//! let mut sink = MemorySink::new();
//! let report = orchestrator.run(&mut sink).await?;
//! println!("{} records from {} pages", report.records_emitted, report.pages_fetched);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extract;
pub mod failure;
pub mod orchestrator;
pub mod pacing;
pub mod pagination;
pub mod sink;
pub mod testing;
pub mod types;

pub use browser::{Browser, BrowserPage, BrowserSession, PageElement, WaitStrategy};
pub use config::{
    DelayRange, PacingConfig, PageUrlStyle, RunConfig, SelectorConfig, StateLocator,
};
pub use dedup::Deduplicator;
pub use error::{BrowserError, ExtractError, IngestError, Result, SinkError};
pub use extract::{
    DomExtractor, EmbeddedSchema, EmbeddedState, ExtractionPipeline, ExtractionStrategy,
    PageExtraction,
};
pub use failure::{ArtifactStore, FailureAction, FailureRecorder};
pub use orchestrator::{Orchestrator, RunReport};
pub use pacing::{PacingPolicy, PacingProfile};
pub use pagination::{CategoryReport, CategoryStatus, PaginationDriver};
pub use sink::{MemorySink, RecordSink};
pub use types::{
    CandidateRecord, Category, CategoryMap, Field, NormalizedRecord, PageContext, Venue,
    VenueFields,
};
