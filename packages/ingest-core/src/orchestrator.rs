//! Run orchestration.
//!
//! One run owns one browser session, one deduplicator, and one pacing
//! policy; categories are crawled sequentially in caller order. No
//! category failure aborts the run: it always proceeds through every
//! configured category and reports what it skipped.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::{Browser, BrowserSession};
use crate::config::RunConfig;
use crate::dedup::Deduplicator;
use crate::error::{IngestError, Result};
use crate::extract::{EmbeddedSchema, ExtractionPipeline};
use crate::failure::{ArtifactStore, FailureRecorder};
use crate::pacing::{PacingPolicy, PacingProfile};
use crate::pagination::{CategoryReport, CategoryStatus, PaginationDriver};
use crate::sink::RecordSink;

/// Aggregated outcome of one run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub source: String,
    pub records_emitted: u64,
    pub duplicates_skipped: u64,
    pub pages_fetched: u32,
    pub elements_skipped: u64,
    pub emit_failures: u64,
    pub categories_completed: u32,
    pub categories_empty: u32,
    pub categories_failed: u32,
    pub cancelled: bool,

    /// Per-category breakdown, in crawl order.
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    fn absorb(&mut self, report: CategoryReport) {
        self.records_emitted += report.records_emitted;
        self.duplicates_skipped += report.duplicates_skipped;
        self.pages_fetched += report.pages_fetched;
        self.elements_skipped += report.elements_skipped;
        self.emit_failures += report.emit_failures;
        match report.status {
            CategoryStatus::Completed => self.categories_completed += 1,
            CategoryStatus::EmptyFirstPage => self.categories_empty += 1,
            CategoryStatus::Aborted => self.categories_failed += 1,
            CategoryStatus::Cancelled => self.cancelled = true,
        }
        self.categories.push(report);
    }
}

/// Orchestrates one multi-category ingestion run.
pub struct Orchestrator<B: Browser> {
    config: RunConfig,
    browser: B,
    schema: Arc<dyn EmbeddedSchema>,
    artifacts: Arc<dyn ArtifactStore>,
    cancel: CancellationToken,
}

impl<B: Browser> Orchestrator<B> {
    /// Create an orchestrator for one run.
    pub fn new(
        config: RunConfig,
        browser: B,
        schema: Arc<dyn EmbeddedSchema>,
        artifacts: Arc<dyn ArtifactStore>,
    ) -> Self {
        Self {
            config,
            browser,
            schema,
            artifacts,
            cancel: CancellationToken::new(),
        }
    }

    /// Token callers can use to request a graceful stop. Cancellation
    /// is observed at the top of the pagination loop and between
    /// categories; there is no mid-page cancellation point.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute the run, emitting records to the sink in encounter
    /// order. Only configuration and session-acquisition problems are
    /// errors; everything downstream is absorbed into the report.
    pub async fn run(&self, sink: &mut dyn RecordSink) -> Result<RunReport> {
        self.config.validate()?;
        let pipeline = ExtractionPipeline::new(&self.config, self.schema.clone())?;
        let pacing = PacingPolicy::new(self.config.pacing.clone());

        let session = BrowserSession::open(&self.browser, &self.config.user_agents)
            .await
            .map_err(IngestError::Browser)?;

        // Session release is unconditional: the crawl below cannot
        // error, and close happens before the report is returned.
        let report = self.run_categories(&session, &pipeline, &pacing, sink).await;
        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close browser session");
        }
        Ok(report)
    }

    async fn run_categories(
        &self,
        session: &BrowserSession,
        pipeline: &ExtractionPipeline,
        pacing: &PacingPolicy,
        sink: &mut dyn RecordSink,
    ) -> RunReport {
        let mut report = RunReport::new(&self.config.source);
        let mut dedup = Deduplicator::new();
        let mut failures = FailureRecorder::new(&self.config.source, self.artifacts.clone());

        for (index, category) in self.config.categories.iter().enumerate() {
            if self.cancel.is_cancelled() {
                info!("cancellation requested, stopping run");
                report.cancelled = true;
                break;
            }
            if index > 0 {
                pacing.pause(PacingProfile::InterCategory).await;
            }
            info!(
                source = %self.config.source,
                category = %category.name,
                url = %category.seed_url,
                "starting category"
            );

            let mut driver = PaginationDriver::new(
                &self.config,
                session,
                pipeline,
                pacing,
                &mut dedup,
                &mut failures,
                &self.cancel,
            );
            let category_report = driver.run_category(&category, sink).await;
            let cancelled = category_report.status == CategoryStatus::Cancelled;
            report.absorb(category_report);
            if cancelled {
                break;
            }
        }

        info!(
            source = %self.config.source,
            records = report.records_emitted,
            duplicates = report.duplicates_skipped,
            pages = report.pages_fetched,
            completed = report.categories_completed,
            empty = report.categories_empty,
            failed = report.categories_failed,
            "run finished"
        );
        report
    }
}
