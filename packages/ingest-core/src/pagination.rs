//! Per-category pagination driver.
//!
//! Drives the fetch → extract → dedup loop for one category and decides
//! continuation. Termination rules, in order: an empty first page
//! abandons the category (the site may genuinely have no entries, or it
//! changed shape); an empty later page is retried once and then treated
//! as end-of-pagination; otherwise the loop advances until the page
//! count read from the first page is exhausted.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::browser::{BrowserSession, WaitStrategy};
use crate::config::RunConfig;
use crate::dedup::Deduplicator;
use crate::error::BrowserResult;
use crate::extract::{ExtractionPipeline, PageExtraction};
use crate::failure::FailureRecorder;
use crate::pacing::{PacingPolicy, PacingProfile};
use crate::sink::RecordSink;
use crate::types::{Category, NormalizedRecord, PageContext};

/// How a category's pagination loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryStatus {
    /// All pages processed.
    Completed,

    /// Zero candidates on page 1; category abandoned, not an error.
    EmptyFirstPage,

    /// A page-granularity failure aborted the category.
    Aborted,

    /// The run was cancelled mid-category.
    Cancelled,
}

/// Per-category outcome counters.
#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: String,
    pub status: CategoryStatus,
    pub pages_fetched: u32,
    pub records_emitted: u64,
    pub duplicates_skipped: u64,
    pub elements_skipped: u64,
    pub emit_failures: u64,
}

impl CategoryReport {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            status: CategoryStatus::Completed,
            pages_fetched: 0,
            records_emitted: 0,
            duplicates_skipped: 0,
            elements_skipped: 0,
            emit_failures: 0,
        }
    }
}

/// Drives one category's pagination loop.
pub struct PaginationDriver<'a> {
    config: &'a RunConfig,
    session: &'a BrowserSession,
    pipeline: &'a ExtractionPipeline,
    pacing: &'a PacingPolicy,
    dedup: &'a mut Deduplicator,
    failures: &'a mut FailureRecorder,
    cancel: &'a CancellationToken,
}

impl<'a> PaginationDriver<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &'a RunConfig,
        session: &'a BrowserSession,
        pipeline: &'a ExtractionPipeline,
        pacing: &'a PacingPolicy,
        dedup: &'a mut Deduplicator,
        failures: &'a mut FailureRecorder,
        cancel: &'a CancellationToken,
    ) -> Self {
        Self {
            config,
            session,
            pipeline,
            pacing,
            dedup,
            failures,
            cancel,
        }
    }

    /// Run the loop for one category, emitting accepted records to the
    /// sink in encounter order. Never returns an error: every failure
    /// is absorbed into the report.
    pub async fn run_category(
        &mut self,
        category: &Category,
        sink: &mut dyn RecordSink,
    ) -> CategoryReport {
        let mut report = CategoryReport::new(&category.name);
        let mut ctx = PageContext::first(category.clone());
        let mut retried_empty = false;

        loop {
            if self.cancel.is_cancelled() {
                info!(category = %category.name, "cancellation requested, stopping category");
                report.status = CategoryStatus::Cancelled;
                break;
            }

            let url = self
                .config
                .page_url_style
                .page_url(&category.seed_url, ctx.page_number);

            if let Err(e) = self.fetch_page(&url, &ctx).await {
                self.failures
                    .record_page_failure(self.session.page(), &ctx, &e)
                    .await;
                report.status = CategoryStatus::Aborted;
                break;
            }
            report.pages_fetched += 1;

            let extraction = match self
                .pipeline
                .extract_page(self.session.page(), &ctx, self.failures)
                .await
            {
                Ok(extraction) => extraction,
                Err(e) => {
                    self.failures
                        .record_page_failure(self.session.page(), &ctx, &e)
                        .await;
                    report.status = CategoryStatus::Aborted;
                    break;
                }
            };
            report.elements_skipped += extraction.elements_skipped as u64;

            // Pagination metadata is read once, from the first page, and
            // then fixed for the category.
            if ctx.page_number == 1 {
                match extraction.total_pages {
                    Some(total) if total >= 1 => {
                        ctx.total_pages = total;
                        info!(category = %category.name, total, "pagination metadata read");
                    }
                    _ => {
                        warn!(
                            category = %category.name,
                            "no pagination metadata found, assuming a single page"
                        );
                    }
                }
            }

            if extraction.candidates.is_empty() {
                if ctx.page_number == 1 {
                    warn!(
                        category = %category.name,
                        "no entries on the first page; the category may be empty or the site changed shape"
                    );
                    report.status = CategoryStatus::EmptyFirstPage;
                    break;
                }
                if !retried_empty {
                    // A transient render glitch can read as an empty
                    // page; re-fetch once before calling it the end.
                    retried_empty = true;
                    info!(
                        category = %category.name,
                        page = ctx.page_number,
                        "empty page past the first, retrying once"
                    );
                    self.pacing.pause(PacingProfile::ErrorBackoff).await;
                    continue;
                }
                info!(
                    category = %category.name,
                    page = ctx.page_number,
                    "empty page confirmed, treating as end of pagination"
                );
                break;
            }
            retried_empty = false;

            self.emit_page(extraction, &ctx, sink, &mut report).await;

            if ctx.page_number >= ctx.total_pages {
                break;
            }
            ctx.page_number += 1;
            self.pacing.pause(PacingProfile::InterPage).await;
        }

        info!(
            category = %category.name,
            status = ?report.status,
            pages = report.pages_fetched,
            records = report.records_emitted,
            "category finished"
        );
        report
    }

    async fn fetch_page(&self, url: &str, ctx: &PageContext) -> BrowserResult<()> {
        self.session
            .navigate(
                url,
                WaitStrategy::DomContentLoaded,
                self.config.navigation_timeout(),
            )
            .await?;
        if ctx.page_number == 1 {
            self.session
                .handle_cookie_consent(
                    &self.config.selectors.cookie_consent,
                    self.config.element_timeout(),
                    self.pacing,
                )
                .await;
        }
        self.session
            .scroll_to_bottom(self.config.max_scrolls, self.config.scroll_delay)
            .await?;
        Ok(())
    }

    async fn emit_page(
        &mut self,
        extraction: PageExtraction,
        ctx: &PageContext,
        sink: &mut dyn RecordSink,
        report: &mut CategoryReport,
    ) {
        for candidate in &extraction.candidates {
            if !self.dedup.accept(&candidate.id) {
                report.duplicates_skipped += 1;
                continue;
            }
            let venue = extraction.resolve_venue(candidate);
            let record = NormalizedRecord::from_candidate(
                &self.config.source,
                &ctx.category.name,
                candidate.clone(),
                venue,
            );
            match sink.emit(&record).await {
                Ok(()) => report.records_emitted += 1,
                Err(e) => {
                    warn!(record = %record.id, sink = sink.name(), error = %e, "sink emit failed");
                    report.emit_failures += 1;
                }
            }
            self.pacing.pause(PacingProfile::PerElement).await;
        }
    }
}
