//! Failure recording and recovery classification.
//!
//! On an unexpected error the recorder captures a diagnostic artifact
//! (full-page snapshot keyed `{source}_{timestamp}`), logs the context,
//! and decides how far to unwind: page-granularity failures abort the
//! current category, element-granularity failures skip one element. No
//! single category's failure aborts the run.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::browser::BrowserPage;
use crate::types::PageContext;

/// Collaborator-provided store for diagnostic artifacts.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Persist one artifact under the given key.
    async fn store(
        &self,
        key: &str,
        bytes: &[u8],
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// How the run should proceed after a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Abort the current category, continue with the next one.
    AbortCategory,

    /// Skip the current element, continue the current page.
    SkipElement,
}

/// Captures diagnostics and classifies failures.
pub struct FailureRecorder {
    source: String,
    store: Arc<dyn ArtifactStore>,
    page_failures: u64,
    element_failures: u64,
}

impl FailureRecorder {
    /// Create a recorder for one run.
    pub fn new(source: impl Into<String>, store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            source: source.into(),
            store,
            page_failures: 0,
            element_failures: 0,
        }
    }

    /// Record a category/page-granularity failure (navigation,
    /// pagination-metadata read, mid-extraction transport loss).
    ///
    /// Captures a snapshot and directs the caller to abort the category.
    pub async fn record_page_failure(
        &mut self,
        page: &dyn BrowserPage,
        ctx: &PageContext,
        failure: &dyn std::fmt::Display,
    ) -> FailureAction {
        self.page_failures += 1;
        error!(
            category = %ctx.category.name,
            page = ctx.page_number,
            url = %page.current_url().await,
            %failure,
            "page-level failure, aborting category"
        );
        self.capture_snapshot(page).await;
        FailureAction::AbortCategory
    }

    /// Record an element-granularity failure (malformed element during
    /// extraction). The element is skipped; the page continues.
    pub fn record_element_failure(
        &mut self,
        ctx: &PageContext,
        failure: &dyn std::fmt::Display,
    ) -> FailureAction {
        self.element_failures += 1;
        warn!(
            category = %ctx.category.name,
            page = ctx.page_number,
            %failure,
            "skipping malformed element"
        );
        FailureAction::SkipElement
    }

    async fn capture_snapshot(&self, page: &dyn BrowserPage) {
        let bytes = match page.screenshot().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "could not capture diagnostic snapshot");
                return;
            }
        };
        let key = format!("{}_{}", self.source, Utc::now().format("%Y%m%d_%H%M%S"));
        match self.store.store(&key, &bytes).await {
            Ok(()) => info!(%key, "diagnostic artifact captured"),
            Err(e) => warn!(%key, error = %e, "failed to store diagnostic artifact"),
        }
    }

    /// Page-granularity failures recorded this run.
    pub fn page_failure_count(&self) -> u64 {
        self.page_failures
    }

    /// Element-granularity failures recorded this run.
    pub fn element_failure_count(&self) -> u64 {
        self.element_failures
    }
}

#[cfg(test)]
pub(crate) fn testing_recorder() -> FailureRecorder {
    FailureRecorder::new("test", Arc::new(crate::testing::MemoryArtifactStore::new()))
}
