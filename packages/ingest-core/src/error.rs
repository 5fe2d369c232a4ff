//! Typed errors for the ingestion engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! The propagation rules mirror the engine's recovery boundaries:
//! browser errors abort the current category, `ExtractError::Unavailable`
//! is consumed inside the extraction pipeline to trigger the DOM
//! fallback, element errors skip a single element, and only
//! `IngestError::Config` is fatal to a run.

use thiserror::Error;

/// Top-level errors surfaced to callers of a run.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Required configuration is missing or invalid at startup.
    ///
    /// The only fatal error class: a run never starts with a broken
    /// selector set or an empty category mapping.
    #[error("config error: {0}")]
    Config(String),

    /// Browser session could not be acquired.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}

/// Errors raised by the rendering-engine transport.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Page fetch failed outright.
    #[error("navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// Navigation or element wait exceeded its timeout.
    #[error("timed out after {timeout_ms}ms waiting on {what}")]
    Timeout { what: String, timeout_ms: u64 },

    /// In-page script evaluation failed.
    #[error("script evaluation failed: {0}")]
    Evaluation(String),

    /// Click or other page interaction failed.
    #[error("page interaction failed: {0}")]
    Interaction(String),

    /// The page was already closed.
    #[error("browser session closed")]
    SessionClosed,
}

/// Errors that can occur while extracting candidates from a page.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The embedded state blob is absent, unparsable, or does not match
    /// the expected shape. Triggers the DOM fallback strategy; never
    /// propagates past the extraction pipeline.
    #[error("embedded state unavailable: {reason}")]
    Unavailable { reason: String },

    /// A single DOM element is malformed or missing required fields.
    /// Recoverable: skip the element, continue the page.
    #[error("element {index} unparsable: {reason}")]
    Element { index: usize, reason: String },

    /// The transport failed mid-extraction. Page-granularity failure:
    /// the category is aborted, the run continues.
    #[error("browser failure during extraction: {0}")]
    Browser(#[from] BrowserError),
}

/// Errors returned by a record sink on emit.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink rejected the record. Logged and counted, never fatal.
    #[error("emit rejected: {0}")]
    Rejected(String),
}

/// Result type alias for run-level operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for browser transport operations.
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// Result type alias for extraction operations.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;
