//! The narrow output seam.
//!
//! The engine only produces an ordered sequence of normalized records;
//! on-disk and message-bus formatting live behind this trait in the
//! consuming application. Emit failures are logged and counted but
//! never halt a run.

use async_trait::async_trait;

use crate::error::{SinkError, SinkResult};
use crate::types::NormalizedRecord;

/// Consumer of normalized records, in encounter order.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Emit one record. An error is an acknowledgment failure, not a
    /// run failure.
    async fn emit(&mut self, record: &NormalizedRecord) -> SinkResult<()>;

    /// Sink name for logging.
    fn name(&self) -> &str {
        "unknown"
    }
}

/// In-memory sink collecting records in order.
///
/// The default aggregator for library callers and tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<NormalizedRecord>,
    reject_ids: Vec<String>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject records with this id, for failure-tolerance tests.
    pub fn rejecting(mut self, id: impl Into<String>) -> Self {
        self.reject_ids.push(id.into());
        self
    }

    /// Records collected so far, in emit order.
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    /// Consume the sink, returning the collected records.
    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }

    /// Number of collected records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn emit(&mut self, record: &NormalizedRecord) -> SinkResult<()> {
        if self.reject_ids.iter().any(|id| id == &record.id) {
            return Err(SinkError::Rejected(format!(
                "sink configured to reject id {}",
                record.id
            )));
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
