//! Run-scoped duplicate suppression.

use std::collections::HashSet;

use tracing::debug;

/// Set of record ids already seen this run.
///
/// Scope is the entire run, not per-category or per-page: the same
/// physical record appearing under two categories is emitted once,
/// tagged with the category in which it was first seen. Duplicates are
/// not errors; they are counted and discarded silently.
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<String>,
    duplicates: u64,
}

impl Deduplicator {
    /// Create an empty deduplicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the id if unseen this run; `false` means duplicate.
    pub fn accept(&mut self, id: &str) -> bool {
        if self.seen.contains(id) {
            self.duplicates += 1;
            debug!(%id, "skipping duplicate record id");
            return false;
        }
        self.seen.insert(id.to_string());
        true
    }

    /// Number of distinct ids accepted.
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }

    /// Number of duplicates discarded.
    pub fn duplicate_count(&self) -> u64 {
        self.duplicates
    }
}
