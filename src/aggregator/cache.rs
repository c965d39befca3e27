//! Host-side memo of per-park mode counts.
//!
//! Only references that have not been computed yet are sent to the
//! aggregator, in bounded batches. A reference the aggregator had no records
//! for is remembered as zero so it is not asked for again.

use std::collections::{HashMap, HashSet};

use crate::aggregator::QsoResult;
use crate::mode::ModeCounts;

/// Upper bound on references per `COMPUTE` message.
pub const DEFAULT_BATCH_SIZE: usize = 250;

#[derive(Debug, Clone, Default)]
pub struct ModeCountCache {
    counts: HashMap<String, ModeCounts>,
}

impl ModeCountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts for `reference`, zero when unknown.
    pub fn get(&self, reference: &str) -> ModeCounts {
        self.counts.get(reference).copied().unwrap_or_default()
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.counts.contains_key(reference)
    }

    /// References not cached yet, deduplicated, in first-seen order.
    pub fn missing(&self, references: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        references
            .iter()
            .filter(|reference| !self.counts.contains_key(reference.as_str()))
            .filter(|reference| seen.insert(reference.as_str()))
            .cloned()
            .collect()
    }

    /// Stores a `COMPUTE` result for the references that were asked for.
    pub fn absorb(&mut self, requested: &[String], mut result: QsoResult) {
        for reference in requested {
            let counts = result.remove(reference).unwrap_or_default();
            self.counts.insert(reference.clone(), counts);
        }
    }

    pub fn clear(&mut self) {
        self.counts.clear();
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Splits pending references into `COMPUTE`-sized batches.
pub fn batches(references: &[String], batch_size: usize) -> impl Iterator<Item = &[String]> {
    references.chunks(batch_size.max(1))
}
