//! Cumulative window

use crate::aggregation::{Aggregation, AggregatorValue};

/// Window covering every sample since the row was created
///
/// A single aggregator with no expiry; snapshots are deep copies.
#[derive(Debug, Clone)]
pub struct CumulativeWindow {
    value: AggregatorValue,
}

impl CumulativeWindow {
    /// Create an empty cumulative window
    pub fn new(aggregation: &Aggregation) -> Self {
        Self {
            value: aggregation.new_value(),
        }
    }

    /// Record one sample
    pub fn add_sample(&mut self, value: f64) {
        self.value.add_sample(value);
    }

    /// Deep copy of the accumulated state
    pub fn snapshot(&self) -> Option<AggregatorValue> {
        Some(self.value.clone())
    }
}
