//! Count-based sliding window
//!
//! A ring of `N + 1` sub-buckets, each holding up to `ceil(M / N)`
//! samples. The ring rotates lazily: a sample that finds the head full
//! first rotates and clears the slot it moves into, so a head that has
//! just filled still exposes the whole ring to snapshots.

use crate::aggregation::{Aggregation, AggregatorValue};

/// Sliding window over approximately the trailing `count` samples
#[derive(Debug, Clone)]
pub struct SlidingCountWindow {
    /// Samples each sub-bucket holds before the ring rotates
    bucket_capacity: u64,
    /// Ring of N + 1 sub-buckets; `head` is the newest.
    buckets: Vec<AggregatorValue>,
    head: usize,
    /// Samples currently in the head bucket
    head_fill: u64,
}

impl SlidingCountWindow {
    /// Create an empty window
    ///
    /// `count` and `sub_buckets` are pre-validated by
    /// [`Window::sliding_count`](super::Window::sliding_count).
    pub fn new(aggregation: &Aggregation, count: u64, sub_buckets: usize) -> Self {
        let buckets = (0..sub_buckets + 1)
            .map(|_| aggregation.new_value())
            .collect();
        Self {
            bucket_capacity: count.div_ceil(sub_buckets as u64),
            buckets,
            head: 0,
            head_fill: 0,
        }
    }

    /// Record one sample
    pub fn add_sample(&mut self, value: f64) {
        if self.head_fill >= self.bucket_capacity {
            self.head = (self.head + 1) % self.buckets.len();
            self.buckets[self.head].clear();
            self.head_fill = 0;
        }
        self.buckets[self.head].add_sample(value);
        self.head_fill += 1;
    }

    /// Point-in-time aggregator over the ring's current contents
    ///
    /// Merges the head and the `N - 1` buckets behind it in full; the
    /// oldest ring bucket is blended in prorated by how far the head has
    /// filled (a freshly rotated head keeps little of the oldest bucket,
    /// a full head keeps all of it).
    pub fn snapshot(&self) -> Option<AggregatorValue> {
        let len = self.buckets.len();
        let oldest = (self.head + 1) % len;
        let fraction = self.head_fill as f64 / self.bucket_capacity as f64;

        let mut result = self.buckets[oldest].scale_by_fraction(fraction);
        for offset in 2..=len {
            result.merge(&self.buckets[(self.head + offset) % len]);
        }

        if result.is_empty() {
            None
        } else {
            Some(result)
        }
    }
}
