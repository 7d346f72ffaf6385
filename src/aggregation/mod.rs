//! Streaming aggregation engine
//!
//! Aggregators accumulate recorded samples per view row. The set of
//! aggregations is a closed sum:
//!
//! - **Count**: number of samples, regardless of value
//! - **Distribution**: histogram buckets plus running min/max/mean/variance
//!   (Welford's online algorithm)
//!
//! An [`Aggregation`] is the immutable template carried by a view; it stamps
//! out zeroed [`AggregatorValue`] accumulators, one per window sub-bucket.
//!
//! # Example
//!
//! ```rust
//! use viewstats::aggregation::Aggregation;
//!
//! let agg = Aggregation::distribution(vec![0.0, 10.0, 100.0]).unwrap();
//! let mut value = agg.new_value();
//! value.add_sample(42.0);
//! value.add_sample(7.0);
//! assert_eq!(value.count(), 2);
//! ```

pub mod count;
pub mod distribution;

pub use count::CountValue;
pub use distribution::DistributionValue;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation template carried by a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregation {
    /// Count samples, ignoring their values
    Count,
    /// Histogram distribution over the given bucket bounds
    Distribution {
        /// Strictly increasing finite bucket bounds; may be empty
        bounds: Vec<f64>,
    },
}

impl Aggregation {
    /// Count aggregation template
    pub fn count() -> Self {
        Aggregation::Count
    }

    /// Distribution aggregation template
    ///
    /// Bounds must be finite and strictly increasing. Empty bounds are
    /// legal and yield a single histogram bucket.
    pub fn distribution(bounds: Vec<f64>) -> Result<Self, String> {
        for pair in bounds.windows(2) {
            if pair[0] >= pair[1] {
                return Err(format!(
                    "distribution bounds must be strictly increasing, got {} then {}",
                    pair[0], pair[1]
                ));
            }
        }
        if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(format!("distribution bounds must be finite, got {}", b));
        }
        Ok(Aggregation::Distribution { bounds })
    }

    /// Stamp out a zeroed accumulator for this template
    pub fn new_value(&self) -> AggregatorValue {
        match self {
            Aggregation::Count => AggregatorValue::Count(CountValue::new()),
            Aggregation::Distribution { bounds } => {
                AggregatorValue::Distribution(DistributionValue::new(bounds.clone()))
            }
        }
    }
}

/// Accumulated aggregation state for one view row (or window sub-bucket)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AggregatorValue {
    /// Count accumulator
    Count(CountValue),
    /// Distribution accumulator
    Distribution(DistributionValue),
}

impl AggregatorValue {
    /// Record one sample
    pub fn add_sample(&mut self, value: f64) {
        match self {
            AggregatorValue::Count(c) => c.add_sample(),
            AggregatorValue::Distribution(d) => d.add_sample(value),
        }
    }

    /// Merge another accumulator of the same variant into this one
    ///
    /// Merging across variants is a no-op; variants are fixed per view at
    /// construction, so a mismatch never occurs on a healthy path.
    pub fn merge(&mut self, other: &AggregatorValue) {
        match (self, other) {
            (AggregatorValue::Count(a), AggregatorValue::Count(b)) => a.merge(b),
            (AggregatorValue::Distribution(a), AggregatorValue::Distribution(b)) => a.merge(b),
            _ => {}
        }
    }

    /// Return a copy scaled by `fraction`
    ///
    /// Counts are prorated with round-half-up. Distributions return an
    /// unchanged copy: the oldest partial window bucket is included in its
    /// entirety because min/max/variance and the histogram cannot be
    /// prorated consistently. The asymmetry is deliberate.
    pub fn scale_by_fraction(&self, fraction: f64) -> AggregatorValue {
        match self {
            AggregatorValue::Count(c) => AggregatorValue::Count(c.scale_by_fraction(fraction)),
            AggregatorValue::Distribution(d) => {
                AggregatorValue::Distribution(d.scale_by_fraction(fraction))
            }
        }
    }

    /// Reset to the zeroed state
    pub fn clear(&mut self) {
        match self {
            AggregatorValue::Count(c) => c.clear(),
            AggregatorValue::Distribution(d) => d.clear(),
        }
    }

    /// Number of samples accumulated
    pub fn count(&self) -> u64 {
        match self {
            AggregatorValue::Count(c) => c.value(),
            AggregatorValue::Distribution(d) => d.count(),
        }
    }

    /// Whether no samples have been accumulated
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Approximate equality with the float tolerances used for snapshots
    pub fn approx_eq(&self, other: &AggregatorValue) -> bool {
        match (self, other) {
            (AggregatorValue::Count(a), AggregatorValue::Count(b)) => a == b,
            (AggregatorValue::Distribution(a), AggregatorValue::Distribution(b)) => a.approx_eq(b),
            _ => false,
        }
    }
}

impl fmt::Display for AggregatorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregatorValue::Count(c) => c.fmt(f),
            AggregatorValue::Distribution(d) => d.fmt(f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distribution_bounds_validation() {
        assert!(Aggregation::distribution(vec![]).is_ok());
        assert!(Aggregation::distribution(vec![1.0, 2.0, 3.0]).is_ok());
        assert!(Aggregation::distribution(vec![1.0, 1.0]).is_err());
        assert!(Aggregation::distribution(vec![2.0, 1.0]).is_err());
        assert!(Aggregation::distribution(vec![f64::NAN]).is_err());
        assert!(Aggregation::distribution(vec![0.0, f64::INFINITY]).is_err());
    }

    #[test]
    fn test_template_stamps_zeroed_values() {
        let count = Aggregation::count().new_value();
        assert!(count.is_empty());

        let dist = Aggregation::distribution(vec![2.0]).unwrap().new_value();
        assert!(dist.is_empty());
        match dist {
            AggregatorValue::Distribution(d) => assert_eq!(d.count_per_bucket(), &[0, 0]),
            _ => panic!("expected distribution"),
        }
    }

    #[test]
    fn test_cross_variant_merge_is_noop() {
        let mut count = Aggregation::count().new_value();
        count.add_sample(1.0);

        let mut dist = Aggregation::distribution(vec![]).unwrap().new_value();
        dist.add_sample(1.0);

        count.merge(&dist);
        assert_eq!(count.count(), 1);
    }
}
