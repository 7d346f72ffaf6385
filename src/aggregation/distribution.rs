//! Distribution aggregation value
//!
//! Tracks a histogram over fixed bucket bounds plus running count, min,
//! max, mean and sum of squared deviations. Mean and variance use
//! Welford's online algorithm so long sample streams stay numerically
//! stable; merging two distributions uses the parallel (Chan et al.)
//! combination of the same state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tolerance for mean/variance comparisons between snapshots
const EQUALITY_EPSILON: f64 = 1e-9;

/// Histogram distribution of recorded samples
///
/// Buckets are `(-inf, b0), [b0, b1), ..., [b_{n-1}, +inf)` for bounds
/// `b0 < b1 < ... < b_{n-1}`; empty bounds collapse to a single bucket.
///
/// Invariants: `count` equals the sum of `count_per_bucket`; every recorded
/// sample `x` satisfies `min <= x <= max`; with no samples, `min` and `max`
/// sit at `+inf`/`-inf` and `mean` is 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionValue {
    count: u64,
    min: f64,
    max: f64,
    mean: f64,
    sum_of_squared_deviation: f64,
    count_per_bucket: Vec<u64>,
    bounds: Vec<f64>,
}

impl DistributionValue {
    /// Create a zeroed distribution over the given bounds
    pub fn new(bounds: Vec<f64>) -> Self {
        let buckets = bounds.len() + 1;
        Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
            sum_of_squared_deviation: 0.0,
            count_per_bucket: vec![0; buckets],
            bounds,
        }
    }

    /// Assemble a distribution from raw parts
    ///
    /// Intended for tests and snapshot reconstruction; no invariant checks
    /// are performed beyond sizing `count_per_bucket` against `bounds`.
    pub fn from_parts(
        bounds: Vec<f64>,
        count_per_bucket: Vec<u64>,
        count: u64,
        min: f64,
        max: f64,
        mean: f64,
        sum_of_squared_deviation: f64,
    ) -> Self {
        debug_assert_eq!(count_per_bucket.len(), bounds.len() + 1);
        Self {
            count,
            min,
            max,
            mean,
            sum_of_squared_deviation,
            count_per_bucket,
            bounds,
        }
    }

    /// Number of samples recorded
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Smallest recorded sample (`+inf` before any sample)
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest recorded sample (`-inf` before any sample)
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Running mean of recorded samples
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sum of recorded samples, reconstructed as `mean * count`
    pub fn sum(&self) -> f64 {
        self.mean * self.count as f64
    }

    /// Sum of squared deviations from the mean (Welford's M2)
    pub fn sum_of_squared_deviation(&self) -> f64 {
        self.sum_of_squared_deviation
    }

    /// Sample variance: `M2 / (count - 1)`, or 0 with fewer than 2 samples
    pub fn variance(&self) -> f64 {
        if self.count <= 1 {
            return 0.0;
        }
        self.sum_of_squared_deviation / (self.count - 1) as f64
    }

    /// Occurrence count per histogram bucket
    pub fn count_per_bucket(&self) -> &[u64] {
        &self.count_per_bucket
    }

    /// The bucket bounds this distribution was built with
    pub fn bounds(&self) -> &[f64] {
        &self.bounds
    }

    /// Record one sample
    pub fn add_sample(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
        self.count += 1;
        self.increment_bucket(value);

        if self.count == 1 {
            self.mean = value;
            return;
        }

        let old_mean = self.mean;
        self.mean += (value - self.mean) / self.count as f64;
        self.sum_of_squared_deviation += (value - old_mean) * (value - self.mean);
    }

    fn increment_bucket(&mut self, value: f64) {
        for (i, bound) in self.bounds.iter().enumerate() {
            if value < *bound {
                self.count_per_bucket[i] += 1;
                return;
            }
        }
        // Last bucket also absorbs everything when bounds are empty.
        *self
            .count_per_bucket
            .last_mut()
            .expect("distribution always has at least one bucket") += 1;
    }

    /// Merge another distribution over the same bounds into this one
    ///
    /// Combines the Welford state with the parallel variance algorithm:
    /// `M2 = M2_a + M2_b + delta^2 * n_a * n_b / (n_a + n_b)`.
    pub fn merge(&mut self, other: &DistributionValue) {
        if other.count == 0 {
            return;
        }

        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }

        let combined = (self.count + other.count) as f64;
        let delta = other.mean - self.mean;
        self.sum_of_squared_deviation += other.sum_of_squared_deviation
            + delta * delta * (self.count as f64 * other.count as f64) / combined;
        self.mean = (self.sum() + other.sum()) / combined;
        self.count += other.count;

        for (mine, theirs) in self
            .count_per_bucket
            .iter_mut()
            .zip(other.count_per_bucket.iter())
        {
            *mine += theirs;
        }
    }

    /// Return an unchanged deep copy, ignoring `fraction`
    ///
    /// Distributions are never prorated: scaling the histogram, min, max
    /// and M2 by a time fraction cannot be done consistently, so the
    /// oldest partial window bucket is included in its entirety. Counts
    /// behave differently (see [`CountValue::scale_by_fraction`]).
    ///
    /// [`CountValue::scale_by_fraction`]: super::CountValue::scale_by_fraction
    pub fn scale_by_fraction(&self, _fraction: f64) -> DistributionValue {
        self.clone()
    }

    /// Reset to the zeroed state, keeping the bounds
    pub fn clear(&mut self) {
        self.count = 0;
        self.min = f64::INFINITY;
        self.max = f64::NEG_INFINITY;
        self.mean = 0.0;
        self.sum_of_squared_deviation = 0.0;
        for bucket in &mut self.count_per_bucket {
            *bucket = 0;
        }
    }

    /// Approximate equality between snapshots
    ///
    /// Bucket counts, count, min and max compare exactly; mean and variance
    /// compare within a squared tolerance of 1e-9. Bounds are assumed equal
    /// from view construction and are not compared.
    pub fn approx_eq(&self, other: &DistributionValue) -> bool {
        if self.count_per_bucket != other.count_per_bucket {
            return false;
        }

        let mean_delta = self.mean - other.mean;
        let var_delta = self.variance() - other.variance();
        self.count == other.count
            && self.min == other.min
            && self.max == other.max
            && mean_delta * mean_delta < EQUALITY_EPSILON
            && var_delta * var_delta < EQUALITY_EPSILON
    }
}

impl fmt::Display for DistributionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{} {} {} {} {} {:?} {:?}}}",
            self.count,
            self.min,
            self.max,
            self.mean,
            self.variance(),
            self.count_per_bucket,
            self.bounds
        )
    }
}
