//! Count aggregation value

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of samples recorded, regardless of their values
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountValue(u64);

impl CountValue {
    /// Create a zeroed counter
    pub fn new() -> Self {
        Self(0)
    }

    /// Create a counter holding `value`
    ///
    /// Intended for tests and snapshot reconstruction.
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }

    /// The accumulated count
    pub fn value(&self) -> u64 {
        self.0
    }

    /// Record one sample
    pub fn add_sample(&mut self) {
        self.0 += 1;
    }

    /// Add another counter into this one
    pub fn merge(&mut self, other: &CountValue) {
        self.0 += other.0;
    }

    /// Return a prorated copy, rounding half up
    ///
    /// Used when the oldest window sub-bucket only partially overlaps the
    /// window: a bucket of 3 samples at fraction 0.5 contributes 2.
    pub fn scale_by_fraction(&self, fraction: f64) -> CountValue {
        CountValue((self.0 as f64 * fraction + 0.5) as u64)
    }

    /// Reset to zero
    pub fn clear(&mut self) {
        self.0 = 0;
    }
}

impl fmt::Display for CountValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.0)
    }
}
