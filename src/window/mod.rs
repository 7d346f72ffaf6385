//! Windowing engine
//!
//! A window decides which recorded samples still contribute to an
//! aggregator at snapshot time. The set of windows is a closed sum:
//!
//! - **Cumulative**: every sample since the row was created
//! - **SlidingTime(D, N)**: the last `D` of wall-clock time, tracked in
//!   `N + 1` sub-buckets of `D / N` each
//! - **SlidingCount(M, N)**: approximately the last `M` samples, tracked in
//!   `N + 1` sub-buckets of `ceil(M / N)` samples each
//!
//! Sliding windows keep one more sub-bucket than the window nominally
//! spans; at snapshot time the oldest sub-bucket only partially overlaps
//! the window and is blended in prorated (counts) or whole (distributions,
//! see [`DistributionValue::scale_by_fraction`]).
//!
//! [`DistributionValue::scale_by_fraction`]: crate::aggregation::DistributionValue::scale_by_fraction

pub mod cumulative;
pub mod sliding_count;
pub mod sliding_time;

pub use cumulative::CumulativeWindow;
pub use sliding_count::SlidingCountWindow;
pub use sliding_time::SlidingTimeWindow;

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::aggregation::{Aggregation, AggregatorValue};

/// Maximum sub-buckets a sliding window may be configured with
///
/// Bounds the ring allocation per view row and keeps the sub-interval
/// arithmetic inside `u32` range.
pub const MAX_SUB_BUCKETS: usize = 1_000_000;

/// Window template carried by a view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Window {
    /// Aggregate everything since row creation
    Cumulative,
    /// Aggregate the trailing `duration`, in `sub_intervals` time slices
    SlidingTime {
        /// Window span
        duration: Duration,
        /// Number of full sub-buckets inside the span
        sub_intervals: usize,
    },
    /// Aggregate approximately the trailing `count` samples
    SlidingCount {
        /// Window size in samples
        count: u64,
        /// Number of full sub-buckets inside the window
        sub_buckets: usize,
    },
}

impl Window {
    /// Cumulative window template
    pub fn cumulative() -> Self {
        Window::Cumulative
    }

    /// Time-based sliding window template
    ///
    /// Requires `duration > 0` and `sub_intervals >= 1`, with the resulting
    /// sub-interval `duration / sub_intervals` non-zero.
    pub fn sliding_time(duration: Duration, sub_intervals: usize) -> Result<Self, String> {
        if duration.is_zero() {
            return Err("sliding time window duration must be > 0".to_string());
        }
        if sub_intervals == 0 {
            return Err("sliding time window needs at least one sub-interval".to_string());
        }
        if sub_intervals > MAX_SUB_BUCKETS {
            return Err(format!(
                "sliding time window sub-intervals {} exceeds maximum {}",
                sub_intervals, MAX_SUB_BUCKETS
            ));
        }
        if (duration / sub_intervals as u32).is_zero() {
            return Err(format!(
                "sliding time window duration {:?} too short for {} sub-intervals",
                duration, sub_intervals
            ));
        }
        Ok(Window::SlidingTime {
            duration,
            sub_intervals,
        })
    }

    /// Count-based sliding window template
    ///
    /// Requires `count >= sub_buckets >= 1`; `count` divisible by
    /// `sub_buckets` is recommended so every sub-bucket targets the same
    /// number of samples.
    pub fn sliding_count(count: u64, sub_buckets: usize) -> Result<Self, String> {
        if sub_buckets == 0 {
            return Err("sliding count window needs at least one sub-bucket".to_string());
        }
        if sub_buckets > MAX_SUB_BUCKETS {
            return Err(format!(
                "sliding count window sub-buckets {} exceeds maximum {}",
                sub_buckets, MAX_SUB_BUCKETS
            ));
        }
        if count < sub_buckets as u64 {
            return Err(format!(
                "sliding count window size {} smaller than {} sub-buckets",
                count, sub_buckets
            ));
        }
        Ok(Window::SlidingCount { count, sub_buckets })
    }

    /// Instantiate the window state for one view row
    ///
    /// `now` anchors the first sub-bucket of a time-sliding window to the
    /// instant the row saw its first sample.
    pub(crate) fn new_state(&self, aggregation: &Aggregation, now: Instant) -> WindowState {
        match *self {
            Window::Cumulative => WindowState::Cumulative(CumulativeWindow::new(aggregation)),
            Window::SlidingTime {
                duration,
                sub_intervals,
            } => WindowState::SlidingTime(SlidingTimeWindow::new(
                aggregation,
                duration,
                sub_intervals,
                now,
            )),
            Window::SlidingCount { count, sub_buckets } => {
                WindowState::SlidingCount(SlidingCountWindow::new(aggregation, count, sub_buckets))
            }
        }
    }
}

/// Live window state for one view row
#[derive(Debug, Clone)]
pub enum WindowState {
    /// Cumulative state
    Cumulative(CumulativeWindow),
    /// Time-based sliding state
    SlidingTime(SlidingTimeWindow),
    /// Count-based sliding state
    SlidingCount(SlidingCountWindow),
}

impl WindowState {
    /// Record one sample at `now`
    pub fn add_sample(&mut self, value: f64, now: Instant) {
        match self {
            WindowState::Cumulative(w) => w.add_sample(value),
            WindowState::SlidingTime(w) => w.add_sample(value, now),
            WindowState::SlidingCount(w) => w.add_sample(value),
        }
    }

    /// Point-in-time aggregator over the window's current contents
    ///
    /// Returns `None` when nothing inside the window has been recorded;
    /// the collector omits such rows.
    pub fn snapshot_at(&mut self, now: Instant) -> Option<AggregatorValue> {
        let snapshot = match self {
            WindowState::Cumulative(w) => w.snapshot(),
            WindowState::SlidingTime(w) => w.snapshot_at(now),
            WindowState::SlidingCount(w) => w.snapshot(),
        };
        snapshot.filter(|agg| !agg.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sliding_time_validation() {
        assert!(Window::sliding_time(Duration::from_secs(10), 5).is_ok());
        assert!(Window::sliding_time(Duration::ZERO, 5).is_err());
        assert!(Window::sliding_time(Duration::from_secs(10), 0).is_err());
        assert!(Window::sliding_time(Duration::from_nanos(3), 10).is_err());
        assert!(Window::sliding_time(Duration::from_secs(10), MAX_SUB_BUCKETS + 1).is_err());
    }

    #[test]
    fn test_sliding_count_validation() {
        assert!(Window::sliding_count(12, 4).is_ok());
        assert!(Window::sliding_count(4, 4).is_ok());
        assert!(Window::sliding_count(3, 4).is_err());
        assert!(Window::sliding_count(12, 0).is_err());
    }

    #[test]
    fn test_empty_snapshot_is_none() {
        let agg = Aggregation::count();
        let now = Instant::now();
        for window in [
            Window::cumulative(),
            Window::sliding_time(Duration::from_secs(10), 5).unwrap(),
            Window::sliding_count(12, 4).unwrap(),
        ] {
            let mut state = window.new_state(&agg, now);
            assert!(state.snapshot_at(now).is_none());
        }
    }
}
