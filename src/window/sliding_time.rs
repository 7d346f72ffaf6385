//! Time-based sliding window
//!
//! A ring of `N + 1` sub-buckets, each covering `D / N` of wall-clock
//! time. The head (newest) bucket is always partial; the oldest bucket
//! leaves the window gradually as time advances, so snapshots blend it in
//! by the fraction of its span still inside `[now - D, now]`.

use std::time::{Duration, Instant};

use crate::aggregation::{Aggregation, AggregatorValue};

/// Sliding window over the trailing `duration` of wall-clock time
#[derive(Debug, Clone)]
pub struct SlidingTimeWindow {
    sub_interval: Duration,
    /// Ring of N + 1 sub-buckets; `head` is the newest.
    buckets: Vec<AggregatorValue>,
    head: usize,
    /// Start instant of the head bucket. Anchored to the first sample.
    head_start: Instant,
}

impl SlidingTimeWindow {
    /// Create an empty window anchored at `now`
    ///
    /// `duration` and `sub_intervals` are pre-validated by
    /// [`Window::sliding_time`](super::Window::sliding_time).
    pub fn new(
        aggregation: &Aggregation,
        duration: Duration,
        sub_intervals: usize,
        now: Instant,
    ) -> Self {
        let buckets = (0..sub_intervals + 1)
            .map(|_| aggregation.new_value())
            .collect();
        Self {
            sub_interval: duration / sub_intervals as u32,
            buckets,
            head: 0,
            head_start: now,
        }
    }

    /// Record one sample at `now`
    pub fn add_sample(&mut self, value: f64, now: Instant) {
        self.advance(now);
        self.buckets[self.head].add_sample(value);
    }

    /// Rotate the ring until `now` falls inside the head bucket
    ///
    /// Each rotation clears the slot that becomes the new head. An `now`
    /// earlier than the head start (time moving backwards between
    /// producers) is treated as zero elapsed.
    fn advance(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.head_start);
        if elapsed < self.sub_interval {
            return;
        }

        let steps = elapsed.as_nanos() / self.sub_interval.as_nanos();
        if steps >= self.buckets.len() as u128 {
            // Everything in the ring has expired.
            for bucket in &mut self.buckets {
                bucket.clear();
            }
        } else {
            for _ in 0..steps {
                self.head = (self.head + 1) % self.buckets.len();
                self.buckets[self.head].clear();
            }
        }

        // Snap the head start onto the bucket grid just below `now`.
        let remainder = elapsed.as_nanos() % self.sub_interval.as_nanos();
        self.head_start = now - Duration::from_nanos(remainder as u64);
    }

    /// Point-in-time aggregator over `[now - D, now]`
    ///
    /// Merges the head and the `N - 1` buckets behind it in full, then
    /// blends the oldest ring bucket prorated by the fraction of its span
    /// still inside the window.
    pub fn snapshot_at(&mut self, now: Instant) -> Option<AggregatorValue> {
        self.advance(now);

        let len = self.buckets.len();
        let oldest = (self.head + 1) % len;

        let elapsed_in_head = now.saturating_duration_since(self.head_start);
        let fraction = 1.0 - elapsed_in_head.as_secs_f64() / self.sub_interval.as_secs_f64();

        let mut result = self.buckets[oldest].scale_by_fraction(fraction);
        // Remaining buckets oldest to newest, ending at the head.
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregation;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    fn count_window(start: Instant) -> SlidingTimeWindow {
        SlidingTimeWindow::new(&Aggregation::count(), Duration::from_secs(10), 5, start)
    }

    fn count_at(window: &mut SlidingTimeWindow, at: Instant) -> u64 {
        window.snapshot_at(at).map(|agg| agg.count()).unwrap_or(0)
    }

    #[test]
    fn test_expired_samples_leave_the_window() {
        let start = Instant::now();
        let mut window = count_window(start + secs(1.0));

        window.add_sample(1.0, start + secs(1.0));
        for t in [6.0, 6.0, 10.0, 10.0, 14.0, 14.0] {
            window.add_sample(1.0, start + secs(t));
        }

        assert_eq!(count_at(&mut window, start + secs(14.0)), 6);
        assert_eq!(count_at(&mut window, start + secs(18.0)), 4);
        assert_eq!(count_at(&mut window, start + secs(22.0)), 2);
    }

    #[test]
    fn test_oldest_bucket_prorated() {
        let start = Instant::now();
        let mut window = count_window(start + secs(3.0));

        // 7 samples: 1 in [3,5), 2 in [5,7), 3 in [7,9), 1 in [9,11).
        window.add_sample(1.0, start + secs(3.0));
        window.add_sample(2.0, start + secs(5.0));
        window.add_sample(3.0, start + secs(5.0));
        window.add_sample(4.0, start + secs(8.0));
        window.add_sample(5.0, start + secs(8.0));
        window.add_sample(5.0, start + secs(8.0));
        window.add_sample(5.0, start + secs(9.0));

        assert_eq!(count_at(&mut window, start + secs(10.0)), 7);
        assert_eq!(count_at(&mut window, start + secs(12.0)), 7);
        // Oldest bucket [5,7) holds 2 samples, 80% still in window.
        assert_eq!(count_at(&mut window, start + secs(15.4)), 6);
        assert_eq!(count_at(&mut window, start + secs(16.0)), 5);
        // Oldest bucket [7,9) holds 3 samples, 90% still in window.
        assert_eq!(count_at(&mut window, start + secs(17.2)), 4);
        assert_eq!(count_at(&mut window, start + secs(18.0)), 3);
        assert_eq!(count_at(&mut window, start + secs(18.6)), 2);
    }

    #[test]
    fn test_snapshot_far_in_the_future_is_empty() {
        let start = Instant::now();
        let mut window = count_window(start);
        window.add_sample(1.0, start);

        assert!(window.snapshot_at(start + secs(60.0)).is_none());
    }

    #[test]
    fn test_now_before_head_start_counts_as_zero_elapsed() {
        let start = Instant::now();
        let mut window = count_window(start + secs(5.0));
        window.add_sample(1.0, start + secs(5.0));

        // A producer with a slightly older clock must not rotate the ring.
        assert_eq!(count_at(&mut window, start + secs(4.0)), 1);
    }

    #[test]
    fn test_distribution_oldest_bucket_taken_whole() {
        let agg = Aggregation::distribution(vec![2.0]).unwrap();
        let start = Instant::now();
        let mut window =
            SlidingTimeWindow::new(&agg, Duration::from_secs(10), 5, start + secs(3.0));

        for (value, t) in [
            (1.0, 3.0),
            (2.0, 5.0),
            (3.0, 5.0),
            (4.0, 8.0),
            (5.0, 8.0),
            (5.0, 8.0),
            (5.0, 9.0),
        ] {
            window.add_sample(value, start + secs(t));
        }

        // At t+15 the [3,5) bucket has expired; [5,7) is the partial oldest
        // and distributions include it whole: {2,3,4,5,5,5}.
        let snapshot = window.snapshot_at(start + secs(15.0)).unwrap();
        assert_eq!(snapshot.count(), 6);
        match snapshot {
            crate::aggregation::AggregatorValue::Distribution(d) => {
                assert_eq!(d.min(), 2.0);
                assert_eq!(d.max(), 5.0);
                assert!((d.mean() - 4.0).abs() < 1e-9);
                assert_eq!(d.count_per_bucket(), &[0, 6]);
            }
            _ => panic!("expected distribution"),
        }
    }
}
