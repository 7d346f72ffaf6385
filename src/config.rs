//! Configuration for the stats worker
//!
//! Provides the worker tunables with sensible defaults, a builder, and
//! validation. The reporting period and command queue depth are fixed for
//! the lifetime of a worker.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a stats worker
///
/// # Example
///
/// ```rust
/// use viewstats::config::StatsConfig;
/// use std::time::Duration;
///
/// let config = StatsConfig::builder()
///     .reporting_interval(Duration::from_secs(5))
///     .command_queue_capacity(4096)
///     .build()
///     .unwrap();
/// assert_eq!(config.reporting_interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Period between reporting ticks that push snapshots to subscribers
    #[serde(default = "default_reporting_interval")]
    pub reporting_interval: Duration,

    /// Bounded depth of the worker command queue
    ///
    /// When the queue is full, callers block on enqueue until the worker
    /// drains it (backpressure upstream).
    #[serde(default = "default_command_queue_capacity")]
    pub command_queue_capacity: usize,
}

fn default_reporting_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_command_queue_capacity() -> usize {
    1024
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            reporting_interval: default_reporting_interval(),
            command_queue_capacity: default_command_queue_capacity(),
        }
    }
}

impl StatsConfig {
    /// Create a new config builder
    pub fn builder() -> StatsConfigBuilder {
        StatsConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.reporting_interval.is_zero() {
            return Err("reporting_interval must be > 0".to_string());
        }
        if self.command_queue_capacity == 0 {
            return Err("command_queue_capacity must be > 0".to_string());
        }
        Ok(())
    }
}

/// Builder for [`StatsConfig`]
#[derive(Debug, Default)]
pub struct StatsConfigBuilder {
    config: StatsConfig,
}

impl StatsConfigBuilder {
    /// Set the reporting period
    pub fn reporting_interval(mut self, interval: Duration) -> Self {
        self.config.reporting_interval = interval;
        self
    }

    /// Set the command queue depth
    pub fn command_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.command_queue_capacity = capacity;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<StatsConfig, String> {
        self.config.validate()?;
        Ok(self.config)
    }
}
