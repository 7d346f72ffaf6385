//! viewstats - Stats collection with tag-dimensioned views
//!
//! This library accepts numeric measurements tagged with key/value
//! dimensions, aggregates them according to user-defined views, and
//! surfaces the results to subscribers or on-demand readers:
//!
//! - Single-threaded worker task serializing all state changes
//! - Numerically stable streaming aggregators (count, histogram
//!   distribution with Welford mean/variance)
//! - Cumulative, time-sliding and count-sliding windows with proration
//!   of the oldest partial sub-bucket

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregation;
pub mod config;
pub mod error;
mod registry;
pub mod types;
pub mod view;
pub mod window;
pub mod worker;

// Re-export main types
pub use aggregation::{Aggregation, AggregatorValue};
pub use config::StatsConfig;
pub use error::{Error, Result};
pub use types::{Measure, MeasureKind, Tag, TagSet};
pub use view::{Row, View, ViewData};
pub use window::Window;
pub use worker::Stats;
