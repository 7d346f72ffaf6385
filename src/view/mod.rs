//! Views: aggregation recipes over a measure
//!
//! A [`View`] binds a measure to an aggregation, a window, and an ordered
//! list of projected tag keys. Registering a view with the worker creates a
//! live [`Collector`] that groups samples by tag signature and maintains
//! one window state per group.
//!
//! # Example
//!
//! ```rust
//! use viewstats::aggregation::Aggregation;
//! use viewstats::types::{Measure, MeasureKind};
//! use viewstats::view::View;
//! use viewstats::window::Window;
//!
//! let measure = Measure::new("latency", "request latency", "ms", MeasureKind::Float64);
//! let view = View::new(
//!     "latency_by_method",
//!     "latency distribution per HTTP method",
//!     vec!["method".to_string()],
//!     measure,
//!     Aggregation::distribution(vec![5.0, 50.0, 500.0]).unwrap(),
//!     Window::cumulative(),
//! );
//! assert_eq!(view.name(), "latency_by_method");
//! ```

pub mod collector;

pub use collector::Collector;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use crate::aggregation::{Aggregation, AggregatorValue};
use crate::types::{Measure, Tag};
use crate::window::Window;

/// A recipe binding a measure to an aggregation, window and tag projection
///
/// Views are detached descriptors until registered through the worker.
/// The name is globally unique among registered views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    name: String,
    description: String,
    tag_keys: Vec<String>,
    measure: Measure,
    aggregation: Aggregation,
    window: Window,
}

impl View {
    /// Create a new detached view descriptor
    ///
    /// Samples recorded against `measure` are grouped by the values of
    /// `tag_keys` (in order); tag keys the recording does not carry
    /// project to an empty value.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        tag_keys: Vec<String>,
        measure: Measure,
        aggregation: Aggregation,
        window: Window,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            tag_keys,
            measure,
            aggregation,
            window,
        }
    }

    /// The globally unique view name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Projected tag keys, in projection order
    pub fn tag_keys(&self) -> &[String] {
        &self.tag_keys
    }

    /// The measure this view aggregates
    pub fn measure(&self) -> &Measure {
        &self.measure
    }

    /// The aggregation template
    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }

    /// The window template
    pub fn window(&self) -> &Window {
        &self.window
    }
}

/// One (projected tags, aggregator snapshot) pair in a view's output
///
/// Rows are value copies: mutating a row never touches worker state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    /// Projected tags present on the recordings, in view-key order
    pub tags: Vec<Tag>,
    /// Aggregated state for this tag combination
    pub value: AggregatorValue,
}

impl Row {
    /// Approximate equality: exact tags, aggregator within float tolerance
    pub fn approx_eq(&self, other: &Row) -> bool {
        self.tags == other.tags && self.value.approx_eq(&other.value)
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "] {}", self.value)
    }
}

/// A complete snapshot of one view, delivered to subscriber sinks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewData {
    /// Name of the view this snapshot belongs to
    pub view_name: String,
    /// All non-empty rows at collection time
    pub rows: Vec<Row>,
    /// Wall-clock instant the snapshot was taken
    pub collected_at: SystemTime,
}
