//! Core data types used throughout the stats library
//!
//! This module defines the fundamental data structures used across the system:
//!
//! # Key Types
//!
//! - **`Measure`**: A named numeric input definition (kind + unit)
//! - **`MeasureKind`**: The sample type a measure accepts (`Int64` or `Float64`)
//! - **`MeasureValue`**: A single recorded sample
//! - **`TagSet`**: Ordered key-value dimensions attached to a recording
//! - **`Tag`**: One (key, value) pair as projected into a view row
//!
//! # Example
//!
//! ```rust
//! use viewstats::types::{Measure, MeasureKind, TagSet};
//!
//! let measure = Measure::new("request_latency", "latency per request", "ms", MeasureKind::Float64);
//!
//! let mut tags = TagSet::new();
//! tags.insert("method", "GET");
//! tags.insert("status", "200");
//! assert_eq!(tags.get("method"), Some("GET"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Separator between projected tag values in a canonical signature.
///
/// ASCII unit separator: never appears in ordinary tag values, so the
/// concatenation stays unambiguous. Fixed for the life of the crate.
pub(crate) const SIGNATURE_SEPARATOR: char = '\u{1f}';

/// The sample type a measure accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MeasureKind {
    /// 64-bit signed integer samples
    Int64,
    /// IEEE-754 double precision samples
    Float64,
}

impl fmt::Display for MeasureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureKind::Int64 => write!(f, "int64"),
            MeasureKind::Float64 => write!(f, "float64"),
        }
    }
}

/// A named numeric input definition
///
/// Measures are immutable once created. The name is globally unique across
/// both kinds: creating an `Int64` measure named "m" blocks a later
/// `Float64` measure with the same name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measure {
    name: String,
    description: String,
    unit: String,
    kind: MeasureKind,
}

impl Measure {
    /// Create a new measure descriptor
    ///
    /// The descriptor is detached until registered through the worker's
    /// `create_measure`; construction alone performs no uniqueness check.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        kind: MeasureKind,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            unit: unit.into(),
            kind,
        }
    }

    /// The globally unique measure name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Unit of the recorded samples (e.g. "ms", "bytes")
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// The sample kind this measure accepts
    pub fn kind(&self) -> MeasureKind {
        self.kind
    }
}

/// A single recorded sample
///
/// Recording a value whose kind does not match the measure's kind is
/// silently ignored by the worker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MeasureValue {
    /// A sample for an `Int64` measure
    Int64(i64),
    /// A sample for a `Float64` measure
    Float64(f64),
}

impl MeasureValue {
    /// The kind of this sample
    pub fn kind(&self) -> MeasureKind {
        match self {
            MeasureValue::Int64(_) => MeasureKind::Int64,
            MeasureValue::Float64(_) => MeasureKind::Float64,
        }
    }

    /// The sample coerced to `f64`, the representation aggregators consume
    pub fn as_f64(&self) -> f64 {
        match *self {
            MeasureValue::Int64(v) => v as f64,
            MeasureValue::Float64(v) => v,
        }
    }
}

/// One (key, value) dimension pair as projected into a view row
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Dimension name
    pub key: String,
    /// Dimension value
    pub value: String,
}

impl Tag {
    /// Create a new tag
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Ordered set of key-value dimensions attached to a recording
///
/// Keys are kept in canonical (byte-wise) order, so two tag sets built with
/// different insertion orders compare equal and produce the same signature.
///
/// # Example
///
/// ```rust
/// use viewstats::types::TagSet;
///
/// let mut a = TagSet::new();
/// a.insert("host", "web-01");
/// a.insert("dc", "us-east");
///
/// let mut b = TagSet::new();
/// b.insert("dc", "us-east");
/// b.insert("host", "web-01");
///
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    tags: BTreeMap<String, String>,
}

impl TagSet {
    /// Create a new empty tag set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a dimension, replacing any previous value for the key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Build a tag set from (key, value) pairs
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (k, v) in pairs {
            set.insert(k, v);
        }
        set
    }

    /// Get the value recorded for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set holds no dimensions
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Iterate dimensions in canonical key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical signature of this tag set under a view's key projection
    ///
    /// Concatenates the values of `keys` in the given order, separated by a
    /// fixed unit separator. Keys absent from the set contribute an empty
    /// value for their position. Two recordings hit the same view row iff
    /// their signatures are byte-equal.
    pub fn signature(&self, keys: &[String]) -> String {
        let mut sig = String::new();
        for (i, key) in keys.iter().enumerate() {
            if i > 0 {
                sig.push(SIGNATURE_SEPARATOR);
            }
            if let Some(value) = self.tags.get(key) {
                sig.push_str(value);
            }
        }
        sig
    }

    /// Project this set onto a view's keys, keeping only present keys
    ///
    /// The result is ordered by `keys`, not by the set's canonical order;
    /// keys the recording did not carry are omitted from the projection.
    pub fn project(&self, keys: &[String]) -> Vec<Tag> {
        keys.iter()
            .filter_map(|key| {
                self.tags
                    .get(key)
                    .map(|value| Tag::new(key.clone(), value.clone()))
            })
            .collect()
    }
}
