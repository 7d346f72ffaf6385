//! Per-view sample collector
//!
//! Groups recorded samples by canonical tag signature and keeps one window
//! state per group. All access happens from the worker loop, so the
//! collector needs no interior locking.

use std::collections::HashMap;
use std::time::Instant;

use super::{Row, View};
use crate::aggregation::Aggregation;
use crate::types::{Tag, TagSet};
use crate::window::{Window, WindowState};

/// One live row: the projected tags plus the windowed aggregator
#[derive(Debug)]
struct CollectorEntry {
    tags: Vec<Tag>,
    window: WindowState,
}

/// Collects samples for one registered view
///
/// Maps tag signature to a [`WindowState`]; entries are created on the
/// first sample for a signature and live for the life of the view (the
/// window itself expires old sub-buckets).
#[derive(Debug)]
pub struct Collector {
    tag_keys: Vec<String>,
    aggregation: Aggregation,
    window: Window,
    entries: HashMap<String, CollectorEntry>,
}

impl Collector {
    /// Create an empty collector for a view definition
    pub fn new(view: &View) -> Self {
        Self {
            tag_keys: view.tag_keys().to_vec(),
            aggregation: view.aggregation().clone(),
            window: view.window().clone(),
            entries: HashMap::new(),
        }
    }

    /// Record one sample carried by `tags` at `now`
    pub fn add_sample(&mut self, tags: &TagSet, value: f64, now: Instant) {
        let signature = tags.signature(&self.tag_keys);
        let entry = self.entries.entry(signature).or_insert_with(|| {
            // A sliding-time ring anchors its bucket grid to this instant.
            CollectorEntry {
                tags: tags.project(&self.tag_keys),
                window: self.window.new_state(&self.aggregation, now),
            }
        });
        entry.window.add_sample(value, now);
    }

    /// Drop all rows
    pub fn clear_rows(&mut self) {
        self.entries.clear();
    }

    /// Snapshot every row whose window holds at least one sample
    pub fn collected_rows(&mut self, now: Instant) -> Vec<Row> {
        let mut rows = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values_mut() {
            if let Some(value) = entry.window.snapshot_at(now) {
                rows.push(Row {
                    tags: entry.tags.clone(),
                    value,
                });
            }
        }
        rows
    }
}
