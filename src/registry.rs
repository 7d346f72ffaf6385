//! Registries owned by the worker
//!
//! Named catalogs of measures and registered views, plus the
//! measure-to-views reverse index the record hot path walks. Every access
//! happens from the worker loop, so no interior locking is needed.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::types::{Measure, MeasureKind, TagSet};
use crate::view::{Collector, View, ViewData};

/// A registered view plus its live collection state
#[derive(Debug)]
pub(crate) struct ViewInstance {
    pub(crate) view: View,
    pub(crate) collector: Collector,
    pub(crate) subscribers: Vec<mpsc::Sender<ViewData>>,
    pub(crate) force_collected: bool,
}

impl ViewInstance {
    fn new(view: View) -> Self {
        let collector = Collector::new(&view);
        Self {
            view,
            collector,
            subscribers: Vec::new(),
            force_collected: false,
        }
    }

    /// A view is collecting while subscribed or force-collected
    pub(crate) fn is_collecting(&self) -> bool {
        self.force_collected || !self.subscribers.is_empty()
    }
}

/// Catalogs of measures and views
#[derive(Debug, Default)]
pub(crate) struct Registry {
    measures: HashMap<String, Measure>,
    views: HashMap<String, ViewInstance>,
    /// measure name -> names of registered views over it
    measure_views: HashMap<String, HashSet<String>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Create and register a measure
    ///
    /// Names are unique across both kinds: an `Int64` measure blocks a
    /// later `Float64` measure of the same name and vice versa.
    pub(crate) fn create_measure(
        &mut self,
        name: &str,
        description: &str,
        unit: &str,
        kind: MeasureKind,
    ) -> Result<Measure> {
        if self.measures.contains_key(name) {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let measure = Measure::new(name, description, unit, kind);
        self.measures.insert(name.to_string(), measure.clone());
        Ok(measure)
    }

    pub(crate) fn measure_by_name(&self, name: &str) -> Result<Measure> {
        self.measures
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Remove a measure; fails while any registered view references it
    pub(crate) fn delete_measure(&mut self, name: &str) -> Result<()> {
        if !self.measures.contains_key(name) {
            return Err(Error::NotFound(name.to_string()));
        }
        if self
            .measure_views
            .get(name)
            .is_some_and(|views| !views.is_empty())
        {
            return Err(Error::InUse(name.to_string()));
        }
        self.measures.remove(name);
        self.measure_views.remove(name);
        Ok(())
    }

    /// Register a detached view, creating its collector
    pub(crate) fn register_view(&mut self, view: View) -> Result<()> {
        if self.views.contains_key(view.name()) {
            return Err(Error::DuplicateName(view.name().to_string()));
        }
        let measure_name = view.measure().name();
        if !self.measures.contains_key(measure_name) {
            return Err(Error::BadView(
                view.name().to_string(),
                format!("measure '{}' is not registered", measure_name),
            ));
        }

        self.measure_views
            .entry(measure_name.to_string())
            .or_default()
            .insert(view.name().to_string());
        self.views
            .insert(view.name().to_string(), ViewInstance::new(view));
        Ok(())
    }

    /// Unregister an idle view; fails while it is still collecting
    pub(crate) fn unregister_view(&mut self, name: &str) -> Result<()> {
        let instance = self
            .views
            .get(name)
            .ok_or_else(|| Error::NotRegistered(name.to_string()))?;
        if instance.is_collecting() {
            return Err(Error::HasSubscribers(name.to_string()));
        }

        let measure_name = instance.view.measure().name().to_string();
        self.views.remove(name);
        if let Some(views) = self.measure_views.get_mut(&measure_name) {
            views.remove(name);
        }
        Ok(())
    }

    pub(crate) fn view_by_name(&self, name: &str) -> Result<View> {
        self.views
            .get(name)
            .map(|instance| instance.view.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    pub(crate) fn view_mut(&mut self, name: &str) -> Option<&mut ViewInstance> {
        self.views.get_mut(name)
    }

    /// Iterate all registered views mutably (reporting fan-out)
    pub(crate) fn views_mut(&mut self) -> impl Iterator<Item = &mut ViewInstance> {
        self.views.values_mut()
    }

    /// Dispatch one sample to every view over `measure_name`
    ///
    /// Unknown measures and kind mismatches are dropped silently per the
    /// recording contract; the caller traces them.
    ///
    /// Returns whether the sample was dispatched.
    pub(crate) fn record(
        &mut self,
        measure_name: &str,
        kind: MeasureKind,
        value: f64,
        tags: &TagSet,
        now: Instant,
    ) -> bool {
        let Some(measure) = self.measures.get(measure_name) else {
            return false;
        };
        if measure.kind() != kind {
            return false;
        }

        if let Some(view_names) = self.measure_views.get(measure_name) {
            for view_name in view_names {
                if let Some(instance) = self.views.get_mut(view_name) {
                    instance.collector.add_sample(tags, value, now);
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregation;
    use crate::window::Window;

    fn registry_with_measure(name: &str, kind: MeasureKind) -> Registry {
        let mut registry = Registry::new();
        registry.create_measure(name, "desc", "unit", kind).unwrap();
        registry
    }

    fn view_over(name: &str, measure: Measure) -> View {
        View::new(
            name,
            "desc",
            vec![],
            measure,
            Aggregation::count(),
            Window::cumulative(),
        )
    }

    #[test]
    fn test_measure_names_unique_across_kinds() {
        let mut registry = registry_with_measure("m", MeasureKind::Float64);
        assert_eq!(
            registry.create_measure("m", "again", "unit", MeasureKind::Int64),
            Err(Error::DuplicateName("m".to_string()))
        );
        assert!(registry
            .create_measure("m2", "other", "unit", MeasureKind::Int64)
            .is_ok());
    }

    #[test]
    fn test_measure_lookup() {
        let registry = registry_with_measure("m", MeasureKind::Int64);
        assert_eq!(registry.measure_by_name("m").unwrap().name(), "m");
        assert_eq!(
            registry.measure_by_name("other"),
            Err(Error::NotFound("other".to_string()))
        );
    }

    #[test]
    fn test_delete_measure_in_use() {
        let mut registry = registry_with_measure("m", MeasureKind::Int64);
        let measure = registry.measure_by_name("m").unwrap();
        registry.register_view(view_over("v", measure)).unwrap();

        assert_eq!(
            registry.delete_measure("m"),
            Err(Error::InUse("m".to_string()))
        );

        registry.unregister_view("v").unwrap();
        assert!(registry.delete_measure("m").is_ok());
        assert!(registry.measure_by_name("m").is_err());
    }

    #[test]
    fn test_register_view_duplicate_name() {
        let mut registry = registry_with_measure("m", MeasureKind::Int64);
        let measure = registry.measure_by_name("m").unwrap();

        registry
            .register_view(view_over("v", measure.clone()))
            .unwrap();
        assert_eq!(
            registry.register_view(view_over("v", measure)),
            Err(Error::DuplicateName("v".to_string()))
        );
    }

    #[test]
    fn test_register_view_unknown_measure_is_bad_view() {
        let mut registry = Registry::new();
        let unregistered = Measure::new("ghost", "never registered", "unit", MeasureKind::Int64);
        assert!(matches!(
            registry.register_view(view_over("v", unregistered)),
            Err(Error::BadView(_, _))
        ));
    }

    #[test]
    fn test_unregister_unknown_view() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.unregister_view("v"),
            Err(Error::NotRegistered("v".to_string()))
        );
    }

    #[test]
    fn test_record_kind_mismatch_dropped() {
        let mut registry = registry_with_measure("m", MeasureKind::Float64);
        let measure = registry.measure_by_name("m").unwrap();
        registry.register_view(view_over("v", measure)).unwrap();

        let tags = TagSet::new();
        let now = Instant::now();
        assert!(!registry.record("m", MeasureKind::Int64, 1.0, &tags, now));
        assert!(!registry.record("ghost", MeasureKind::Float64, 1.0, &tags, now));
        assert!(registry.record("m", MeasureKind::Float64, 1.0, &tags, now));

        let instance = registry.view_mut("v").unwrap();
        let rows = instance.collector.collected_rows(now);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].value.count(), 1);
    }
}
