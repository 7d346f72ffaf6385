//! The stats worker: single serialization point for all state changes
//!
//! One spawned task owns the registries, every view's collector, and the
//! reporting schedule. Public operations convert to [`Command`] messages on
//! a bounded queue; the worker applies them one at a time in arrival order,
//! which makes each command atomic with respect to every other command
//! without any fine-grained locking.
//!
//! # Architecture
//!
//! ```text
//! [Stats handle] ──commands──▶ [bounded queue] ──▶ [worker loop]
//!                                                    │        │
//!                                               registries  interval tick
//!                                                    │        │
//!                                              [collectors] [snapshot fan-out]
//!                                                             │ try_send
//!                                                             ▼
//!                                                      subscriber sinks
//! ```
//!
//! Suspension points are exactly: command dequeue, the periodic reporting
//! tick, and (never-blocking) sink delivery. Slow sinks lose snapshots
//! instead of stalling the loop.
//!
//! # Example
//!
//! ```rust,no_run
//! use viewstats::aggregation::Aggregation;
//! use viewstats::config::StatsConfig;
//! use viewstats::types::{MeasureKind, TagSet};
//! use viewstats::view::View;
//! use viewstats::window::Window;
//! use viewstats::worker::Stats;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let stats = Stats::spawn(StatsConfig::default())?;
//!
//! let measure = stats
//!     .create_measure("latency", "request latency", "ms", MeasureKind::Float64)
//!     .await?;
//! let view = View::new(
//!     "latency_by_method",
//!     "latency per method",
//!     vec!["method".to_string()],
//!     measure.clone(),
//!     Aggregation::count(),
//!     Window::cumulative(),
//! );
//! stats.register_view(view.clone()).await?;
//! stats.force_collection(&view).await?;
//!
//! let tags = TagSet::from_pairs([("method", "GET")]);
//! stats.record_float64(&tags, &measure, 12.5).await;
//!
//! let rows = stats.retrieve_data(&view).await?;
//! assert_eq!(rows.len(), 1);
//! # Ok(())
//! # }
//! ```

mod command;
mod handle;

pub use handle::Stats;

use std::time::{Instant, SystemTime};

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::StatsConfig;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::view::{Row, ViewData};

use command::Command;

/// The worker task: owns all mutable registry and view state
pub(crate) struct StatsWorker {
    config: StatsConfig,
    registry: Registry,
    rx: mpsc::Receiver<Command>,
}

impl StatsWorker {
    pub(crate) fn new(config: StatsConfig, rx: mpsc::Receiver<Command>) -> Self {
        Self {
            config,
            registry: Registry::new(),
            rx,
        }
    }

    /// Main loop: commands in arrival order, interleaved with report ticks
    ///
    /// Exits when the last [`Stats`] handle is dropped.
    pub(crate) async fn run(mut self) {
        let period = self.config.reporting_interval;
        let mut reporting = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        reporting.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            reporting_interval = ?period,
            queue_capacity = self.config.command_queue_capacity,
            "stats worker started"
        );

        loop {
            tokio::select! {
                command = self.rx.recv() => {
                    match command {
                        Some(command) => self.handle_command(command),
                        None => break,
                    }
                }
                _ = reporting.tick() => self.report(),
            }
        }

        info!("stats worker stopped");
    }

    /// Apply one command; replies to abandoned callers are discarded
    fn handle_command(&mut self, command: Command) {
        match command {
            Command::CreateMeasure {
                name,
                description,
                unit,
                kind,
                reply,
            } => {
                let result = self
                    .registry
                    .create_measure(&name, &description, &unit, kind);
                let _ = reply.send(result);
            }
            Command::GetMeasureByName { name, reply } => {
                let _ = reply.send(self.registry.measure_by_name(&name));
            }
            Command::DeleteMeasure { name, reply } => {
                let _ = reply.send(self.registry.delete_measure(&name));
            }
            Command::RegisterView { view, reply } => {
                let _ = reply.send(self.registry.register_view(view));
            }
            Command::UnregisterView { name, reply } => {
                let _ = reply.send(self.registry.unregister_view(&name));
            }
            Command::GetViewByName { name, reply } => {
                let _ = reply.send(self.registry.view_by_name(&name));
            }
            Command::Subscribe {
                view_name,
                sink,
                reply,
            } => {
                let _ = reply.send(self.subscribe(&view_name, sink));
            }
            Command::Unsubscribe {
                view_name,
                sink,
                reply,
            } => {
                let _ = reply.send(self.unsubscribe(&view_name, &sink));
            }
            Command::ForceCollection { view_name, reply } => {
                let _ = reply.send(self.force_collection(&view_name, true));
            }
            Command::StopForcedCollection { view_name, reply } => {
                // Clearing the flag on an unknown view is a no-op, not an error.
                let _ = self.force_collection(&view_name, false);
                let _ = reply.send(Ok(()));
            }
            Command::Record {
                measure_name,
                value,
                tags,
            } => {
                let dispatched = self.registry.record(
                    &measure_name,
                    value.kind(),
                    value.as_f64(),
                    &tags,
                    Instant::now(),
                );
                if !dispatched {
                    debug!(measure = %measure_name, kind = %value.kind(), "dropping sample for unknown or mismatched measure");
                }
            }
            Command::RetrieveData { view_name, reply } => {
                let _ = reply.send(self.retrieve_data(&view_name));
            }
            Command::Restart { reply } => {
                self.registry = Registry::new();
                info!("stats worker restarted, registries reinitialized");
                let _ = reply.send(Ok(()));
            }
        }
    }

    fn subscribe(&mut self, view_name: &str, sink: mpsc::Sender<ViewData>) -> Result<()> {
        let instance = self
            .registry
            .view_mut(view_name)
            .ok_or_else(|| Error::NotRegistered(view_name.to_string()))?;
        if instance.subscribers.iter().any(|s| s.same_channel(&sink)) {
            return Err(Error::AlreadySubscribed(view_name.to_string()));
        }
        instance.subscribers.push(sink);
        Ok(())
    }

    fn unsubscribe(&mut self, view_name: &str, sink: &mpsc::Sender<ViewData>) -> Result<()> {
        let not_subscribed = || Error::NotSubscribed(view_name.to_string());
        let instance = self.registry.view_mut(view_name).ok_or_else(not_subscribed)?;
        let position = instance
            .subscribers
            .iter()
            .position(|s| s.same_channel(sink))
            .ok_or_else(not_subscribed)?;
        instance.subscribers.remove(position);
        Ok(())
    }

    fn force_collection(&mut self, view_name: &str, enabled: bool) -> Result<()> {
        let instance = self
            .registry
            .view_mut(view_name)
            .ok_or_else(|| Error::NotRegistered(view_name.to_string()))?;
        instance.force_collected = enabled;
        Ok(())
    }

    fn retrieve_data(&mut self, view_name: &str) -> Result<Vec<Row>> {
        let instance = self
            .registry
            .view_mut(view_name)
            .ok_or_else(|| Error::NotRegistered(view_name.to_string()))?;
        if !instance.is_collecting() {
            return Err(Error::NotCollecting(view_name.to_string()));
        }
        Ok(instance.collector.collected_rows(Instant::now()))
    }

    /// Push a snapshot of every subscribed view to its sinks
    ///
    /// Delivery is `try_send`: a sink with no free buffer space loses this
    /// snapshot (drop-newest) and the worker moves on.
    fn report(&mut self) {
        let now = Instant::now();
        let collected_at = SystemTime::now();

        for instance in self.registry.views_mut() {
            if instance.subscribers.is_empty() {
                continue;
            }

            let data = ViewData {
                view_name: instance.view.name().to_string(),
                rows: instance.collector.collected_rows(now),
                collected_at,
            };

            for sink in &instance.subscribers {
                if let Err(err) = sink.try_send(data.clone()) {
                    debug!(view = %data.view_name, error = %err, "dropping snapshot for slow subscriber");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::Aggregation;
    use crate::types::{MeasureKind, TagSet};
    use crate::view::View;
    use crate::window::Window;
    use std::time::Duration;

    fn fast_config() -> StatsConfig {
        StatsConfig::builder()
            .reporting_interval(Duration::from_millis(20))
            .build()
            .unwrap()
    }

    async fn collecting_view(stats: &Stats, measure_name: &str, view_name: &str) -> View {
        let measure = stats
            .create_measure(measure_name, "desc", "unit", MeasureKind::Float64)
            .await
            .unwrap();
        let view = View::new(
            view_name,
            "desc",
            vec!["k1".to_string()],
            measure,
            Aggregation::count(),
            Window::cumulative(),
        );
        stats.register_view(view.clone()).await.unwrap();
        view
    }

    #[tokio::test]
    async fn test_reporting_pushes_to_subscribers() {
        let stats = Stats::spawn(fast_config()).unwrap();
        let view = collecting_view(&stats, "m", "v").await;
        let measure = stats.measure_by_name("m").await.unwrap();

        let (sink, mut sink_rx) = mpsc::channel(16);
        stats.subscribe(&view, sink).await.unwrap();

        let tags = TagSet::from_pairs([("k1", "v1")]);
        stats.record_float64(&tags, &measure, 1.0).await;
        stats.record_float64(&tags, &measure, 1.0).await;

        // A tick may fire between subscribe and the records; skip any
        // empty snapshot delivered in that window.
        let data = loop {
            let data = sink_rx.recv().await.expect("snapshot delivered");
            if !data.rows.is_empty() {
                break data;
            }
        };
        assert_eq!(data.view_name, "v");
        assert_eq!(data.rows.len(), 1);
        assert_eq!(data.rows[0].value.count(), 2);
    }

    #[tokio::test]
    async fn test_slow_sink_drops_snapshots_without_stalling() {
        let stats = Stats::spawn(fast_config()).unwrap();
        let view = collecting_view(&stats, "m", "v").await;
        let measure = stats.measure_by_name("m").await.unwrap();

        // Capacity 1 and never drained: every tick past the first drops.
        let (sink, mut sink_rx) = mpsc::channel(1);
        stats.subscribe(&view, sink).await.unwrap();

        tokio::time::sleep(Duration::from_millis(120)).await;

        // The worker is still responsive despite the saturated sink.
        let tags = TagSet::from_pairs([("k1", "v1")]);
        stats.record_float64(&tags, &measure, 1.0).await;
        stats.force_collection(&view).await.unwrap();
        let rows = stats.retrieve_data(&view).await.unwrap();
        assert_eq!(rows[0].value.count(), 1);

        // Exactly one snapshot is buffered; the rest were dropped newest-first.
        assert!(sink_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_subscribe_lifecycle_errors() {
        let stats = Stats::spawn(StatsConfig::default()).unwrap();
        let view = collecting_view(&stats, "m", "v").await;

        let (sink, _sink_rx) = mpsc::channel(4);
        stats.subscribe(&view, sink.clone()).await.unwrap();
        assert_eq!(
            stats.subscribe(&view, sink.clone()).await,
            Err(Error::AlreadySubscribed("v".to_string()))
        );

        // A second, distinct sink on the same view is fine.
        let (other_sink, _other_rx) = mpsc::channel(4);
        stats.subscribe(&view, other_sink).await.unwrap();

        stats.unsubscribe(&view, sink.clone()).await.unwrap();
        assert_eq!(
            stats.unsubscribe(&view, sink).await,
            Err(Error::NotSubscribed("v".to_string()))
        );
    }

    #[tokio::test]
    async fn test_restart_reinitializes_registries() {
        let stats = Stats::spawn(StatsConfig::default()).unwrap();
        collecting_view(&stats, "m", "v").await;

        stats.restart().await.unwrap();

        assert_eq!(
            stats.measure_by_name("m").await,
            Err(Error::NotFound("m".to_string()))
        );
        assert_eq!(
            stats.view_by_name("v").await,
            Err(Error::NotFound("v".to_string()))
        );
        // The name is free again after the restart.
        assert!(stats
            .create_measure("m", "desc", "unit", MeasureKind::Int64)
            .await
            .is_ok());
    }
}
