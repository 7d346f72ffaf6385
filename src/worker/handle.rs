//! Cloneable client handle to a stats worker

use tokio::sync::{mpsc, oneshot};

use super::command::Command;
use super::StatsWorker;
use crate::config::StatsConfig;
use crate::error::{Error, Result};
use crate::types::{Measure, MeasureKind, MeasureValue, TagSet};
use crate::view::{Row, View, ViewData};

/// Handle to a running stats worker
///
/// Cheap to clone; every method enqueues a command on the worker's bounded
/// queue. Enqueueing blocks when the queue is full, which is the
/// backpressure boundary for producers. The worker stops once every handle
/// has been dropped.
#[derive(Debug, Clone)]
pub struct Stats {
    tx: mpsc::Sender<Command>,
}

impl Stats {
    /// Validate `config` and spawn a worker onto the current tokio runtime
    pub fn spawn(config: StatsConfig) -> std::result::Result<Stats, String> {
        config.validate()?;
        let (tx, rx) = mpsc::channel(config.command_queue_capacity);
        tokio::spawn(StatsWorker::new(config, rx).run());
        Ok(Stats { tx })
    }

    /// Enqueue a reply-bearing command and await its result
    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<Result<T>>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::WorkerGone)?;
        reply_rx.await.map_err(|_| Error::WorkerGone)?
    }

    /// Create a measure; fails with `DuplicateName` if the name exists
    pub async fn create_measure(
        &self,
        name: impl Into<String>,
        description: impl Into<String>,
        unit: impl Into<String>,
        kind: MeasureKind,
    ) -> Result<Measure> {
        let (name, description, unit) = (name.into(), description.into(), unit.into());
        self.call(|reply| Command::CreateMeasure {
            name,
            description,
            unit,
            kind,
            reply,
        })
        .await
    }

    /// Look up a measure by name
    pub async fn measure_by_name(&self, name: impl Into<String>) -> Result<Measure> {
        let name = name.into();
        self.call(|reply| Command::GetMeasureByName { name, reply })
            .await
    }

    /// Delete a measure; fails with `InUse` while a registered view uses it
    pub async fn delete_measure(&self, measure: &Measure) -> Result<()> {
        let name = measure.name().to_string();
        self.call(|reply| Command::DeleteMeasure { name, reply })
            .await
    }

    /// Register a detached view
    pub async fn register_view(&self, view: View) -> Result<()> {
        self.call(|reply| Command::RegisterView { view, reply })
            .await
    }

    /// Unregister an idle view
    pub async fn unregister_view(&self, view: &View) -> Result<()> {
        let name = view.name().to_string();
        self.call(|reply| Command::UnregisterView { name, reply })
            .await
    }

    /// Look up a registered view by name
    pub async fn view_by_name(&self, name: impl Into<String>) -> Result<View> {
        let name = name.into();
        self.call(|reply| Command::GetViewByName { name, reply })
            .await
    }

    /// Subscribe a sink to a view's periodic snapshots
    ///
    /// Delivery to the sink is non-blocking: snapshots the sink cannot
    /// accept immediately are dropped. The worker never closes the sink.
    pub async fn subscribe(&self, view: &View, sink: mpsc::Sender<ViewData>) -> Result<()> {
        let view_name = view.name().to_string();
        self.call(|reply| Command::Subscribe {
            view_name,
            sink,
            reply,
        })
        .await
    }

    /// Remove a previously subscribed sink
    pub async fn unsubscribe(&self, view: &View, sink: mpsc::Sender<ViewData>) -> Result<()> {
        let view_name = view.name().to_string();
        self.call(|reply| Command::Unsubscribe {
            view_name,
            sink,
            reply,
        })
        .await
    }

    /// Enable synchronous retrieval for a view without subscribing
    ///
    /// Idempotent.
    pub async fn force_collection(&self, view: &View) -> Result<()> {
        let view_name = view.name().to_string();
        self.call(|reply| Command::ForceCollection { view_name, reply })
            .await
    }

    /// Stop a forced collection started by [`force_collection`]
    ///
    /// [`force_collection`]: Stats::force_collection
    pub async fn stop_forced_collection(&self, view: &View) -> Result<()> {
        let view_name = view.name().to_string();
        self.call(|reply| Command::StopForcedCollection { view_name, reply })
            .await
    }

    /// Record an `i64` sample against an `Int64` measure
    ///
    /// Fire-and-forget: kind mismatches and unknown measures are dropped
    /// silently, recording never fails at the call site.
    pub async fn record_int64(&self, tags: &TagSet, measure: &Measure, value: i64) {
        self.record(measure, MeasureValue::Int64(value), tags).await;
    }

    /// Record an `f64` sample against a `Float64` measure
    ///
    /// Fire-and-forget, like [`record_int64`](Stats::record_int64).
    pub async fn record_float64(&self, tags: &TagSet, measure: &Measure, value: f64) {
        self.record(measure, MeasureValue::Float64(value), tags)
            .await;
    }

    async fn record(&self, measure: &Measure, value: MeasureValue, tags: &TagSet) {
        let command = Command::Record {
            measure_name: measure.name().to_string(),
            value,
            tags: tags.clone(),
        };
        // A dead worker drops the sample, consistent with the contract
        // that recording never surfaces a failure.
        let _ = self.tx.send(command).await;
    }

    /// Snapshot a collecting view inline
    ///
    /// Reflects every record enqueued before this call and none after it.
    /// Fails with `NotRegistered` for an unknown view and `NotCollecting`
    /// for a registered view that is neither subscribed nor force-collected.
    pub async fn retrieve_data(&self, view: &View) -> Result<Vec<Row>> {
        let view_name = view.name().to_string();
        self.call(|reply| Command::RetrieveData { view_name, reply })
            .await
    }

    /// Drop and reinitialize all registries (test hook)
    pub async fn restart(&self) -> Result<()> {
        self.call(|reply| Command::Restart { reply }).await
    }
}
