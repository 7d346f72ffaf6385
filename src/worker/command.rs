//! Worker command messages
//!
//! Every public operation converts to one of these messages on the bounded
//! command queue. Reply-bearing commands carry a oneshot sender; a caller
//! that abandons its receiver simply loses the reply, the worker is not
//! affected.

use tokio::sync::{mpsc, oneshot};

use crate::error::Result;
use crate::types::{Measure, MeasureKind, MeasureValue, TagSet};
use crate::view::{Row, View, ViewData};

/// Reply channel for a command returning `T`
pub(crate) type Reply<T> = oneshot::Sender<Result<T>>;

/// A single worker command, applied atomically in arrival order
#[derive(Debug)]
pub(crate) enum Command {
    CreateMeasure {
        name: String,
        description: String,
        unit: String,
        kind: MeasureKind,
        reply: Reply<Measure>,
    },
    GetMeasureByName {
        name: String,
        reply: Reply<Measure>,
    },
    DeleteMeasure {
        name: String,
        reply: Reply<()>,
    },
    RegisterView {
        view: View,
        reply: Reply<()>,
    },
    UnregisterView {
        name: String,
        reply: Reply<()>,
    },
    GetViewByName {
        name: String,
        reply: Reply<View>,
    },
    Subscribe {
        view_name: String,
        sink: mpsc::Sender<ViewData>,
        reply: Reply<()>,
    },
    Unsubscribe {
        view_name: String,
        sink: mpsc::Sender<ViewData>,
        reply: Reply<()>,
    },
    ForceCollection {
        view_name: String,
        reply: Reply<()>,
    },
    StopForcedCollection {
        view_name: String,
        reply: Reply<()>,
    },
    /// Fire-and-forget sample recording; never replies, never fails
    Record {
        measure_name: String,
        value: MeasureValue,
        tags: TagSet,
    },
    RetrieveData {
        view_name: String,
        reply: Reply<Vec<Row>>,
    },
    /// Test hook: drop and reinitialize all registries
    Restart {
        reply: Reply<()>,
    },
}
