//! Error types for the stats library

use thiserror::Error;

/// Main error type returned by worker commands
///
/// Every command either succeeds or reports exactly one of these kinds.
/// Recording is the exception: invalid record calls (unknown measure,
/// kind mismatch) are dropped silently and never surface an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A measure or view with the same name already exists
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// No measure or view is registered under the given name
    #[error("not found: {0}")]
    NotFound(String),

    /// The measure is referenced by at least one registered view
    #[error("measure '{0}' is in use by a registered view")]
    InUse(String),

    /// The view is still collecting (subscribed or force-collected)
    #[error("view '{0}' has subscribers or is being collected")]
    HasSubscribers(String),

    /// The view is not registered
    #[error("view '{0}' is not registered")]
    NotRegistered(String),

    /// The view is neither subscribed nor force-collected
    #[error("view '{0}' is not collecting; subscribe or force collection first")]
    NotCollecting(String),

    /// The same sink is already subscribed to the view
    #[error("sink is already subscribed to view '{0}'")]
    AlreadySubscribed(String),

    /// The sink is not subscribed to the view
    #[error("sink is not subscribed to view '{0}'")]
    NotSubscribed(String),

    /// The view definition is invalid (e.g. its measure is unregistered)
    #[error("invalid view '{0}': {1}")]
    BadView(String, String),

    /// The worker task has terminated and can no longer accept commands
    #[error("stats worker is gone")]
    WorkerGone,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
