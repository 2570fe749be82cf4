//! Error types for pool submission and task execution.
//!
//! Terminal pipeline operations return [`anyhow::Result`]; the pool surfaces
//! the typed [`PoolError`] so callers can match on the failure kind. Because
//! `PoolError` implements `std::error::Error`, it converts into
//! `anyhow::Error` with `?`.

use std::time::Duration;
use thiserror::Error;

/// Result type alias for task pool operations.
pub type PoolResult<T> = std::result::Result<T, PoolError>;

/// Failure kinds reported by [`TaskPool`](crate::pool::TaskPool) and
/// [`TaskHandle`](crate::pool::TaskHandle).
#[derive(Error, Debug)]
pub enum PoolError {
    /// Work was submitted after `shutdown` was requested.
    #[error("task pool stopped: submission rejected")]
    Stopped,

    /// The task unwound while running on a worker.
    #[error("task panicked: {0}")]
    TaskPanicked(String),

    /// A fallible task returned an error.
    #[error("task failed: {0}")]
    TaskFailed(#[source] anyhow::Error),

    /// `wait_timeout` elapsed before the task finished.
    #[error("task did not finish within {0:?}")]
    Timeout(Duration),

    /// The task was dropped without reporting (e.g. routed to an error handler).
    #[error("task finished without producing a result")]
    Disconnected,
}

impl PoolError {
    /// Turn a `catch_unwind` payload into a readable error.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let msg = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        PoolError::TaskPanicked(msg)
    }
}
