//! Error types for the work queue

use std::any::Any;
use thiserror::Error;

/// Errors raised while building or driving a [`WorkQueue`](super::WorkQueue)
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Failed to spawn worker thread {index}")]
    SpawnFailed {
        index: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("Work queue has been shut down")]
    ShutDown,
}

/// Outcome of a single task that did not produce a value
///
/// A task failure is confined to the task's own result slot; the worker that
/// ran it keeps serving the queue.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task panicked: {0}")]
    Panicked(String),

    #[error("Task was cancelled before it started")]
    Cancelled,
}

impl TaskError {
    /// Build a `Panicked` error from a `catch_unwind` payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic payload".to_string()
        };
        TaskError::Panicked(message)
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            TaskError::Panicked(_) => "panicked",
            TaskError::Cancelled => "cancelled",
        }
    }
}
