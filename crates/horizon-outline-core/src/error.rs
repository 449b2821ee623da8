//! Error types for Horizon Outline core systems.

use std::time::Duration;

/// The main error type for core operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The UI queue has no receiver left to drain posted work.
    #[error("UI queue is closed")]
    QueueClosed,

    /// A background task did not finish within its deadline.
    #[error("background task timed out after {0:?}")]
    Timeout(Duration),

    /// The background runtime could not be created.
    #[error("failed to create background runtime: {0}")]
    RuntimeCreation(String),

    /// A background task panicked or was aborted.
    #[error("background task failed: {0}")]
    TaskFailed(String),

    /// Signal-related error.
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
}

impl CoreError {
    /// Create a runtime creation error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::RuntimeCreation(message.into())
    }

    /// Create a task failure error.
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed(message.into())
    }

    /// Returns true if this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Signal-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalError {
    /// The connection ID is invalid or has already been disconnected.
    #[error("invalid or disconnected connection ID")]
    InvalidConnection,
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
