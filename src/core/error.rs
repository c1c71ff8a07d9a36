//! Error types for scheduler operations.

use thiserror::Error;

use crate::core::task::{TaskKey, TaskType};

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No handler registered for the task's type.
    #[error("no handler registered for {0}")]
    NoHandler(TaskType),
    /// Handler did not finish within the configured bound.
    #[error("handler for {0} timed out after {1}ms")]
    HandlerTimeout(TaskKey, u64),
    /// Handler returned an error.
    #[error("handler for {0} failed: {1}")]
    HandlerFailed(TaskKey, String),
    /// Components could not be assembled from the given configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
