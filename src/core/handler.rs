//! Task handler trait.

use async_trait::async_trait;

use super::{AppResult, ScheduledTask};

/// Business logic run when a task of a given type fires.
///
/// Handlers are invoked from the scheduler's dispatch loop, outside the heap
/// lock. A handler may be called for a task whose owner has already moved on
/// (a deregistration can race the dispatch), so implementations re-validate
/// the owner's state and return `Ok(())` when the task is stale.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use pokedraft_core::core::{AppResult, ScheduledTask, TaskHandler};
///
/// struct LogHandler;
///
/// #[async_trait]
/// impl TaskHandler for LogHandler {
///     async fn handle(&self, task: &ScheduledTask) -> AppResult<()> {
///         tracing::info!(key = %task.key, "fired");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// Act on a fired task.
    ///
    /// Errors are logged and audited by the scheduler; they are not retried.
    /// The owning subsystem re-registers on its next transition.
    async fn handle(&self, task: &ScheduledTask) -> AppResult<()>;
}
