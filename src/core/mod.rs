//! Core scheduling abstractions: task model, task heap and the scheduler loop.

pub mod audit;
pub mod error;
pub mod handler;
pub mod scheduler;
pub mod task;
pub mod task_heap;

pub use audit::{AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AppResult, SchedulerError};
pub use handler::TaskHandler;
pub use scheduler::{Scheduler, Spawn};
pub use task::{ScheduledTask, TaskKey, TaskPayload, TaskType};
pub use task_heap::TaskHeap;
