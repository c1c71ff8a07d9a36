//! Time-based task scheduler.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::core::{
    AuditEvent, AuditSink, ScheduledTask, SchedulerError, TaskHandler, TaskHeap, TaskKey,
    TaskType,
};
use crate::util::clock::{Clock, SystemClock};

/// Longest the loop sleeps before re-reading the clock.
const MAX_IDLE: Duration = Duration::from_secs(60);

/// Abstraction for spawning task execution on a runtime.
pub trait Spawn {
    /// Spawn an async task that returns a future.
    fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Scheduler owning the task heap and the per-type handler table.
///
/// Uses a `parking_lot::Mutex` around the heap so registration from any
/// thread is cheap, and a `tokio::sync::Notify` so a newly registered
/// nearer-term task cuts the worker's current sleep short. Handlers run with
/// the heap unlocked. Cloning yields another handle to the same scheduler.
#[derive(Clone)]
pub struct Scheduler {
    heap: Arc<Mutex<TaskHeap>>,
    handlers: Arc<RwLock<HashMap<TaskType, Arc<dyn TaskHandler>>>>,
    wake: Arc<Notify>,
    shutdown: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    clock: Arc<dyn Clock>,
    handler_timeout: Duration,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Scheduler {
    /// Create a scheduler reading time from `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            heap: Arc::new(Mutex::new(TaskHeap::new())),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            wake: Arc::new(Notify::new()),
            shutdown: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            clock,
            handler_timeout: Duration::from_secs(30),
            audit: None,
        }
    }

    /// Bound on a single handler invocation.
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = timeout;
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Clock the scheduler fires against.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Install the handler for a task type, replacing any previous one.
    pub fn register_handler(&self, task_type: TaskType, handler: Arc<dyn TaskHandler>) {
        self.handlers.write().insert(task_type, handler);
        tracing::debug!(%task_type, "handler registered");
    }

    /// Schedule a task. A pending task with the same key is replaced and
    /// returned. Wakes the worker so a nearer deadline takes effect at once.
    pub fn register_task(&self, task: ScheduledTask) -> Option<ScheduledTask> {
        let key = task.key;
        let execute_at_ms = task.execute_at_ms;
        let replaced = self.heap.lock().push(task);
        self.wake.notify_one();

        tracing::debug!(%key, execute_at_ms, replaced = replaced.is_some(), "task registered");
        self.record(key, "register", Some(format!("execute_at_ms={execute_at_ms}")));
        replaced
    }

    /// Remove a pending task. Best-effort: a task already popped for
    /// dispatch still reaches its handler.
    pub fn deregister_task(&self, key: &TaskKey) -> Option<ScheduledTask> {
        let removed = self.heap.lock().remove(key);
        if removed.is_some() {
            tracing::debug!(%key, "task deregistered");
            self.record(*key, "deregister", None);
        }
        removed
    }

    /// Pending task for `key`.
    pub fn pending(&self, key: &TaskKey) -> Option<ScheduledTask> {
        self.heap.lock().get(key).cloned()
    }

    /// Snapshot of all pending tasks, earliest first.
    pub fn pending_tasks(&self) -> Vec<ScheduledTask> {
        self.heap.lock().pending()
    }

    /// Number of pending tasks.
    pub fn len(&self) -> usize {
        self.heap.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.lock().is_empty()
    }

    /// Fire time of the earliest pending task.
    pub fn next_fire_at(&self) -> Option<u128> {
        self.heap.lock().next_fire_at()
    }

    /// Pop and dispatch every task due now. Returns the number dispatched.
    pub async fn dispatch_due(&self) -> usize {
        let now = self.clock.now_ms();
        let due = self.heap.lock().pop_due(now);
        let count = due.len();
        for task in due {
            self.dispatch(task).await;
        }
        count
    }

    async fn dispatch(&self, task: ScheduledTask) {
        let key = task.key;
        let handler = self.handlers.read().get(&key.task_type).cloned();
        let Some(handler) = handler else {
            let err = SchedulerError::NoHandler(key.task_type);
            tracing::warn!(%key, "{err}");
            self.record(key, "no_handler", Some(err.to_string()));
            return;
        };

        tracing::debug!(%key, "dispatching task");
        match tokio::time::timeout(self.handler_timeout, handler.handle(&task)).await {
            Ok(Ok(())) => self.record(key, "dispatch", None),
            Ok(Err(e)) => {
                let err = SchedulerError::HandlerFailed(key, format!("{e:#}"));
                tracing::error!(%key, "{err}");
                self.record(key, "handler_failed", Some(err.to_string()));
            }
            Err(_) => {
                let millis = u64::try_from(self.handler_timeout.as_millis()).unwrap_or(u64::MAX);
                let err = SchedulerError::HandlerTimeout(key, millis);
                tracing::error!(%key, "{err}");
                self.record(key, "handler_failed", Some(err.to_string()));
            }
        }
    }

    /// Run the wait/dispatch loop until [`Scheduler::shutdown`] is called.
    pub async fn run(self) {
        tracing::info!("scheduler loop started");
        while !self.shutdown.load(Ordering::Acquire) {
            self.dispatch_due().await;
            if self.shutdown.load(Ordering::Acquire) {
                break;
            }

            let next = self.heap.lock().next_fire_at();
            match next {
                None => self.wake.notified().await,
                Some(at) => {
                    let wait_ms = at.saturating_sub(self.clock.now_ms());
                    let wait = Duration::from_millis(u64::try_from(wait_ms).unwrap_or(u64::MAX))
                        .min(MAX_IDLE);
                    tokio::select! {
                        () = self.wake.notified() => {}
                        () = tokio::time::sleep(wait) => {}
                    }
                }
            }
        }
        self.running.store(false, Ordering::Release);
        tracing::info!("scheduler loop stopped");
    }

    /// Spawn the loop on `spawner`. Returns `false` if it is already running.
    pub fn start<S: Spawn>(&self, spawner: &S) -> bool {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.shutdown.store(false, Ordering::Release);
        spawner.spawn(self.clone().run());
        true
    }

    /// Whether the loop is currently running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Signal the loop to stop after its current pass.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    fn record(&self, key: TaskKey, action: &str, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.record(
                AuditEvent::new(key.owner, key.to_string(), action, self.clock.now_ms())
                    .with_detail(detail),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AppResult, TaskPayload};
    use crate::util::clock::ManualClock;
    use async_trait::async_trait;

    struct Recorder(Mutex<Vec<TaskKey>>);

    #[async_trait]
    impl TaskHandler for Recorder {
        async fn handle(&self, task: &ScheduledTask) -> AppResult<()> {
            self.0.lock().push(task.key);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl TaskHandler for Failing {
        async fn handle(&self, _task: &ScheduledTask) -> AppResult<()> {
            anyhow::bail!("boom")
        }
    }

    fn accrual(league_id: i64, at: u128) -> ScheduledTask {
        ScheduledTask::new(at, TaskPayload::CreditAccrual { league_id })
    }

    #[tokio::test]
    async fn test_dispatch_due_respects_clock() {
        let clock = Arc::new(ManualClock::new(1_000));
        let scheduler = Scheduler::new(clock.clone());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        scheduler.register_handler(TaskType::CreditAccrual, recorder.clone());

        scheduler.register_task(accrual(1, 1_500));
        scheduler.register_task(accrual(2, 1_100));

        assert_eq!(scheduler.dispatch_due().await, 0);
        clock.advance_ms(200);
        assert_eq!(scheduler.dispatch_due().await, 1);
        clock.advance_ms(1_000);
        assert_eq!(scheduler.dispatch_due().await, 1);

        let fired: Vec<i64> = recorder.0.lock().iter().map(|k| k.owner).collect();
        assert_eq!(fired, vec![2, 1]);
        assert!(scheduler.is_empty());
    }

    #[tokio::test]
    async fn test_handler_failure_does_not_stop_dispatch() {
        let clock = Arc::new(ManualClock::new(0));
        let audit = Arc::new(crate::core::InMemoryAuditSink::new(16));
        let scheduler = Scheduler::new(clock).with_audit(audit.clone());
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        scheduler.register_handler(TaskType::TransferWindowEnd, Arc::new(Failing));
        scheduler.register_handler(TaskType::CreditAccrual, recorder.clone());

        scheduler.register_task(ScheduledTask::new(
            0,
            TaskPayload::TransferWindowEnd { league_id: 5 },
        ));
        scheduler.register_task(accrual(5, 0));

        assert_eq!(scheduler.dispatch_due().await, 2);
        assert_eq!(recorder.0.lock().len(), 1);
        let actions = audit.actions_for(5);
        assert!(actions.contains(&"handler_failed".to_string()));
        assert!(actions.contains(&"dispatch".to_string()));
    }

    #[tokio::test]
    async fn test_missing_handler_is_recorded() {
        let audit = Arc::new(crate::core::InMemoryAuditSink::new(16));
        let scheduler = Scheduler::new(Arc::new(ManualClock::new(0))).with_audit(audit.clone());
        scheduler.register_task(accrual(8, 0));

        assert_eq!(scheduler.dispatch_due().await, 1);
        assert_eq!(audit.actions_for(8), vec!["register", "no_handler"]);
    }
}
