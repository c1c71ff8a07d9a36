//! Audit trail for scheduler and draft actions.
//!
//! Scheduler, engine and season service each record one event per
//! state-changing action, stamped with their injected clock. The in-memory
//! sink keeps a bounded ring for tests and dev; the relational layout lives
//! in [`crate::infra::store::postgres`].

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::LeagueId;

/// One recorded action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// UUID v4.
    pub event_id: String,
    /// League the event concerns.
    pub league_id: LeagueId,
    /// What was acted on: a task key, `draft` or `season`.
    pub subject: String,
    /// Action taken (register, dispatch, pick, skip, auto_skip, ...).
    pub action: String,
    /// Clock time of the action in milliseconds.
    pub at_ms: u128,
    /// Free-form context such as the acting player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEvent {
    /// New event with a fresh id.
    pub fn new(
        league_id: LeagueId,
        subject: impl Into<String>,
        action: impl Into<String>,
        at_ms: u128,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            league_id,
            subject: subject.into(),
            action: action.into(),
            at_ms,
            detail: None,
        }
    }

    /// Attach context.
    #[must_use]
    pub fn with_detail(mut self, detail: Option<String>) -> Self {
        self.detail = detail;
        self
    }
}

/// Destination for audit events. Recording must not fail the caller.
pub trait AuditSink: Send + Sync {
    /// Record an audit event.
    fn record(&self, event: AuditEvent);
}

/// Bounded in-memory sink; the oldest event is dropped when full.
pub struct InMemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    capacity: usize,
}

impl InMemoryAuditSink {
    /// Sink holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    /// Snapshot of every stored event, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }

    /// Events recorded for one league, oldest first.
    pub fn for_league(&self, league_id: LeagueId) -> Vec<AuditEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.league_id == league_id)
            .cloned()
            .collect()
    }

    /// Action names recorded for one league, oldest first.
    pub fn actions_for(&self, league_id: LeagueId) -> Vec<String> {
        self.for_league(league_id)
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    /// Number of stored events.
    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    /// Whether nothing has been recorded (or everything was evicted).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        if self.capacity == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }
}
