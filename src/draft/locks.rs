//! Per-league async mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::util::LeagueId;

/// Lazily created async mutex per league.
///
/// The registry is a `parking_lot::Mutex` held only to look up or insert a
/// handle; the league lock itself is a `tokio::sync::Mutex` so it can be held
/// across store calls.
#[derive(Default)]
pub struct LeagueLocks {
    locks: Mutex<HashMap<LeagueId, Arc<tokio::sync::Mutex<()>>>>,
}

impl LeagueLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock handle for `league_id`, created on first use.
    pub fn handle(&self, league_id: LeagueId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(league_id)
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Forget the lock of a finished league. Holders of an existing handle
    /// keep a valid mutex.
    pub fn release(&self, league_id: LeagueId) {
        self.locks.lock().remove(&league_id);
    }

    /// Number of leagues with a live lock.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    /// Whether no league holds a lock entry.
    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
