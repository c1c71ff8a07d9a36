//! Scheduler handler that turns an expired turn into an automatic skip.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::core::{AppResult, ScheduledTask, TaskHandler, TaskPayload};
use crate::draft::engine::DraftEngine;
use crate::draft::model::SkipOutcome;

/// Handler for `DraftTurnTimeout` tasks.
///
/// Holds the engine weakly: the engine owns the scheduler handle, so a strong
/// reference here would keep both alive forever.
pub struct TurnTimeoutHandler {
    engine: Weak<DraftEngine>,
}

impl TurnTimeoutHandler {
    /// Handler bound to `engine`.
    pub fn new(engine: &Arc<DraftEngine>) -> Self {
        Self {
            engine: Arc::downgrade(engine),
        }
    }
}

#[async_trait]
impl TaskHandler for TurnTimeoutHandler {
    async fn handle(&self, task: &ScheduledTask) -> AppResult<()> {
        let TaskPayload::DraftTurnTimeout {
            league_id,
            player_id,
            pick_number,
        } = task.payload
        else {
            anyhow::bail!("{} is not a turn timeout", task.key);
        };
        let Some(engine) = self.engine.upgrade() else {
            tracing::warn!(league_id, "draft engine dropped; timeout ignored");
            return Ok(());
        };

        match engine.auto_skip_turn(league_id, Some(pick_number)).await? {
            SkipOutcome::Skipped { draft, .. } => {
                tracing::debug!(
                    league_id,
                    player_id,
                    pick_number,
                    next_pick = draft.current_pick_on_clock,
                    "timeout applied"
                );
            }
            SkipOutcome::Stale => {
                tracing::debug!(league_id, pick_number, "timeout was stale");
            }
        }
        Ok(())
    }
}
