//! Relational layout for drafts, allocations and audit events.
//!
//! Only the schema and the row mapping live here; the crate does not ship a
//! database client.

use serde::{Deserialize, Serialize};

use super::StoreError;
use crate::draft::model::{AccumulatedPicks, Draft, DraftStatus};
use crate::util::LeagueId;

/// Migration statements for draft storage.
pub fn migrations() -> &'static [&'static str] {
    &[
        r"
CREATE TABLE IF NOT EXISTS drafts (
    league_id BIGINT PRIMARY KEY,
    status TEXT NOT NULL,
    current_round INTEGER NOT NULL,
    current_pick_in_round INTEGER NOT NULL,
    current_pick_on_clock INTEGER NOT NULL CHECK (current_pick_on_clock >= 1),
    current_turn_player_id BIGINT,
    current_turn_start_ms BIGINT NOT NULL,
    turn_time_limit_minutes INTEGER NOT NULL,
    players_with_accumulated_picks JSONB NOT NULL DEFAULT '{}'::jsonb,
    started_at_ms BIGINT NOT NULL,
    completed_at_ms BIGINT
);
CREATE INDEX IF NOT EXISTS idx_drafts_status ON drafts (status);
",
        r"
CREATE TABLE IF NOT EXISTS draft_allocations (
    id BIGSERIAL PRIMARY KEY,
    league_id BIGINT NOT NULL REFERENCES drafts (league_id),
    player_id BIGINT NOT NULL,
    pool_entry_id BIGINT NOT NULL,
    pick_number INTEGER NOT NULL,
    cost INTEGER NOT NULL,
    drafted_at_ms BIGINT NOT NULL,
    UNIQUE (league_id, pick_number),
    UNIQUE (league_id, pool_entry_id)
);
CREATE INDEX IF NOT EXISTS idx_draft_allocations_player ON draft_allocations (league_id, player_id);
",
        r"
CREATE TABLE IF NOT EXISTS draft_audit_events (
    event_id UUID PRIMARY KEY,
    league_id BIGINT NOT NULL,
    subject TEXT NOT NULL,
    action TEXT NOT NULL,
    detail TEXT,
    at_ms BIGINT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_draft_audit_league ON draft_audit_events (league_id, at_ms);
",
    ]
}

/// A `drafts` row as the database stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRow {
    /// Primary key.
    pub league_id: LeagueId,
    /// `pending`, `ongoing`, `paused` or `completed`.
    pub status: String,
    /// Round on the clock.
    pub current_round: i32,
    /// Position in round.
    pub current_pick_in_round: i32,
    /// Global pick counter.
    pub current_pick_on_clock: i32,
    /// Player on the clock.
    pub current_turn_player_id: Option<i64>,
    /// Turn start, epoch millis.
    pub current_turn_start_ms: i64,
    /// Turn limit.
    pub turn_time_limit_minutes: i32,
    /// JSONB object: player id to sorted banked pick numbers.
    pub players_with_accumulated_picks: serde_json::Value,
    /// Start, epoch millis.
    pub started_at_ms: i64,
    /// Completion, epoch millis.
    pub completed_at_ms: Option<i64>,
}

impl DraftRow {
    /// Row for `draft`.
    pub fn from_draft(draft: &Draft) -> Result<Self, StoreError> {
        let status = serde_json::to_value(draft.status)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .ok_or_else(|| StoreError::Backend("unencodable draft status".into()))?;
        let accumulated = serde_json::to_value(&draft.players_with_accumulated_picks)
            .map_err(|e| StoreError::Backend(format!("encode accumulated picks: {e}")))?;

        Ok(Self {
            league_id: draft.league_id,
            status,
            current_round: to_i32(draft.current_round)?,
            current_pick_in_round: to_i32(draft.current_pick_in_round)?,
            current_pick_on_clock: to_i32(draft.current_pick_on_clock)?,
            current_turn_player_id: draft.current_turn_player_id,
            current_turn_start_ms: to_i64(draft.current_turn_start_ms)?,
            turn_time_limit_minutes: to_i32(draft.turn_time_limit_minutes)?,
            players_with_accumulated_picks: accumulated,
            started_at_ms: to_i64(draft.started_at_ms)?,
            completed_at_ms: draft.completed_at_ms.map(to_i64).transpose()?,
        })
    }

    /// Decode the row back into a draft.
    pub fn into_draft(self) -> Result<Draft, StoreError> {
        let status: DraftStatus = serde_json::from_value(serde_json::Value::String(self.status))
            .map_err(|e| StoreError::Backend(format!("decode draft status: {e}")))?;
        let accumulated: AccumulatedPicks =
            serde_json::from_value(self.players_with_accumulated_picks)
                .map_err(|e| StoreError::Backend(format!("decode accumulated picks: {e}")))?;

        Ok(Draft {
            league_id: self.league_id,
            status,
            current_round: to_u32(self.current_round)?,
            current_pick_in_round: to_u32(self.current_pick_in_round)?,
            current_pick_on_clock: to_u32(self.current_pick_on_clock)?,
            current_turn_player_id: self.current_turn_player_id,
            current_turn_start_ms: to_u128(self.current_turn_start_ms)?,
            turn_time_limit_minutes: to_u32(self.turn_time_limit_minutes)?,
            players_with_accumulated_picks: accumulated,
            started_at_ms: to_u128(self.started_at_ms)?,
            completed_at_ms: self.completed_at_ms.map(to_u128).transpose()?,
        })
    }
}

fn to_i32(v: u32) -> Result<i32, StoreError> {
    i32::try_from(v).map_err(|_| StoreError::Backend(format!("{v} overflows INTEGER")))
}

fn to_i64(v: u128) -> Result<i64, StoreError> {
    i64::try_from(v).map_err(|_| StoreError::Backend(format!("{v} overflows BIGINT")))
}

fn to_u32(v: i32) -> Result<u32, StoreError> {
    u32::try_from(v).map_err(|_| StoreError::Backend(format!("negative column value {v}")))
}

fn to_u128(v: i64) -> Result<u128, StoreError> {
    u128::try_from(v).map_err(|_| StoreError::Backend(format!("negative timestamp {v}")))
}
