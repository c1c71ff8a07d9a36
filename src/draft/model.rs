//! Draft state machine records.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::util::clock::MS_PER_MINUTE;
use crate::util::{LeagueId, PickNumber, PlayerId, PoolEntryId};

/// Draft lifecycle. Only `Ongoing` accepts picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    /// Created but not started.
    Pending,
    /// Accepting picks.
    Ongoing,
    /// Clock stopped by an administrator.
    Paused,
    /// Terminal.
    Completed,
}

/// Pick numbers each player skipped and may still redeem.
pub type AccumulatedPicks = BTreeMap<PlayerId, BTreeSet<PickNumber>>;

/// The draft for one league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Owning league; one draft per league.
    pub league_id: LeagueId,
    /// Lifecycle state.
    pub status: DraftStatus,
    /// Round of the pick on the clock, from 1.
    pub current_round: u32,
    /// Position of the pick on the clock inside its round, from 1.
    pub current_pick_in_round: u32,
    /// Global pick counter, from 1. Never decreases, never skips.
    pub current_pick_on_clock: PickNumber,
    /// Player on the clock while ongoing or paused.
    pub current_turn_player_id: Option<PlayerId>,
    /// When the current turn started.
    pub current_turn_start_ms: u128,
    /// Minutes each turn lasts before an automatic skip.
    pub turn_time_limit_minutes: u32,
    /// Banked picks per player.
    #[serde(default)]
    pub players_with_accumulated_picks: AccumulatedPicks,
    /// When the draft started.
    pub started_at_ms: u128,
    /// When the draft completed.
    pub completed_at_ms: Option<u128>,
}

impl Draft {
    /// Deadline of the current turn.
    pub fn turn_deadline_ms(&self) -> u128 {
        self.current_turn_start_ms + u128::from(self.turn_time_limit_minutes) * MS_PER_MINUTE
    }

    /// Banked picks of `player_id` (empty if none).
    pub fn accumulated_for(&self, player_id: PlayerId) -> BTreeSet<PickNumber> {
        self.players_with_accumulated_picks
            .get(&player_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Total banked picks across all players.
    pub fn accumulated_total(&self) -> usize {
        self.players_with_accumulated_picks
            .values()
            .map(BTreeSet::len)
            .sum()
    }

    /// Whether `player_id` is on the clock.
    pub fn is_on_clock(&self, player_id: PlayerId) -> bool {
        self.current_turn_player_id == Some(player_id)
    }

    /// Bank `pick` for `player_id`.
    pub(crate) fn bank_pick(&mut self, player_id: PlayerId, pick: PickNumber) {
        self.players_with_accumulated_picks
            .entry(player_id)
            .or_default()
            .insert(pick);
    }

    /// Remove redeemed picks; drops the player's entry once empty.
    pub(crate) fn redeem_picks(&mut self, player_id: PlayerId, picks: &BTreeSet<PickNumber>) {
        if let Some(banked) = self.players_with_accumulated_picks.get_mut(&player_id) {
            banked.retain(|p| !picks.contains(p));
            if banked.is_empty() {
                self.players_with_accumulated_picks.remove(&player_id);
            }
        }
    }
}

/// One `(pool entry, pick number)` pair of a pick request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedPick {
    /// Entry to draft.
    pub pool_entry_id: PoolEntryId,
    /// Pick number to spend: the one on the clock or a banked one.
    pub pick_number: PickNumber,
}

/// Batch of picks submitted in one turn. Empty means an explicit skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickRequest {
    /// Requested pairs.
    pub picks: Vec<RequestedPick>,
}

impl PickRequest {
    /// Request a single entry on `pick_number`.
    pub fn single(pool_entry_id: PoolEntryId, pick_number: PickNumber) -> Self {
        Self {
            picks: vec![RequestedPick {
                pool_entry_id,
                pick_number,
            }],
        }
    }

    /// Explicit skip of the current slot.
    pub fn skip() -> Self {
        Self::default()
    }
}

/// A committed pick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// League.
    pub league_id: LeagueId,
    /// Drafting player.
    pub player_id: PlayerId,
    /// Drafted entry.
    pub pool_entry_id: PoolEntryId,
    /// Pick number spent.
    pub pick_number: PickNumber,
    /// Points paid.
    pub cost: u32,
    /// Commit time.
    pub drafted_at_ms: u128,
}

/// Result of a successful `make_pick`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickOutcome {
    /// Draft state after the turn advanced.
    pub draft: Draft,
    /// Allocations committed by this batch.
    pub allocations: Vec<Allocation>,
    /// Slot banked because it was not redeemed, if any.
    pub banked_pick: Option<PickNumber>,
}

/// Result of a scheduler-driven skip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The slot was banked and the turn advanced.
    Skipped {
        /// Player whose slot was banked.
        player_id: PlayerId,
        /// Banked pick number.
        pick_number: PickNumber,
        /// Draft after the advance.
        draft: Box<Draft>,
    },
    /// The timeout no longer applied; nothing changed.
    Stale,
}
