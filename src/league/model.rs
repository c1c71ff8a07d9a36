//! League-side records the draft engine reads and updates.

use serde::{Deserialize, Serialize};

use crate::util::{LeagueId, PlayerId, PoolEntryId, UserId};

/// League lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeagueStatus {
    /// Players joining; draft not started.
    Setup,
    /// Draft in progress.
    Drafting,
    /// Post-draft season play.
    RegularSeason,
    /// Season play with the transfer window open.
    TransferWindow,
    /// Season over.
    Completed,
}

impl LeagueStatus {
    /// Whether the league is past its draft and still playing.
    pub const fn in_season(self) -> bool {
        matches!(self, Self::RegularSeason | Self::TransferWindow)
    }
}

/// Recurring season timings. All lengths in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonCalendar {
    /// Time from draft end (or window close) to the next window opening.
    pub transfer_window_interval_secs: u64,
    /// How long a transfer window stays open.
    pub transfer_window_length_secs: u64,
    /// Time between budget credits.
    pub credit_accrual_interval_secs: u64,
    /// Points credited to every player per accrual.
    pub credit_accrual_amount: u32,
}

/// League format flags consumed by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeagueFormat {
    /// Turn order reverses every even round.
    pub is_snake_order: bool,
    /// Roster floor every player must reach before the draft may end.
    pub min_assets_per_player: u32,
    /// Roster cap; also the nominal number of rounds.
    pub max_assets_per_player: u32,
    /// Season timings; `None` disables windows and accruals.
    #[serde(default)]
    pub season: Option<SeasonCalendar>,
}

/// Durable fire times for season tasks, kept on the league so the scheduler
/// can be rebuilt after a restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonMarks {
    /// When the next transfer window opens.
    pub next_transfer_window_at_ms: Option<u128>,
    /// When the open transfer window closes.
    pub transfer_window_closes_at_ms: Option<u128>,
    /// When budgets are next credited.
    pub next_credit_accrual_at_ms: Option<u128>,
}

/// A league as seen by the draft core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct League {
    /// League identifier.
    pub id: LeagueId,
    /// Current lifecycle state.
    pub status: LeagueStatus,
    /// Draft and season rules.
    pub format: LeagueFormat,
    /// Pending season task times.
    #[serde(default)]
    pub marks: SeasonMarks,
}

/// A user's seat in a league.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Player identifier.
    pub id: PlayerId,
    /// Owning user.
    pub user_id: UserId,
    /// League the seat belongs to.
    pub league_id: LeagueId,
    /// Remaining points.
    pub budget: u32,
    /// Committed allocations.
    pub asset_count: u32,
}

/// One draftable species in a league's pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    /// Entry identifier.
    pub id: PoolEntryId,
    /// League whose pool holds the entry.
    pub league_id: LeagueId,
    /// Species name.
    pub species: String,
    /// Points cost.
    pub cost: u32,
    /// Still draftable.
    pub is_available: bool,
}
