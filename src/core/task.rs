//! Scheduled task model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::util::{LeagueId, PickNumber, PlayerId};

/// Kind of deferred work; each kind has exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// The on-clock player ran out of time.
    DraftTurnTimeout,
    /// A league's transfer window opens.
    TransferWindowStart,
    /// A league's transfer window closes.
    TransferWindowEnd,
    /// Periodic budget credit for every player of a league.
    CreditAccrual,
}

impl TaskType {
    /// Stable snake_case name, used in task keys and logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DraftTurnTimeout => "draft_turn_timeout",
            Self::TransferWindowStart => "transfer_window_start",
            Self::TransferWindowEnd => "transfer_window_end",
            Self::CreditAccrual => "credit_accrual",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deterministic task identity: task type plus owning league.
///
/// Registering a task whose key is already pending replaces it, so one league
/// never has two outstanding timeouts of the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskKey {
    /// Type of work.
    pub task_type: TaskType,
    /// Owning league.
    pub owner: LeagueId,
}

impl TaskKey {
    /// Key for a task of `task_type` owned by `owner`.
    pub const fn new(task_type: TaskType, owner: LeagueId) -> Self {
        Self { task_type, owner }
    }

    /// Key of the turn timeout for a league's draft.
    pub const fn turn_timeout(league_id: LeagueId) -> Self {
        Self::new(TaskType::DraftTurnTimeout, league_id)
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.task_type, self.owner)
    }
}

/// Per-type payload carrying the IDs the handler needs to act.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskPayload {
    /// Timeout for the turn of `player_id` on `pick_number`.
    DraftTurnTimeout {
        /// League whose draft timed out.
        league_id: LeagueId,
        /// Player that was on the clock when the task was registered.
        player_id: PlayerId,
        /// Pick that was on the clock when the task was registered.
        pick_number: PickNumber,
    },
    /// Open the transfer window.
    TransferWindowStart {
        /// League to transition.
        league_id: LeagueId,
    },
    /// Close the transfer window.
    TransferWindowEnd {
        /// League to transition.
        league_id: LeagueId,
    },
    /// Credit budgets.
    CreditAccrual {
        /// League to credit.
        league_id: LeagueId,
    },
}

impl TaskPayload {
    /// Task type this payload belongs to.
    pub const fn task_type(&self) -> TaskType {
        match self {
            Self::DraftTurnTimeout { .. } => TaskType::DraftTurnTimeout,
            Self::TransferWindowStart { .. } => TaskType::TransferWindowStart,
            Self::TransferWindowEnd { .. } => TaskType::TransferWindowEnd,
            Self::CreditAccrual { .. } => TaskType::CreditAccrual,
        }
    }

    /// League that owns the task.
    pub const fn league_id(&self) -> LeagueId {
        match self {
            Self::DraftTurnTimeout { league_id, .. }
            | Self::TransferWindowStart { league_id }
            | Self::TransferWindowEnd { league_id }
            | Self::CreditAccrual { league_id } => *league_id,
        }
    }
}

/// A unit of deferred work keyed by its fire time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Deterministic identity derived from the payload.
    pub key: TaskKey,
    /// Fire time in milliseconds since the Unix epoch.
    pub execute_at_ms: u128,
    /// What to do when the task fires.
    pub payload: TaskPayload,
}

impl ScheduledTask {
    /// Build a task; its key is derived from the payload.
    pub fn new(execute_at_ms: u128, payload: TaskPayload) -> Self {
        Self {
            key: TaskKey::new(payload.task_type(), payload.league_id()),
            execute_at_ms,
            payload,
        }
    }

    /// Task type shortcut.
    pub const fn task_type(&self) -> TaskType {
        self.key.task_type
    }
}
