//! Draft error taxonomy.
//!
//! Every failure surfaced by the engine is one of these variants; each maps
//! to an [`ErrorKind`] and a stable code the API layer exposes. Raw store or
//! runtime errors never leak past this type.

use thiserror::Error;

use crate::infra::store::StoreError;

/// Coarse error classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Draft, league, player or pool entry absent.
    NotFound,
    /// Caller may not act now (not their turn, or policy denied).
    Unauthorized,
    /// League or draft not in a state accepting the operation.
    InvalidState,
    /// Malformed, duplicate or over-requested pick numbers.
    InvalidInput,
    /// Pool entry no longer available.
    Conflict,
    /// Batch cost exceeds the player's budget.
    InsufficientBudget,
    /// Skipping would leave the player unable to reach the roster floor.
    CannotSkipBelowMinimum,
    /// Persistence failure or broken invariant.
    Internal,
}

/// Errors returned by the draft engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// No draft exists for the league.
    #[error("no draft for league {0}")]
    DraftNotFound(i64),
    /// League does not exist.
    #[error("league {0} not found")]
    LeagueNotFound(i64),
    /// Caller has no player in the league.
    #[error("player not found: {0}")]
    PlayerNotFound(String),
    /// A requested pool entry does not exist in the league.
    #[error("pool entry {0} not found")]
    PoolEntryNotFound(i64),
    /// A draft needs at least one player.
    #[error("league {0} has no players to draft")]
    NoPlayersForDraft(i64),
    /// More picks requested than banked plus the current slot.
    #[error("requested {requested} picks but only {allowed} are available")]
    TooManyRequestedPicks {
        /// Picks in the request.
        requested: usize,
        /// Banked picks plus one.
        allowed: usize,
    },
    /// Not the caller's turn, or the access policy refused.
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    /// League or draft state rejects the operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Request content rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Pool entry already taken.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Batch too expensive.
    #[error("insufficient budget: cost {cost} exceeds budget {budget}")]
    InsufficientBudget {
        /// Total cost of the batch.
        cost: u64,
        /// Player's remaining budget.
        budget: u32,
    },
    /// Skip refused by the roster floor.
    #[error("cannot skip: {reachable} reachable assets is below the minimum of {minimum}")]
    CannotSkipBelowMinimum {
        /// Best roster size still reachable after the skip.
        reachable: u32,
        /// League minimum.
        minimum: u32,
    },
    /// Persistence failure or corrupted invariant.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DraftError {
    /// Coarse class of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::DraftNotFound(_)
            | Self::LeagueNotFound(_)
            | Self::PlayerNotFound(_)
            | Self::PoolEntryNotFound(_) => ErrorKind::NotFound,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::NoPlayersForDraft(_) | Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::TooManyRequestedPicks { .. } | Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::InsufficientBudget { .. } => ErrorKind::InsufficientBudget,
            Self::CannotSkipBelowMinimum { .. } => ErrorKind::CannotSkipBelowMinimum,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DraftNotFound(_) => "DRAFT_NOT_FOUND",
            Self::LeagueNotFound(_) => "LEAGUE_NOT_FOUND",
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::PoolEntryNotFound(_) => "POOL_ENTRY_NOT_FOUND",
            Self::NoPlayersForDraft(_) => "NO_PLAYERS_FOR_DRAFT",
            Self::TooManyRequestedPicks { .. } => "TOO_MANY_REQUESTED_PICKS",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Conflict(_) => "CONFLICT",
            Self::InsufficientBudget { .. } => "INSUFFICIENT_BUDGET",
            Self::CannotSkipBelowMinimum { .. } => "CANNOT_SKIP_BELOW_MINIMUM",
            Self::Internal(_) => "INTERNAL",
        }
    }

    pub(crate) fn invalid_state(detail: impl Into<String>) -> Self {
        Self::InvalidState(detail.into())
    }

    pub(crate) fn invalid_input(detail: impl Into<String>) -> Self {
        Self::InvalidInput(detail.into())
    }

    pub(crate) fn internal(detail: impl Into<String>) -> Self {
        Self::Internal(detail.into())
    }
}

impl From<StoreError> for DraftError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(detail) => Self::Conflict(detail),
            StoreError::NotFound(detail) | StoreError::Backend(detail) => Self::Internal(detail),
            StoreError::Unavailable(detail) => Self::Internal(format!("store unavailable: {detail}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_follow_taxonomy() {
        assert_eq!(DraftError::DraftNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(DraftError::NoPlayersForDraft(1).kind(), ErrorKind::InvalidState);
        assert_eq!(
            DraftError::TooManyRequestedPicks {
                requested: 3,
                allowed: 2
            }
            .kind(),
            ErrorKind::InvalidInput
        );
        assert_eq!(
            DraftError::CannotSkipBelowMinimum {
                reachable: 2,
                minimum: 3
            }
            .code(),
            "CANNOT_SKIP_BELOW_MINIMUM"
        );
    }

    #[test]
    fn test_store_conflict_stays_conflict() {
        let err: DraftError = StoreError::Conflict("entry 4 taken".into()).into();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        let err: DraftError = StoreError::Backend("deadlock".into()).into();
        assert_eq!(err.kind(), ErrorKind::Internal);
    }
}
