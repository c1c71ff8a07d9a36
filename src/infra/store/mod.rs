//! Collaborator interfaces the draft core persists through.
//!
//! League, player and pool records are owned elsewhere; the engine only reads
//! them and writes back through [`DraftRepository::commit_turn`], which must
//! apply a whole turn or nothing.

use std::collections::BTreeMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::draft::model::{Allocation, Draft};
use crate::league::model::{League, Player, PoolEntry};
use crate::util::{LeagueId, PlayerId, PoolEntryId, UserId};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryLeagueStore;

/// Errors raised by store backends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A row the write depends on is missing.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or availability check failed inside the transaction.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend could not be reached or timed out.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Everything one successful turn writes, applied in a single transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCommit {
    /// League of the draft.
    pub league_id: LeagueId,
    /// Player who acted (or was skipped).
    pub player_id: PlayerId,
    /// New allocation rows; empty for a skip.
    pub allocations: Vec<Allocation>,
    /// Entries to mark unavailable.
    pub consumed_entries: Vec<PoolEntryId>,
    /// Points debited from the player.
    pub total_cost: u32,
    /// Draft after the turn advanced.
    pub draft: Draft,
    /// League update, set when the draft completed.
    pub league: Option<League>,
}

/// League and player lookup.
#[async_trait]
pub trait LeagueDirectory: Send + Sync {
    /// League by id.
    async fn league(&self, league_id: LeagueId) -> Result<Option<League>, StoreError>;

    /// Players of a league in draft order.
    async fn players(&self, league_id: LeagueId) -> Result<Vec<Player>, StoreError>;

    /// The seat `user_id` holds in a league.
    async fn player_for_user(
        &self,
        league_id: LeagueId,
        user_id: UserId,
    ) -> Result<Option<Player>, StoreError>;

    /// Leagues in a season state.
    async fn active_leagues(&self) -> Result<Vec<League>, StoreError>;

    /// Overwrite a league's status and season marks.
    async fn save_league(&self, league: &League) -> Result<(), StoreError>;

    /// Add `amount` to every player's budget and set the league's next
    /// accrual mark to `next_accrual_at_ms`, in one transaction. Returns
    /// players credited.
    async fn credit_players(
        &self,
        league_id: LeagueId,
        amount: u32,
        next_accrual_at_ms: u128,
    ) -> Result<usize, StoreError>;
}

/// Draft pool lookup.
#[async_trait]
pub trait PoolLedger: Send + Sync {
    /// Entries of the league's pool among `ids`. Unknown ids are omitted.
    async fn pool_entries(
        &self,
        league_id: LeagueId,
        ids: &[PoolEntryId],
    ) -> Result<Vec<PoolEntry>, StoreError>;

    /// Committed allocations per player.
    async fn allocation_counts(
        &self,
        league_id: LeagueId,
    ) -> Result<BTreeMap<PlayerId, u32>, StoreError>;
}

/// Draft persistence.
#[async_trait]
pub trait DraftRepository: Send + Sync {
    /// Draft of a league.
    async fn load_draft(&self, league_id: LeagueId) -> Result<Option<Draft>, StoreError>;

    /// Every draft currently `Ongoing`.
    async fn ongoing_drafts(&self) -> Result<Vec<Draft>, StoreError>;

    /// Create a league's draft and store the league's new status with it.
    /// Fails with `Conflict` if the league already has a draft.
    async fn insert_draft(&self, draft: &Draft, league: &League) -> Result<(), StoreError>;

    /// Overwrite draft state without touching allocations.
    async fn save_draft(&self, draft: &Draft) -> Result<(), StoreError>;

    /// Apply a turn atomically. Entries found unavailable inside the
    /// transaction fail the whole commit with `Conflict`.
    async fn commit_turn(&self, commit: TurnCommit) -> Result<(), StoreError>;
}

/// Capability check run before any pick is validated.
pub trait AccessPolicy: Send + Sync {
    /// Whether `user_id` may submit picks in `league_id`.
    fn can_make_pick(&self, user_id: UserId, league_id: LeagueId) -> bool;
}

/// Policy that admits everyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessPolicy for AllowAll {
    fn can_make_pick(&self, _user_id: UserId, _league_id: LeagueId) -> bool {
        true
    }
}
