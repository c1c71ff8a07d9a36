//! In-memory store with transactional turn commits.
//!
//! One `parking_lot::Mutex` guards all tables, so every trait call observes
//! and applies a consistent snapshot. `commit_turn` validates the whole turn
//! before mutating anything.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{DraftRepository, LeagueDirectory, PoolLedger, StoreError, TurnCommit};
use crate::draft::model::{Allocation, Draft, DraftStatus};
use crate::league::model::{League, Player, PoolEntry};
use crate::util::{LeagueId, PlayerId, PoolEntryId, UserId};

#[derive(Default)]
struct Tables {
    leagues: HashMap<LeagueId, League>,
    // Insertion order is draft order.
    players: Vec<Player>,
    pool: HashMap<PoolEntryId, PoolEntry>,
    allocations: Vec<Allocation>,
    drafts: HashMap<LeagueId, Draft>,
}

impl Tables {
    fn check_turn(&self, commit: &TurnCommit) -> Result<(), StoreError> {
        if !self.drafts.contains_key(&commit.league_id) {
            return Err(StoreError::NotFound(format!(
                "draft for league {}",
                commit.league_id
            )));
        }
        let player = self
            .players
            .iter()
            .find(|p| p.id == commit.player_id && p.league_id == commit.league_id)
            .ok_or_else(|| StoreError::NotFound(format!("player {}", commit.player_id)))?;
        if player.budget < commit.total_cost {
            return Err(StoreError::Conflict(format!(
                "player {} budget {} below cost {}",
                player.id, player.budget, commit.total_cost
            )));
        }

        for entry_id in &commit.consumed_entries {
            match self.pool.get(entry_id) {
                Some(entry) if entry.league_id == commit.league_id && entry.is_available => {}
                Some(_) => {
                    return Err(StoreError::Conflict(format!(
                        "pool entry {entry_id} already taken"
                    )))
                }
                None => return Err(StoreError::NotFound(format!("pool entry {entry_id}"))),
            }
        }

        for alloc in &commit.allocations {
            let clash = self.allocations.iter().any(|a| {
                a.league_id == alloc.league_id
                    && (a.pick_number == alloc.pick_number || a.pool_entry_id == alloc.pool_entry_id)
            });
            if clash {
                return Err(StoreError::Conflict(format!(
                    "pick {} or entry {} already allocated",
                    alloc.pick_number, alloc.pool_entry_id
                )));
            }
        }
        Ok(())
    }

    fn apply_turn(&mut self, commit: TurnCommit) {
        let added = u32::try_from(commit.allocations.len()).unwrap_or(u32::MAX);
        if let Some(player) = self.players.iter_mut().find(|p| p.id == commit.player_id) {
            player.budget -= commit.total_cost;
            player.asset_count += added;
        }
        for entry_id in &commit.consumed_entries {
            if let Some(entry) = self.pool.get_mut(entry_id) {
                entry.is_available = false;
            }
        }
        self.allocations.extend(commit.allocations);
        if let Some(league) = commit.league {
            self.leagues.insert(league.id, league);
        }
        self.drafts.insert(commit.league_id, commit.draft);
    }
}

/// Store backing every collaborator trait from process memory.
#[derive(Default)]
pub struct InMemoryLeagueStore {
    tables: Mutex<Tables>,
    failing_commits: AtomicUsize,
    commit_delay_ms: AtomicU64,
}

impl InMemoryLeagueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a league.
    pub fn insert_league(&self, league: League) {
        self.tables.lock().leagues.insert(league.id, league);
    }

    /// Append a player; players draft in the order they are added.
    pub fn add_player(&self, player: Player) {
        self.tables.lock().players.push(player);
    }

    /// Insert or replace a pool entry.
    pub fn add_pool_entry(&self, entry: PoolEntry) {
        self.tables.lock().pool.insert(entry.id, entry);
    }

    /// Write a draft row directly, bypassing the start checks.
    pub fn put_draft(&self, draft: Draft) {
        self.tables.lock().drafts.insert(draft.league_id, draft);
    }

    /// Player by id.
    pub fn player(&self, player_id: PlayerId) -> Option<Player> {
        self.tables
            .lock()
            .players
            .iter()
            .find(|p| p.id == player_id)
            .cloned()
    }

    /// Pool entry by id.
    pub fn pool_entry(&self, entry_id: PoolEntryId) -> Option<PoolEntry> {
        self.tables.lock().pool.get(&entry_id).cloned()
    }

    /// Committed allocations of a league, in commit order.
    pub fn allocations(&self, league_id: LeagueId) -> Vec<Allocation> {
        self.tables
            .lock()
            .allocations
            .iter()
            .filter(|a| a.league_id == league_id)
            .cloned()
            .collect()
    }

    /// Make the next `count` transactional writes (turn commits and credit
    /// accruals) fail with `Unavailable`.
    pub fn fail_next_commits(&self, count: usize) {
        self.failing_commits.store(count, Ordering::Release);
    }

    /// Delay every turn commit by `delay`.
    pub fn set_commit_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.commit_delay_ms.store(millis, Ordering::Release);
    }

    fn take_injected_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl LeagueDirectory for InMemoryLeagueStore {
    async fn league(&self, league_id: LeagueId) -> Result<Option<League>, StoreError> {
        Ok(self.tables.lock().leagues.get(&league_id).cloned())
    }

    async fn players(&self, league_id: LeagueId) -> Result<Vec<Player>, StoreError> {
        Ok(self
            .tables
            .lock()
            .players
            .iter()
            .filter(|p| p.league_id == league_id)
            .cloned()
            .collect())
    }

    async fn player_for_user(
        &self,
        league_id: LeagueId,
        user_id: UserId,
    ) -> Result<Option<Player>, StoreError> {
        Ok(self
            .tables
            .lock()
            .players
            .iter()
            .find(|p| p.league_id == league_id && p.user_id == user_id)
            .cloned())
    }

    async fn active_leagues(&self) -> Result<Vec<League>, StoreError> {
        let mut leagues: Vec<League> = self
            .tables
            .lock()
            .leagues
            .values()
            .filter(|l| l.status.in_season())
            .cloned()
            .collect();
        leagues.sort_by_key(|l| l.id);
        Ok(leagues)
    }

    async fn save_league(&self, league: &League) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        match tables.leagues.get_mut(&league.id) {
            Some(existing) => {
                *existing = league.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("league {}", league.id))),
        }
    }

    async fn credit_players(
        &self,
        league_id: LeagueId,
        amount: u32,
        next_accrual_at_ms: u128,
    ) -> Result<usize, StoreError> {
        if self.take_injected_failure() {
            return Err(StoreError::Unavailable("injected credit failure".into()));
        }
        let mut tables = self.tables.lock();
        let league = tables
            .leagues
            .get_mut(&league_id)
            .ok_or_else(|| StoreError::NotFound(format!("league {league_id}")))?;
        league.marks.next_credit_accrual_at_ms = Some(next_accrual_at_ms);
        let mut credited = 0;
        for player in tables.players.iter_mut().filter(|p| p.league_id == league_id) {
            player.budget = player.budget.saturating_add(amount);
            credited += 1;
        }
        Ok(credited)
    }
}

#[async_trait]
impl PoolLedger for InMemoryLeagueStore {
    async fn pool_entries(
        &self,
        league_id: LeagueId,
        ids: &[PoolEntryId],
    ) -> Result<Vec<PoolEntry>, StoreError> {
        let tables = self.tables.lock();
        Ok(ids
            .iter()
            .filter_map(|id| tables.pool.get(id))
            .filter(|e| e.league_id == league_id)
            .cloned()
            .collect())
    }

    async fn allocation_counts(
        &self,
        league_id: LeagueId,
    ) -> Result<BTreeMap<PlayerId, u32>, StoreError> {
        let tables = self.tables.lock();
        let mut counts: BTreeMap<PlayerId, u32> = tables
            .players
            .iter()
            .filter(|p| p.league_id == league_id)
            .map(|p| (p.id, 0))
            .collect();
        for alloc in tables.allocations.iter().filter(|a| a.league_id == league_id) {
            *counts.entry(alloc.player_id).or_default() += 1;
        }
        Ok(counts)
    }
}

#[async_trait]
impl DraftRepository for InMemoryLeagueStore {
    async fn load_draft(&self, league_id: LeagueId) -> Result<Option<Draft>, StoreError> {
        Ok(self.tables.lock().drafts.get(&league_id).cloned())
    }

    async fn ongoing_drafts(&self) -> Result<Vec<Draft>, StoreError> {
        let mut drafts: Vec<Draft> = self
            .tables
            .lock()
            .drafts
            .values()
            .filter(|d| d.status == DraftStatus::Ongoing)
            .cloned()
            .collect();
        drafts.sort_by_key(|d| d.league_id);
        Ok(drafts)
    }

    async fn insert_draft(&self, draft: &Draft, league: &League) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        if tables.drafts.contains_key(&draft.league_id) {
            return Err(StoreError::Conflict(format!(
                "league {} already has a draft",
                draft.league_id
            )));
        }
        if !tables.leagues.contains_key(&league.id) {
            return Err(StoreError::NotFound(format!("league {}", league.id)));
        }
        tables.drafts.insert(draft.league_id, draft.clone());
        tables.leagues.insert(league.id, league.clone());
        Ok(())
    }

    async fn save_draft(&self, draft: &Draft) -> Result<(), StoreError> {
        let mut tables = self.tables.lock();
        match tables.drafts.get_mut(&draft.league_id) {
            Some(existing) => {
                *existing = draft.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!(
                "draft for league {}",
                draft.league_id
            ))),
        }
    }

    async fn commit_turn(&self, commit: TurnCommit) -> Result<(), StoreError> {
        let delay = self.commit_delay_ms.load(Ordering::Acquire);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.take_injected_failure() {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let mut tables = self.tables.lock();
        tables.check_turn(&commit)?;
        tables.apply_turn(commit);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::model::AccumulatedPicks;
    use crate::league::model::{LeagueFormat, LeagueStatus, SeasonMarks};

    fn seeded() -> InMemoryLeagueStore {
        let store = InMemoryLeagueStore::new();
        store.insert_league(League {
            id: 1,
            status: LeagueStatus::Drafting,
            format: LeagueFormat {
                is_snake_order: false,
                min_assets_per_player: 1,
                max_assets_per_player: 2,
                season: None,
            },
            marks: SeasonMarks::default(),
        });
        store.add_player(Player {
            id: 10,
            user_id: 100,
            league_id: 1,
            budget: 50,
            asset_count: 0,
        });
        store.add_pool_entry(PoolEntry {
            id: 7,
            league_id: 1,
            species: "bulbasaur".into(),
            cost: 20,
            is_available: true,
        });
        store.put_draft(Draft {
            league_id: 1,
            status: DraftStatus::Ongoing,
            current_round: 1,
            current_pick_in_round: 1,
            current_pick_on_clock: 1,
            current_turn_player_id: Some(10),
            current_turn_start_ms: 0,
            turn_time_limit_minutes: 5,
            players_with_accumulated_picks: AccumulatedPicks::new(),
            started_at_ms: 0,
            completed_at_ms: None,
        });
        store
    }

    async fn commit(store: &InMemoryLeagueStore) -> TurnCommit {
        let mut draft = store.load_draft(1).await.unwrap().unwrap();
        draft.current_pick_on_clock = 2;
        TurnCommit {
            league_id: 1,
            player_id: 10,
            allocations: vec![Allocation {
                league_id: 1,
                player_id: 10,
                pool_entry_id: 7,
                pick_number: 1,
                cost: 20,
                drafted_at_ms: 5,
            }],
            consumed_entries: vec![7],
            total_cost: 20,
            draft,
            league: None,
        }
    }

    #[tokio::test]
    async fn test_commit_applies_every_table() {
        let store = seeded();
        let turn = commit(&store).await;
        store.commit_turn(turn).await.unwrap();

        let player = store.player(10).unwrap();
        assert_eq!(player.budget, 30);
        assert_eq!(player.asset_count, 1);
        assert!(!store.pool_entry(7).unwrap().is_available);
        assert_eq!(store.allocations(1).len(), 1);
        assert_eq!(store.load_draft(1).await.unwrap().unwrap().current_pick_on_clock, 2);
        assert_eq!(store.allocation_counts(1).await.unwrap()[&10], 1);
    }

    #[tokio::test]
    async fn test_taken_entry_rejects_whole_commit() {
        let store = seeded();
        let first = commit(&store).await;
        let mut second = first.clone();
        store.commit_turn(first).await.unwrap();

        second.allocations[0].pick_number = 2;
        second.draft.current_pick_on_clock = 3;
        let err = store.commit_turn(second).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        assert_eq!(store.player(10).unwrap().budget, 30);
        assert_eq!(store.load_draft(1).await.unwrap().unwrap().current_pick_on_clock, 2);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_state() {
        let store = seeded();
        store.fail_next_commits(1);
        let turn = commit(&store).await;
        let err = store.commit_turn(turn.clone()).await.unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(store.allocations(1).is_empty());

        store.commit_turn(turn).await.unwrap();
        assert_eq!(store.allocations(1).len(), 1);
    }

    #[tokio::test]
    async fn test_insert_draft_once() {
        let store = seeded();
        let draft = store.load_draft(1).await.unwrap().unwrap();
        let league = store.league(1).await.unwrap().unwrap();
        let err = store.insert_draft(&draft, &league).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_credit_players() {
        let store = seeded();
        assert_eq!(store.credit_players(1, 5, 9_000).await.unwrap(), 1);
        assert_eq!(store.player(10).unwrap().budget, 55);
        let league = store.league(1).await.unwrap().unwrap();
        assert_eq!(league.marks.next_credit_accrual_at_ms, Some(9_000));

        let err = store.credit_players(2, 5, 9_000).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store.fail_next_commits(1);
        assert!(store.credit_players(1, 5, 12_000).await.is_err());
        assert_eq!(store.player(10).unwrap().budget, 55);
        let league = store.league(1).await.unwrap().unwrap();
        assert_eq!(league.marks.next_credit_accrual_at_ms, Some(9_000));
    }
}
