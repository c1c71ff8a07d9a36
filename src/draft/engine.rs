//! Draft turn engine.
//!
//! Every state-changing operation runs read, validate, commit, advance and
//! reschedule under the league's lock. All validation happens before the
//! single transactional commit; scheduler registration and notices follow a
//! successful commit only.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{AuditEvent, AuditSink, ScheduledTask, Scheduler, TaskKey, TaskPayload};
use crate::draft::error::DraftError;
use crate::draft::locks::LeagueLocks;
use crate::draft::model::{
    Allocation, Draft, DraftStatus, PickOutcome, PickRequest, SkipOutcome,
};
use crate::draft::turn::{self, SkipFloor};
use crate::infra::mailbox::{Mailbox, Notice};
use crate::infra::store::{
    AccessPolicy, AllowAll, DraftRepository, LeagueDirectory, PoolLedger, StoreError, TurnCommit,
};
use crate::league::model::{League, LeagueStatus, Player};
use crate::util::{LeagueId, MailboxKey, PickNumber, PlayerId, UserId};

/// Draft state after one turn, before it is committed.
struct Advance {
    draft: Draft,
    league: Option<League>,
}

impl Advance {
    fn completed(&self) -> bool {
        self.draft.status == DraftStatus::Completed
    }
}

/// Strict-order allocation state machine, one draft per league.
pub struct DraftEngine {
    leagues: Arc<dyn LeagueDirectory>,
    pool: Arc<dyn PoolLedger>,
    drafts: Arc<dyn DraftRepository>,
    policy: Arc<dyn AccessPolicy>,
    scheduler: Scheduler,
    mailbox: Option<Arc<dyn Mailbox>>,
    audit: Option<Arc<dyn AuditSink>>,
    locks: LeagueLocks,
    config: EngineConfig,
}

impl DraftEngine {
    /// Create an engine over its collaborators. Turn timeouts are registered
    /// on `scheduler` and time is read from the scheduler's clock.
    pub fn new(
        leagues: Arc<dyn LeagueDirectory>,
        pool: Arc<dyn PoolLedger>,
        drafts: Arc<dyn DraftRepository>,
        scheduler: Scheduler,
        config: EngineConfig,
    ) -> Self {
        Self {
            leagues,
            pool,
            drafts,
            policy: Arc::new(AllowAll),
            scheduler,
            mailbox: None,
            audit: None,
            locks: LeagueLocks::new(),
            config,
        }
    }

    /// Replace the allow-all access policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Deliver turn notices to `mailbox`.
    #[must_use]
    pub fn with_mailbox(mut self, mailbox: Arc<dyn Mailbox>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Scheduler the engine registers timeouts on.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Active configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current draft of a league.
    pub async fn draft(&self, league_id: LeagueId) -> Result<Draft, DraftError> {
        self.drafts
            .load_draft(league_id)
            .await?
            .ok_or(DraftError::DraftNotFound(league_id))
    }

    /// The next `count` picks of an ongoing or paused draft and the player
    /// holding each, starting with the pick on the clock. Banked slots are
    /// not shown; they belong to whoever skipped them.
    pub async fn upcoming_turns(
        &self,
        league_id: LeagueId,
        count: usize,
    ) -> Result<Vec<(PickNumber, PlayerId)>, DraftError> {
        let draft = self.draft(league_id).await?;
        if draft.status == DraftStatus::Completed {
            return Ok(Vec::new());
        }
        let league = self
            .leagues
            .league(league_id)
            .await?
            .ok_or(DraftError::LeagueNotFound(league_id))?;
        let order: Vec<PlayerId> = self
            .leagues
            .players(league_id)
            .await?
            .iter()
            .map(|p| p.id)
            .collect();
        Ok(turn::upcoming_turns(
            draft.current_pick_on_clock,
            &order,
            league.format.is_snake_order,
            count,
        ))
    }

    /// Start the draft of a league in `Setup`. A zero limit uses the
    /// configured default.
    pub async fn start_draft(
        &self,
        league_id: LeagueId,
        turn_time_limit_minutes: u32,
    ) -> Result<Draft, DraftError> {
        let lock = self.locks.handle(league_id);
        let _guard = lock.lock().await;

        let mut league = self
            .leagues
            .league(league_id)
            .await?
            .ok_or(DraftError::LeagueNotFound(league_id))?;
        if league.status != LeagueStatus::Setup {
            return Err(DraftError::invalid_state(format!(
                "league {league_id} is {:?}, expected Setup",
                league.status
            )));
        }
        if self.drafts.load_draft(league_id).await?.is_some() {
            return Err(DraftError::invalid_state(format!(
                "league {league_id} already has a draft"
            )));
        }
        let players = self.leagues.players(league_id).await?;
        let first = players
            .first()
            .ok_or(DraftError::NoPlayersForDraft(league_id))?;

        let limit = if turn_time_limit_minutes == 0 {
            self.config.default_turn_time_limit_minutes
        } else {
            turn_time_limit_minutes
        };
        let now = self.now_ms();
        let draft = Draft {
            league_id,
            status: DraftStatus::Ongoing,
            current_round: 1,
            current_pick_in_round: 1,
            current_pick_on_clock: 1,
            current_turn_player_id: Some(first.id),
            current_turn_start_ms: now,
            turn_time_limit_minutes: limit,
            players_with_accumulated_picks: BTreeMap::new(),
            started_at_ms: now,
            completed_at_ms: None,
        };
        league.status = LeagueStatus::Drafting;

        self.bounded(self.drafts.insert_draft(&draft, &league))
            .await?;

        self.schedule_turn_timeout(&draft);
        self.notify_on_clock(&draft);
        self.record(
            league_id,
            "draft_started",
            Some(format!("players={} limit_minutes={limit}", players.len())),
        );
        tracing::info!(
            league_id,
            players = players.len(),
            turn_time_limit_minutes = limit,
            first_player = first.id,
            "draft started"
        );
        Ok(draft)
    }

    /// Submit a batch of picks for the caller's turn. An empty batch skips.
    ///
    /// Any failed check rejects the whole batch before anything is written.
    pub async fn make_pick(
        &self,
        user_id: UserId,
        league_id: LeagueId,
        request: PickRequest,
    ) -> Result<PickOutcome, DraftError> {
        if !self.policy.can_make_pick(user_id, league_id) {
            return Err(DraftError::Unauthorized(format!(
                "user {user_id} may not pick in league {league_id}"
            )));
        }

        let lock = self.locks.handle(league_id);
        let _guard = lock.lock().await;

        let draft = self.draft(league_id).await?;
        let player = self
            .leagues
            .player_for_user(league_id, user_id)
            .await?
            .ok_or_else(|| {
                DraftError::PlayerNotFound(format!("user {user_id} in league {league_id}"))
            })?;
        let accumulated = draft.accumulated_for(player.id);

        let requested = request.picks.len();
        if requested > accumulated.len() + 1 {
            return Err(DraftError::TooManyRequestedPicks {
                requested,
                allowed: accumulated.len() + 1,
            });
        }

        let league = self
            .leagues
            .league(league_id)
            .await?
            .ok_or(DraftError::LeagueNotFound(league_id))?;
        if league.status != LeagueStatus::Drafting || draft.status != DraftStatus::Ongoing {
            return Err(DraftError::invalid_state(format!(
                "league {league_id} is {:?} with draft {:?}",
                league.status, draft.status
            )));
        }
        if !draft.is_on_clock(player.id) {
            return Err(DraftError::Unauthorized(format!(
                "player {} is not on the clock",
                player.id
            )));
        }

        // Pool entries: unique, present in the league, still available.
        let mut entry_ids = BTreeSet::new();
        for pick in &request.picks {
            if !entry_ids.insert(pick.pool_entry_id) {
                return Err(DraftError::invalid_input(format!(
                    "pool entry {} requested twice",
                    pick.pool_entry_id
                )));
            }
        }
        let ids: Vec<_> = request.picks.iter().map(|p| p.pool_entry_id).collect();
        let entries: HashMap<_, _> = self
            .pool
            .pool_entries(league_id, &ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let mut total_cost: u64 = 0;
        for id in &ids {
            let entry = entries.get(id).ok_or(DraftError::PoolEntryNotFound(*id))?;
            if !entry.is_available {
                return Err(DraftError::Conflict(format!(
                    "pool entry {id} ({}) is already drafted",
                    entry.species
                )));
            }
            total_cost += u64::from(entry.cost);
        }

        // Pick numbers: the slot on the clock or a banked one, each once.
        let current = draft.current_pick_on_clock;
        let mut numbers = BTreeSet::new();
        for pick in &request.picks {
            if pick.pick_number != current && !accumulated.contains(&pick.pick_number) {
                return Err(DraftError::invalid_input(format!(
                    "pick {} is not redeemable by player {}",
                    pick.pick_number, player.id
                )));
            }
            if !numbers.insert(pick.pick_number) {
                return Err(DraftError::invalid_input(format!(
                    "pick {} requested twice",
                    pick.pick_number
                )));
            }
        }
        // Roster cap: without it a few players could fill the `n * max`
        // completion total while others stay below the floor.
        let requested_u32 = u32::try_from(requested)
            .map_err(|_| DraftError::invalid_input("too many picks in one request"))?;
        if player.asset_count + requested_u32 > league.format.max_assets_per_player {
            return Err(DraftError::invalid_input(format!(
                "player {} holds {} assets; {} more exceeds the cap of {}",
                player.id, player.asset_count, requested, league.format.max_assets_per_player
            )));
        }

        if total_cost > u64::from(player.budget) {
            return Err(DraftError::InsufficientBudget {
                cost: total_cost,
                budget: player.budget,
            });
        }

        let redeems_current = numbers.contains(&current);
        if !redeems_current {
            let accumulated_u32 = u32::try_from(accumulated.len())
                .map_err(|_| DraftError::internal("banked pick count overflow"))?;
            SkipFloor {
                asset_count: player.asset_count,
                requested: requested_u32,
                accumulated: accumulated_u32,
                current_round: draft.current_round,
                min_assets_per_player: league.format.min_assets_per_player,
                max_assets_per_player: league.format.max_assets_per_player,
            }
            .check()?;
        }
        tracing::debug!(
            league_id,
            player_id = player.id,
            requested,
            total_cost,
            redeems_current,
            "pick batch validated"
        );

        let now = self.now_ms();
        let allocations: Vec<Allocation> = request
            .picks
            .iter()
            .filter_map(|pick| {
                entries.get(&pick.pool_entry_id).map(|entry| Allocation {
                    league_id,
                    player_id: player.id,
                    pool_entry_id: entry.id,
                    pick_number: pick.pick_number,
                    cost: entry.cost,
                    drafted_at_ms: now,
                })
            })
            .collect();
        let banked_pick = (!redeems_current).then_some(current);

        let order = self.leagues.players(league_id).await?;
        let mut counts = self.pool.allocation_counts(league_id).await?;
        *counts.entry(player.id).or_default() += requested_u32;

        let advance = advance_turn(
            &draft,
            &league,
            &order,
            player.id,
            &numbers,
            banked_pick,
            &counts,
            now,
        )?;

        let commit = TurnCommit {
            league_id,
            player_id: player.id,
            allocations: allocations.clone(),
            consumed_entries: ids,
            total_cost: u32::try_from(total_cost)
                .map_err(|_| DraftError::internal("batch cost overflow"))?,
            draft: advance.draft.clone(),
            league: advance.league.clone(),
        };
        self.bounded(self.drafts.commit_turn(commit)).await?;

        let action = if requested == 0 { "skip" } else { "pick" };
        self.record(
            league_id,
            action,
            Some(format!(
                "player={} picks={:?} banked={:?}",
                player.id, numbers, banked_pick
            )),
        );
        tracing::info!(
            league_id,
            player_id = player.id,
            picks = requested,
            banked = ?banked_pick,
            next_pick = advance.draft.current_pick_on_clock,
            "turn committed"
        );
        self.after_turn(&advance, &order);

        Ok(PickOutcome {
            draft: advance.draft,
            allocations,
            banked_pick,
        })
    }

    /// Bank the slot on the clock after its deadline passed.
    ///
    /// Called by the turn timeout handler. Returns `Stale` without touching
    /// anything when the draft moved on, is not running, or the deadline has
    /// not passed yet. The roster floor does not apply.
    pub async fn auto_skip_turn(
        &self,
        league_id: LeagueId,
        expected_pick: Option<PickNumber>,
    ) -> Result<SkipOutcome, DraftError> {
        let lock = self.locks.handle(league_id);
        let _guard = lock.lock().await;

        let Some(draft) = self.drafts.load_draft(league_id).await? else {
            tracing::warn!(league_id, "timeout for a league without a draft");
            return Ok(SkipOutcome::Stale);
        };
        let Some(league) = self.leagues.league(league_id).await? else {
            tracing::warn!(league_id, "timeout for a missing league");
            return Ok(SkipOutcome::Stale);
        };
        if draft.status != DraftStatus::Ongoing || league.status != LeagueStatus::Drafting {
            tracing::warn!(league_id, status = ?draft.status, "stale timeout: draft not ongoing");
            return Ok(SkipOutcome::Stale);
        }
        let current = draft.current_pick_on_clock;
        if expected_pick.is_some_and(|p| p != current) {
            tracing::warn!(league_id, ?expected_pick, current, "stale timeout: pick moved on");
            return Ok(SkipOutcome::Stale);
        }
        let now = self.now_ms();
        if now < draft.turn_deadline_ms() {
            tracing::warn!(
                league_id,
                current,
                deadline_ms = %draft.turn_deadline_ms(),
                "stale timeout: deadline not reached"
            );
            return Ok(SkipOutcome::Stale);
        }
        let Some(player_id) = draft.current_turn_player_id else {
            return Err(DraftError::internal(format!(
                "ongoing draft {league_id} has nobody on the clock"
            )));
        };

        let order = self.leagues.players(league_id).await?;
        let counts = self.pool.allocation_counts(league_id).await?;
        let advance = advance_turn(
            &draft,
            &league,
            &order,
            player_id,
            &BTreeSet::new(),
            Some(current),
            &counts,
            now,
        )?;

        let commit = TurnCommit {
            league_id,
            player_id,
            allocations: Vec::new(),
            consumed_entries: Vec::new(),
            total_cost: 0,
            draft: advance.draft.clone(),
            league: advance.league.clone(),
        };
        self.bounded(self.drafts.commit_turn(commit)).await?;

        self.record(
            league_id,
            "auto_skip",
            Some(format!("player={player_id} pick={current}")),
        );
        tracing::info!(league_id, player_id, pick = current, "turn timed out, pick banked");
        self.notify(league_id, player_id, Notice::PickSkipped { pick: current });
        self.after_turn(&advance, &order);

        Ok(SkipOutcome::Skipped {
            player_id,
            pick_number: current,
            draft: Box::new(advance.draft),
        })
    }

    /// Stop the clock of an ongoing draft.
    pub async fn pause_draft(&self, league_id: LeagueId) -> Result<Draft, DraftError> {
        let lock = self.locks.handle(league_id);
        let _guard = lock.lock().await;

        let mut draft = self.draft(league_id).await?;
        if draft.status != DraftStatus::Ongoing {
            return Err(DraftError::invalid_state(format!(
                "cannot pause a {:?} draft",
                draft.status
            )));
        }
        draft.status = DraftStatus::Paused;
        self.bounded(self.drafts.save_draft(&draft)).await?;

        self.scheduler
            .deregister_task(&TaskKey::turn_timeout(league_id));
        self.record(league_id, "paused", None);
        tracing::info!(league_id, pick = draft.current_pick_on_clock, "draft paused");
        Ok(draft)
    }

    /// Restart a paused draft; the player on the clock gets a full turn.
    pub async fn resume_draft(&self, league_id: LeagueId) -> Result<Draft, DraftError> {
        let lock = self.locks.handle(league_id);
        let _guard = lock.lock().await;

        let mut draft = self.draft(league_id).await?;
        if draft.status != DraftStatus::Paused {
            return Err(DraftError::invalid_state(format!(
                "cannot resume a {:?} draft",
                draft.status
            )));
        }
        draft.status = DraftStatus::Ongoing;
        draft.current_turn_start_ms = self.now_ms();
        self.bounded(self.drafts.save_draft(&draft)).await?;

        self.schedule_turn_timeout(&draft);
        self.notify_on_clock(&draft);
        self.record(league_id, "resumed", None);
        tracing::info!(league_id, pick = draft.current_pick_on_clock, "draft resumed");
        Ok(draft)
    }

    /// Register the timeout for the turn on the clock, replacing any pending
    /// one for the league. Returns the registered task.
    pub fn schedule_turn_timeout(&self, draft: &Draft) -> Option<ScheduledTask> {
        let player_id = draft.current_turn_player_id?;
        let task = ScheduledTask::new(
            draft.turn_deadline_ms(),
            TaskPayload::DraftTurnTimeout {
                league_id: draft.league_id,
                player_id,
                pick_number: draft.current_pick_on_clock,
            },
        );
        self.scheduler.register_task(task.clone());
        Some(task)
    }

    fn after_turn(&self, advance: &Advance, order: &[Player]) {
        let league_id = advance.draft.league_id;
        if !advance.completed() {
            self.schedule_turn_timeout(&advance.draft);
            self.notify_on_clock(&advance.draft);
            return;
        }

        self.scheduler
            .deregister_task(&TaskKey::turn_timeout(league_id));
        if let Some(league) = &advance.league {
            self.schedule_season(league);
        }
        for player in order {
            self.notify(league_id, player.id, Notice::DraftCompleted);
        }
        self.locks.release(league_id);
        self.record(
            league_id,
            "draft_completed",
            Some(format!("picks={}", advance.draft.current_pick_on_clock - 1)),
        );
        tracing::info!(
            league_id,
            picks = advance.draft.current_pick_on_clock - 1,
            "draft completed"
        );
    }

    fn schedule_season(&self, league: &League) {
        if let Some(at) = league.marks.next_transfer_window_at_ms {
            self.scheduler.register_task(ScheduledTask::new(
                at,
                TaskPayload::TransferWindowStart {
                    league_id: league.id,
                },
            ));
        }
        if let Some(at) = league.marks.next_credit_accrual_at_ms {
            self.scheduler.register_task(ScheduledTask::new(
                at,
                TaskPayload::CreditAccrual {
                    league_id: league.id,
                },
            ));
        }
    }

    fn notify_on_clock(&self, draft: &Draft) {
        if let Some(player_id) = draft.current_turn_player_id {
            self.notify(
                draft.league_id,
                player_id,
                Notice::OnTheClock {
                    pick: draft.current_pick_on_clock,
                    round: draft.current_round,
                    deadline_ms: draft.turn_deadline_ms(),
                },
            );
        }
    }

    fn notify(&self, league_id: LeagueId, player_id: PlayerId, notice: Notice) {
        if let Some(mailbox) = &self.mailbox {
            let key = MailboxKey::new(league_id, player_id);
            if let Err(e) = mailbox.deliver(&key, notice) {
                tracing::warn!(%key, "notice delivery failed: {e:#}");
            }
        }
    }

    fn record(&self, league_id: LeagueId, action: &str, detail: Option<String>) {
        if let Some(audit) = &self.audit {
            audit.record(
                AuditEvent::new(league_id, "draft", action, self.now_ms()).with_detail(detail),
            );
        }
    }

    fn now_ms(&self) -> u128 {
        self.scheduler.clock().now_ms()
    }

    async fn bounded<T>(
        &self,
        write: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, DraftError> {
        match tokio::time::timeout(self.config.commit_timeout(), write).await {
            Ok(result) => result.map_err(DraftError::from),
            Err(_) => Err(DraftError::internal(format!(
                "store write timed out after {} ms",
                self.config.commit_timeout_ms
            ))),
        }
    }
}

/// Compute the draft after `acting` finished their turn.
///
/// `counts` are the per-player allocation totals including this turn's
/// picks. On completion the league moves to its post-draft state and, when
/// it has a season calendar, gets its first window and accrual marks.
#[allow(clippy::too_many_arguments)]
fn advance_turn(
    draft: &Draft,
    league: &League,
    order: &[Player],
    acting: PlayerId,
    redeemed: &BTreeSet<PickNumber>,
    banked: Option<PickNumber>,
    counts: &BTreeMap<PlayerId, u32>,
    now: u128,
) -> Result<Advance, DraftError> {
    if !order.iter().any(|p| p.id == acting) {
        return Err(DraftError::internal(format!(
            "player {acting} on the clock is not in the league order"
        )));
    }

    let mut next = draft.clone();
    next.redeem_picks(acting, redeemed);
    if let Some(pick) = banked {
        next.bank_pick(acting, pick);
    }
    next.current_pick_on_clock += 1;

    let format = &league.format;
    let total: u64 = counts.values().map(|&c| u64::from(c)).sum();
    let complete = turn::is_draft_complete(
        total,
        order
            .iter()
            .map(|p| counts.get(&p.id).copied().unwrap_or_default()),
        order.len(),
        format.min_assets_per_player,
        format.max_assets_per_player,
    );

    if complete {
        next.status = DraftStatus::Completed;
        next.completed_at_ms = Some(now);
        next.current_turn_player_id = None;

        let mut league = league.clone();
        league.status = LeagueStatus::RegularSeason;
        if let Some(season) = &format.season {
            league.marks.next_transfer_window_at_ms =
                Some(now + u128::from(season.transfer_window_interval_secs) * 1_000);
            league.marks.next_credit_accrual_at_ms =
                Some(now + u128::from(season.credit_accrual_interval_secs) * 1_000);
        }
        return Ok(Advance {
            draft: next,
            league: Some(league),
        });
    }

    let n = order.len();
    let pick = next.current_pick_on_clock;
    next.current_round = turn::round_for_pick(pick, n);
    next.current_pick_in_round = turn::pick_in_round(pick, n);
    let index = turn::turn_index(pick, n, format.is_snake_order);
    let upcoming = order
        .get(index)
        .ok_or_else(|| DraftError::internal(format!("turn index {index} out of {n} players")))?;
    next.current_turn_player_id = Some(upcoming.id);
    next.current_turn_start_ms = now;

    Ok(Advance {
        draft: next,
        league: None,
    })
}
