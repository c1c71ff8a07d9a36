//! Post-draft season transitions driven by the scheduler.
//!
//! Each transition checks the league's durable marks before acting, so a
//! task that fires twice or late is a no-op.

use std::sync::{Arc, Weak};

use async_trait::async_trait;

use crate::core::{
    AppResult, AuditEvent, AuditSink, ScheduledTask, Scheduler, TaskHandler, TaskPayload,
};
use crate::infra::mailbox::{Mailbox, Notice};
use crate::infra::store::{LeagueDirectory, StoreError};
use crate::league::model::{League, LeagueStatus};
use crate::util::{LeagueId, MailboxKey};

const MS_PER_SEC: u128 = 1_000;

/// Handles transfer windows and credit accrual for leagues in season.
pub struct SeasonService {
    leagues: Arc<dyn LeagueDirectory>,
    scheduler: Scheduler,
    mailbox: Option<Arc<dyn Mailbox>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl SeasonService {
    /// Create a service scheduling on `scheduler`.
    pub fn new(leagues: Arc<dyn LeagueDirectory>, scheduler: Scheduler) -> Self {
        Self {
            leagues,
            scheduler,
            mailbox: None,
            audit: None,
        }
    }

    /// Deliver season notices to `mailbox`.
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

    /// Open the transfer window if it is due. Returns whether it opened.
    pub async fn open_transfer_window(&self, league_id: LeagueId) -> Result<bool, StoreError> {
        let Some(mut league) = self.leagues.league(league_id).await? else {
            return Ok(false);
        };
        let now = self.now_ms();
        let due = league
            .marks
            .next_transfer_window_at_ms
            .is_some_and(|at| at <= now);
        let Some(season) = league.format.season.clone() else {
            return Ok(false);
        };
        if league.status != LeagueStatus::RegularSeason || !due {
            tracing::debug!(league_id, status = ?league.status, "transfer window start skipped");
            return Ok(false);
        }

        let closes_at = now + u128::from(season.transfer_window_length_secs) * MS_PER_SEC;
        league.status = LeagueStatus::TransferWindow;
        league.marks.next_transfer_window_at_ms = None;
        league.marks.transfer_window_closes_at_ms = Some(closes_at);
        self.leagues.save_league(&league).await?;

        self.scheduler.register_task(ScheduledTask::new(
            closes_at,
            TaskPayload::TransferWindowEnd { league_id },
        ));
        self.broadcast(
            league_id,
            &Notice::TransferWindowOpened {
                closes_at_ms: closes_at,
            },
        )
        .await;
        self.record(league_id, "transfer_window_opened");
        tracing::info!(league_id, closes_at_ms = %closes_at, "transfer window opened");
        Ok(true)
    }

    /// Close the transfer window if it is due. Returns whether it closed.
    pub async fn close_transfer_window(&self, league_id: LeagueId) -> Result<bool, StoreError> {
        let Some(mut league) = self.leagues.league(league_id).await? else {
            return Ok(false);
        };
        let now = self.now_ms();
        let due = league
            .marks
            .transfer_window_closes_at_ms
            .is_some_and(|at| at <= now);
        if league.status != LeagueStatus::TransferWindow || !due {
            tracing::debug!(league_id, status = ?league.status, "transfer window end skipped");
            return Ok(false);
        }

        league.status = LeagueStatus::RegularSeason;
        league.marks.transfer_window_closes_at_ms = None;
        let next_start = league
            .format
            .season
            .as_ref()
            .map(|s| now + u128::from(s.transfer_window_interval_secs) * MS_PER_SEC);
        league.marks.next_transfer_window_at_ms = next_start;
        self.leagues.save_league(&league).await?;

        if let Some(at) = next_start {
            self.scheduler.register_task(ScheduledTask::new(
                at,
                TaskPayload::TransferWindowStart { league_id },
            ));
        }
        self.broadcast(league_id, &Notice::TransferWindowClosed).await;
        self.record(league_id, "transfer_window_closed");
        tracing::info!(league_id, "transfer window closed");
        Ok(true)
    }

    /// Credit every player if an accrual is due. Returns players credited.
    pub async fn accrue_credits(&self, league_id: LeagueId) -> Result<usize, StoreError> {
        let Some(league) = self.leagues.league(league_id).await? else {
            return Ok(0);
        };
        let now = self.now_ms();
        let due = league
            .marks
            .next_credit_accrual_at_ms
            .is_some_and(|at| at <= now);
        let Some(season) = league.format.season.clone() else {
            return Ok(0);
        };
        if !league.status.in_season() || !due {
            tracing::debug!(league_id, status = ?league.status, "credit accrual skipped");
            return Ok(0);
        }

        let next = now + u128::from(season.credit_accrual_interval_secs) * MS_PER_SEC;
        let credited = self
            .leagues
            .credit_players(league_id, season.credit_accrual_amount, next)
            .await?;

        self.scheduler.register_task(ScheduledTask::new(
            next,
            TaskPayload::CreditAccrual { league_id },
        ));
        self.broadcast(
            league_id,
            &Notice::CreditsAccrued {
                amount: season.credit_accrual_amount,
            },
        )
        .await;
        self.record(league_id, "credits_accrued");
        tracing::info!(
            league_id,
            credited,
            amount = season.credit_accrual_amount,
            "credits accrued"
        );
        Ok(credited)
    }

    /// Register the season tasks recorded in a league's marks. Returns the
    /// number registered.
    pub fn schedule_from_marks(&self, league: &League) -> usize {
        let marks = &league.marks;
        let league_id = league.id;
        let tasks = [
            marks
                .next_transfer_window_at_ms
                .map(|at| ScheduledTask::new(at, TaskPayload::TransferWindowStart { league_id })),
            marks
                .transfer_window_closes_at_ms
                .map(|at| ScheduledTask::new(at, TaskPayload::TransferWindowEnd { league_id })),
            marks
                .next_credit_accrual_at_ms
                .map(|at| ScheduledTask::new(at, TaskPayload::CreditAccrual { league_id })),
        ];
        let mut registered = 0;
        for task in tasks.into_iter().flatten() {
            self.scheduler.register_task(task);
            registered += 1;
        }
        registered
    }

    async fn broadcast(&self, league_id: LeagueId, notice: &Notice) {
        let Some(mailbox) = &self.mailbox else {
            return;
        };
        let players = match self.leagues.players(league_id).await {
            Ok(players) => players,
            Err(e) => {
                tracing::warn!(league_id, "cannot list players for notices: {e}");
                return;
            }
        };
        for player in players {
            let key = MailboxKey::new(league_id, player.id);
            if let Err(e) = mailbox.deliver(&key, notice.clone()) {
                tracing::warn!(%key, "notice delivery failed: {e:#}");
            }
        }
    }

    fn record(&self, league_id: LeagueId, action: &str) {
        if let Some(audit) = &self.audit {
            audit.record(AuditEvent::new(league_id, "season", action, self.now_ms()));
        }
    }

    fn now_ms(&self) -> u128 {
        self.scheduler.clock().now_ms()
    }
}

/// Handler for `TransferWindowStart`, `TransferWindowEnd` and
/// `CreditAccrual` tasks.
pub struct SeasonTaskHandler {
    service: Weak<SeasonService>,
}

impl SeasonTaskHandler {
    /// Handler bound to `service`.
    pub fn new(service: &Arc<SeasonService>) -> Self {
        Self {
            service: Arc::downgrade(service),
        }
    }
}

#[async_trait]
impl TaskHandler for SeasonTaskHandler {
    async fn handle(&self, task: &ScheduledTask) -> AppResult<()> {
        let Some(service) = self.service.upgrade() else {
            tracing::warn!(key = %task.key, "season service dropped; task ignored");
            return Ok(());
        };
        match task.payload {
            TaskPayload::TransferWindowStart { league_id } => {
                service.open_transfer_window(league_id).await?;
            }
            TaskPayload::TransferWindowEnd { league_id } => {
                service.close_transfer_window(league_id).await?;
            }
            TaskPayload::CreditAccrual { league_id } => {
                service.accrue_credits(league_id).await?;
            }
            TaskPayload::DraftTurnTimeout { .. } => {
                anyhow::bail!("{} is not a season task", task.key);
            }
        }
        Ok(())
    }
}
