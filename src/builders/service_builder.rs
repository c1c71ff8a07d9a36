//! Assemble the scheduler, draft engine and season service.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::core::{AuditSink, InMemoryAuditSink, Scheduler, SchedulerError, Spawn, TaskType};
use crate::draft::{DraftEngine, DraftError, TurnTimeoutHandler};
use crate::infra::mailbox::Mailbox;
use crate::infra::store::{AccessPolicy, DraftRepository, LeagueDirectory, PoolLedger};
use crate::league::{SeasonService, SeasonTaskHandler};
use crate::util::clock::{Clock, SystemClock};

/// Builder for [`DraftService`].
pub struct DraftServiceBuilder {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    leagues: Option<Arc<dyn LeagueDirectory>>,
    pool: Option<Arc<dyn PoolLedger>>,
    drafts: Option<Arc<dyn DraftRepository>>,
    policy: Option<Arc<dyn AccessPolicy>>,
    mailbox: Option<Arc<dyn Mailbox>>,
    audit: Option<Arc<dyn AuditSink>>,
}

impl Default for DraftServiceBuilder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl DraftServiceBuilder {
    /// Start a builder with `config` and the system clock.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            leagues: None,
            pool: None,
            drafts: None,
            policy: None,
            mailbox: None,
            audit: None,
        }
    }

    /// Read time from `clock`.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use one store for every collaborator trait.
    #[must_use]
    pub fn store<S>(mut self, store: Arc<S>) -> Self
    where
        S: LeagueDirectory + PoolLedger + DraftRepository + 'static,
    {
        let leagues: Arc<dyn LeagueDirectory> = store.clone();
        let pool: Arc<dyn PoolLedger> = store.clone();
        let drafts: Arc<dyn DraftRepository> = store;
        self.leagues = Some(leagues);
        self.pool = Some(pool);
        self.drafts = Some(drafts);
        self
    }

    /// League and player lookup.
    #[must_use]
    pub fn leagues(mut self, leagues: Arc<dyn LeagueDirectory>) -> Self {
        self.leagues = Some(leagues);
        self
    }

    /// Pool lookup.
    #[must_use]
    pub fn pool(mut self, pool: Arc<dyn PoolLedger>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Draft persistence.
    #[must_use]
    pub fn drafts(mut self, drafts: Arc<dyn DraftRepository>) -> Self {
        self.drafts = Some(drafts);
        self
    }

    /// Capability check for picks; allow-all when unset.
    #[must_use]
    pub fn policy(mut self, policy: Arc<dyn AccessPolicy>) -> Self {
        self.policy = Some(policy);
        self
    }

    /// Notice mailbox; notices are dropped when unset.
    #[must_use]
    pub fn mailbox(mut self, mailbox: Arc<dyn Mailbox>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    /// Audit sink; a bounded in-memory sink when unset.
    #[must_use]
    pub fn audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Validate the configuration and wire everything together.
    pub fn build(self) -> Result<DraftService, SchedulerError> {
        self.config.validate().map_err(SchedulerError::Config)?;
        let missing = |what: &str| SchedulerError::Config(format!("{what} collaborator not set"));
        let leagues = self.leagues.ok_or_else(|| missing("league directory"))?;
        let pool = self.pool.ok_or_else(|| missing("pool ledger"))?;
        let drafts = self.drafts.ok_or_else(|| missing("draft repository"))?;
        let capacity = self.config.audit_capacity;
        let audit = self.audit.unwrap_or_else(|| -> Arc<dyn AuditSink> {
            Arc::new(InMemoryAuditSink::new(capacity))
        });

        let scheduler = Scheduler::new(self.clock)
            .with_handler_timeout(self.config.handler_timeout())
            .with_audit(audit.clone());

        let mut engine = DraftEngine::new(
            leagues.clone(),
            pool,
            drafts.clone(),
            scheduler.clone(),
            self.config,
        )
        .with_audit(audit.clone());
        let mut season = SeasonService::new(leagues.clone(), scheduler.clone()).with_audit(audit);
        if let Some(policy) = self.policy {
            engine = engine.with_policy(policy);
        }
        if let Some(mailbox) = self.mailbox {
            engine = engine.with_mailbox(mailbox.clone());
            season = season.with_mailbox(mailbox);
        }
        let engine = Arc::new(engine);
        let season = Arc::new(season);

        scheduler.register_handler(
            TaskType::DraftTurnTimeout,
            Arc::new(TurnTimeoutHandler::new(&engine)),
        );
        let season_handler = Arc::new(SeasonTaskHandler::new(&season));
        for task_type in [
            TaskType::TransferWindowStart,
            TaskType::TransferWindowEnd,
            TaskType::CreditAccrual,
        ] {
            scheduler.register_handler(task_type, season_handler.clone());
        }

        Ok(DraftService {
            engine,
            season,
            scheduler,
            leagues,
            drafts,
        })
    }
}

/// Running draft core: engine, season service and their scheduler.
pub struct DraftService {
    engine: Arc<DraftEngine>,
    season: Arc<SeasonService>,
    scheduler: Scheduler,
    leagues: Arc<dyn LeagueDirectory>,
    drafts: Arc<dyn DraftRepository>,
}

impl DraftService {
    /// Draft engine.
    pub const fn engine(&self) -> &Arc<DraftEngine> {
        &self.engine
    }

    /// Season service.
    pub const fn season(&self) -> &Arc<SeasonService> {
        &self.season
    }

    /// Shared scheduler.
    pub const fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Spawn the scheduler loop. Returns `false` if it already runs.
    pub fn start<S: Spawn>(&self, spawner: &S) -> bool {
        self.scheduler.start(spawner)
    }

    /// Rebuild pending tasks from durable state after a restart.
    ///
    /// Registers one turn timeout per ongoing draft (overdue ones fire on
    /// the next pass) and every season task recorded on active leagues.
    /// Returns the number of tasks registered.
    pub async fn reconcile(&self) -> Result<usize, DraftError> {
        let mut registered = 0;
        for draft in self.drafts.ongoing_drafts().await? {
            if self.engine.schedule_turn_timeout(&draft).is_some() {
                registered += 1;
            }
        }
        for league in self.leagues.active_leagues().await? {
            registered += self.season.schedule_from_marks(&league);
        }
        tracing::info!(registered, "scheduler reconciled from store");
        Ok(registered)
    }

    /// Stop the scheduler loop.
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}
