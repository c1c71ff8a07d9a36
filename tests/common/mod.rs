//! Shared league fixture for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use pokedraft_core::builders::{DraftService, DraftServiceBuilder};
use pokedraft_core::config::EngineConfig;
use pokedraft_core::core::InMemoryAuditSink;
use pokedraft_core::draft::{Draft, DraftEngine, PickRequest};
use pokedraft_core::infra::{InMemoryLeagueStore, InMemoryMailbox};
use pokedraft_core::league::{
    League, LeagueFormat, LeagueStatus, Player, PoolEntry, SeasonCalendar, SeasonMarks,
};
use pokedraft_core::util::clock::ManualClock;
use pokedraft_core::util::{LeagueId, MailboxKey, PickNumber, PlayerId, PoolEntryId, UserId};

pub const LEAGUE: LeagueId = 1;
pub const START_MS: u64 = 1_000_000;
pub const FIRST_ENTRY: PoolEntryId = 1_000;

/// League shape for a fixture.
#[derive(Debug, Clone)]
pub struct Setup {
    pub players: i64,
    pub snake: bool,
    pub min: u32,
    pub max: u32,
    pub budget: u32,
    pub pool_size: i64,
    pub cost: u32,
    pub season: Option<SeasonCalendar>,
    pub config: EngineConfig,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            players: 4,
            snake: true,
            min: 1,
            max: 2,
            budget: 100,
            pool_size: 20,
            cost: 10,
            season: None,
            config: EngineConfig {
                default_turn_time_limit_minutes: 3,
                ..EngineConfig::default()
            },
        }
    }
}

pub struct Fixture {
    pub store: Arc<InMemoryLeagueStore>,
    pub clock: Arc<ManualClock>,
    pub mailbox: Arc<InMemoryMailbox>,
    pub audit: Arc<InMemoryAuditSink>,
    pub service: DraftService,
}

impl Fixture {
    pub fn new(setup: Setup) -> Self {
        let store = Arc::new(InMemoryLeagueStore::new());
        store.insert_league(League {
            id: LEAGUE,
            status: LeagueStatus::Setup,
            format: LeagueFormat {
                is_snake_order: setup.snake,
                min_assets_per_player: setup.min,
                max_assets_per_player: setup.max,
                season: setup.season.clone(),
            },
            marks: SeasonMarks::default(),
        });
        for id in 1..=setup.players {
            store.add_player(Player {
                id,
                user_id: user_of(id),
                league_id: LEAGUE,
                budget: setup.budget,
                asset_count: 0,
            });
        }
        for k in 0..setup.pool_size {
            store.add_pool_entry(PoolEntry {
                id: FIRST_ENTRY + k,
                league_id: LEAGUE,
                species: format!("species-{k}"),
                cost: setup.cost,
                is_available: true,
            });
        }
        Self::with_store(store, setup.config)
    }

    pub fn with_store(store: Arc<InMemoryLeagueStore>, config: EngineConfig) -> Self {
        pokedraft_core::util::init_tracing();
        let clock = Arc::new(ManualClock::new(START_MS));
        let mailbox = Arc::new(InMemoryMailbox::new());
        let audit = Arc::new(InMemoryAuditSink::new(1_000));
        let service = DraftServiceBuilder::new(config)
            .clock(clock.clone())
            .store(store.clone())
            .mailbox(mailbox.clone())
            .audit(audit.clone())
            .build()
            .expect("service builds");
        Self {
            store,
            clock,
            mailbox,
            audit,
            service,
        }
    }

    pub fn engine(&self) -> &DraftEngine {
        self.service.engine()
    }

    pub async fn start(&self) -> Draft {
        self.engine().start_draft(LEAGUE, 0).await.expect("draft starts")
    }

    pub async fn draft(&self) -> Draft {
        self.engine().draft(LEAGUE).await.expect("draft exists")
    }

    /// The player on the clock picks `entry` with the current pick.
    pub async fn pick_current(&self, entry: PoolEntryId) -> Draft {
        let draft = self.draft().await;
        let player = draft.current_turn_player_id.expect("someone on the clock");
        self.engine()
            .make_pick(
                user_of(player),
                LEAGUE,
                PickRequest::single(entry, draft.current_pick_on_clock),
            )
            .await
            .expect("pick accepted")
            .draft
    }

    /// The player on the clock skips explicitly.
    pub async fn skip_current(&self) -> Draft {
        let draft = self.draft().await;
        let player = draft.current_turn_player_id.expect("someone on the clock");
        self.engine()
            .make_pick(user_of(player), LEAGUE, PickRequest::skip())
            .await
            .expect("skip accepted")
            .draft
    }

    /// Every consumed pick number is held exactly once, either by a
    /// committed allocation or as a banked pick.
    pub async fn assert_conserved(&self) {
        let draft = self.draft().await;
        let mut held: Vec<PickNumber> = self
            .store
            .allocations(LEAGUE)
            .iter()
            .map(|a| a.pick_number)
            .chain(
                draft
                    .players_with_accumulated_picks
                    .values()
                    .flat_map(|picks| picks.iter().copied()),
            )
            .collect();
        held.sort_unstable();
        let consumed: Vec<PickNumber> = (1..draft.current_pick_on_clock).collect();
        assert_eq!(
            held, consumed,
            "allocated and banked pick numbers vs picks before {}",
            draft.current_pick_on_clock
        );
    }

    pub fn inbox(&self, player: PlayerId) -> MailboxKey {
        MailboxKey::new(LEAGUE, player)
    }
}

pub const fn user_of(player: PlayerId) -> UserId {
    100 + player
}
