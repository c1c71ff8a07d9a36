//! # pokedraft_core
//!
//! Draft turn engine and time-based task scheduler for points-budget fantasy
//! drafts.
//!
//! Players take turns drafting species from a shared pool. A turn may redeem
//! the pick on the clock, redeem picks banked on earlier skipped turns, or
//! skip. Every turn change registers a timeout with the [`core::Scheduler`];
//! when it fires the turn is skipped automatically and the draft moves on.
//! After the draft the same scheduler drives transfer windows and credit
//! accrual.
//!
//! ## Key pieces
//!
//! - **Task heap and scheduler** (`core`): min-heap keyed by fire time with
//!   replace/remove by key, and a tokio loop that sleeps until the earliest
//!   task or until woken by a nearer registration.
//! - **Draft engine** (`draft`): validates a whole pick batch, commits it in
//!   one transaction, advances the turn (snake or linear) and reschedules.
//! - **Season service** (`league`): transfer window open/close and credit
//!   accrual handlers.
//! - **Collaborators** (`infra`): store traits with an in-memory
//!   transactional implementation, plus the notice mailbox.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pokedraft_core::builders::DraftServiceBuilder;
//! use pokedraft_core::config::EngineConfig;
//! use pokedraft_core::infra::InMemoryLeagueStore;
//! use pokedraft_core::runtime::TokioSpawner;
//!
//! let store = Arc::new(InMemoryLeagueStore::new());
//! let service = DraftServiceBuilder::new(EngineConfig::from_env()?)
//!     .store(store)
//!     .build()?;
//! service.reconcile().await?;
//! service.start(&TokioSpawner::current());
//!
//! let draft = service.engine().start_draft(league_id, 0).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders wiring the scheduler, engine and season service.
pub mod builders;
/// Engine configuration.
pub mod config;
/// Task model, task heap, scheduler and audit.
pub mod core;
/// Draft turn engine.
pub mod draft;
/// Store and mailbox adapters.
pub mod infra;
/// League records and season transitions.
pub mod league;
/// Runtime adapters and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
