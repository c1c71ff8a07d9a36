//! Draft turn engine: state, arithmetic, errors and timeout handling.

pub mod engine;
pub mod error;
pub mod locks;
pub mod model;
pub mod timeout;
pub mod turn;

pub use engine::DraftEngine;
pub use error::{DraftError, ErrorKind};
pub use locks::LeagueLocks;
pub use model::{
    AccumulatedPicks, Allocation, Draft, DraftStatus, PickOutcome, PickRequest, RequestedPick,
    SkipOutcome,
};
pub use timeout::TurnTimeoutHandler;
