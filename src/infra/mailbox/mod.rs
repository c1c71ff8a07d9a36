//! Per-player notice mailboxes.
//!
//! Clients poll their `(league, player)` inbox; nothing is pushed.

use serde::{Deserialize, Serialize};

use crate::core::AppResult;
use crate::util::{MailboxKey, PickNumber};

pub mod memory;

pub use memory::InMemoryMailbox;

/// Something a player should know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// The recipient holds the pick on the clock.
    OnTheClock {
        /// Pick on the clock.
        pick: PickNumber,
        /// Its round.
        round: u32,
        /// When the turn times out.
        deadline_ms: u128,
    },
    /// The recipient's slot was banked by a timeout.
    PickSkipped {
        /// Banked pick.
        pick: PickNumber,
    },
    /// The draft is over.
    DraftCompleted,
    /// Transfers are open.
    TransferWindowOpened {
        /// When the window closes.
        closes_at_ms: u128,
    },
    /// Transfers are closed.
    TransferWindowClosed,
    /// Budget credited.
    CreditsAccrued {
        /// Points added.
        amount: u32,
    },
}

/// Mailbox abstraction for notice delivery.
pub trait Mailbox: Send + Sync {
    /// Deliver a notice to one inbox.
    fn deliver(&self, key: &MailboxKey, notice: Notice) -> AppResult<()>;
}
