//! Shared identifier types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// League identifier. A league owns exactly one draft.
pub type LeagueId = i64;
/// Player identifier (a user's seat inside one league).
pub type PlayerId = i64;
/// Authenticated user identifier supplied by the identity layer.
pub type UserId = i64;
/// Draft pool entry identifier.
pub type PoolEntryId = i64;
/// Global pick counter value, starting at 1.
pub type PickNumber = u32;

/// Mailbox routing key: one inbox per player per league.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MailboxKey {
    /// League the notice belongs to.
    pub league_id: LeagueId,
    /// Recipient player.
    pub player_id: PlayerId,
}

impl MailboxKey {
    /// Build a key for a player in a league.
    pub const fn new(league_id: LeagueId, player_id: PlayerId) -> Self {
        Self {
            league_id,
            player_id,
        }
    }
}

impl fmt::Display for MailboxKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.league_id, self.player_id)
    }
}
