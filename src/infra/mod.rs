//! Infrastructure adapters for stores and mailboxes.

pub mod mailbox;
pub mod store;

pub use mailbox::{InMemoryMailbox, Mailbox, Notice};
pub use store::{
    AccessPolicy, AllowAll, DraftRepository, InMemoryLeagueStore, LeagueDirectory, PoolLedger,
    StoreError, TurnCommit,
};
