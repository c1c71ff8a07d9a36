//! In-memory mailbox backend.

use std::collections::HashMap;

use parking_lot::Mutex;

use super::{Mailbox, Notice};
use crate::core::AppResult;
use crate::util::clock::now_ms;
use crate::util::MailboxKey;

/// A delivered notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailboxMessage {
    /// Mailbox-wide delivery sequence, usable as a poll cursor.
    pub seq: u64,
    /// The notice.
    pub notice: Notice,
    /// Wall-clock delivery time in milliseconds.
    pub delivered_at_ms: u128,
}

#[derive(Default)]
struct Inboxes {
    next_seq: u64,
    by_key: HashMap<MailboxKey, Vec<MailboxMessage>>,
}

/// Per-player inboxes held in memory.
#[derive(Default)]
pub struct InMemoryMailbox {
    inner: Mutex<Inboxes>,
}

impl InMemoryMailbox {
    /// Empty mailbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Up to `limit` messages for `key` delivered after sequence `after`,
    /// oldest first. `None` reads from the start.
    pub fn fetch(
        &self,
        key: &MailboxKey,
        after: Option<u64>,
        limit: usize,
    ) -> Vec<MailboxMessage> {
        let inner = self.inner.lock();
        let Some(inbox) = inner.by_key.get(key) else {
            return Vec::new();
        };
        // Sequences increase monotonically within an inbox.
        let start = after.map_or(0, |seq| inbox.partition_point(|m| m.seq <= seq));
        inbox[start..].iter().take(limit).cloned().collect()
    }

    /// Every notice delivered to `key`, oldest first.
    pub fn notices(&self, key: &MailboxKey) -> Vec<Notice> {
        self.fetch(key, None, usize::MAX)
            .into_iter()
            .map(|m| m.notice)
            .collect()
    }

    /// Total messages across all inboxes.
    pub fn len(&self) -> usize {
        self.inner.lock().by_key.values().map(Vec::len).sum()
    }

    /// Whether nothing has been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Mailbox for InMemoryMailbox {
    fn deliver(&self, key: &MailboxKey, notice: Notice) -> AppResult<()> {
        let mut inner = self.inner.lock();
        inner.next_seq += 1;
        let seq = inner.next_seq;
        inner.by_key.entry(*key).or_default().push(MailboxMessage {
            seq,
            notice,
            delivered_at_ms: now_ms(),
        });
        Ok(())
    }
}
