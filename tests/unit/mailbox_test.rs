//! Tests for mailbox implementations

use pokedraft_core::infra::mailbox::{InMemoryMailbox, Mailbox, Notice};
use pokedraft_core::runtime::api::poll_notices;
use pokedraft_core::util::MailboxKey;

#[test]
fn test_in_memory_mailbox_deliver_fetch() {
    let mailbox = InMemoryMailbox::new();
    let key = MailboxKey::new(1, 10);

    mailbox
        .deliver(
            &key,
            Notice::OnTheClock {
                pick: 1,
                round: 1,
                deadline_ms: 60_000,
            },
        )
        .unwrap();
    mailbox.deliver(&key, Notice::PickSkipped { pick: 1 }).unwrap();

    let messages = mailbox.fetch(&key, None, 10);
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].notice, Notice::PickSkipped { pick: 1 });

    let polled = poll_notices(&mailbox, &key, None, 1);
    assert_eq!(polled.len(), 1);
    let next = poll_notices(&mailbox, &key, Some(polled[0].seq), 10);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].notice, Notice::PickSkipped { pick: 1 });
}

#[test]
fn test_notice_wire_format() {
    let json = serde_json::to_value(Notice::CreditsAccrued { amount: 4 }).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "credits_accrued", "amount": 4}));
}
