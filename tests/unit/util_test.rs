//! Tests for shared utilities

use pokedraft_core::util::clock::{now_ms, Clock, ManualClock, SystemClock};
use pokedraft_core::util::MailboxKey;

#[test]
fn test_system_clock_tracks_wall_time() {
    let before = now_ms();
    let observed = SystemClock.now_ms();
    assert!(observed >= before);
}

#[test]
fn test_manual_clock_minutes() {
    let clock = ManualClock::new(0);
    clock.advance_minutes(2);
    assert_eq!(clock.now_ms(), 120_000);
    clock.set_ms(5);
    assert_eq!(clock.now_ms(), 5);
}

#[test]
fn test_mailbox_key_display() {
    assert_eq!(MailboxKey::new(3, 42).to_string(), "3/42");
}

#[test]
fn test_init_tracing_is_idempotent() {
    pokedraft_core::util::init_tracing();
    pokedraft_core::util::init_tracing();
    assert!(tracing::dispatcher::has_been_set());
}
