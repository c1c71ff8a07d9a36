//! Tests for audit sink

use pokedraft_core::core::{AuditEvent, AuditSink, InMemoryAuditSink};

#[test]
fn test_in_memory_audit_sink() {
    let sink = InMemoryAuditSink::new(10);

    sink.record(AuditEvent::new(1, "draft", "pick", 5).with_detail(Some("player=4".into())));
    sink.record(AuditEvent::new(2, "draft_turn_timeout:2", "register", 6));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].league_id, 1);
    assert_eq!(events[0].subject, "draft");
    assert_eq!(events[0].detail.as_deref(), Some("player=4"));
    assert_eq!(sink.actions_for(2), vec!["register"]);
    assert_eq!(sink.for_league(2)[0].at_ms, 6);
}

#[test]
fn test_audit_sink_overflow() {
    let sink = InMemoryAuditSink::new(2);

    sink.record(AuditEvent::new(1, "draft", "draft_started", 1));
    sink.record(AuditEvent::new(1, "draft", "pick", 2));
    sink.record(AuditEvent::new(1, "draft", "skip", 3));

    // Oldest event dropped.
    assert_eq!(sink.actions_for(1), vec!["pick", "skip"]);
    assert_eq!(sink.len(), 2);
}

#[test]
fn test_zero_capacity_sink_keeps_nothing() {
    let sink = InMemoryAuditSink::new(0);
    sink.record(AuditEvent::new(1, "season", "credits_accrued", 1));
    assert!(sink.is_empty());
}

#[test]
fn test_event_ids_and_wire_format() {
    let event = AuditEvent::new(7, "season", "credits_accrued", 42);
    assert_eq!(event.event_id.len(), 36);
    assert_ne!(
        event.event_id,
        AuditEvent::new(7, "season", "credits_accrued", 42).event_id
    );

    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["action"], "credits_accrued");
    assert_eq!(json["at_ms"], 42);
    assert!(json.get("detail").is_none());
}
