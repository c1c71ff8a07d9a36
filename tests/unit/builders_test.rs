//! Tests for builder modules

use std::sync::Arc;

use pokedraft_core::builders::DraftServiceBuilder;
use pokedraft_core::config::EngineConfig;
use pokedraft_core::core::SchedulerError;
use pokedraft_core::infra::InMemoryLeagueStore;

#[test]
fn test_build_requires_collaborators() {
    let err = DraftServiceBuilder::default().build().err().unwrap();
    assert!(matches!(err, SchedulerError::Config(msg) if msg.contains("league directory")));
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = EngineConfig {
        audit_capacity: 0,
        ..EngineConfig::default()
    };
    let err = DraftServiceBuilder::new(cfg)
        .store(Arc::new(InMemoryLeagueStore::new()))
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, SchedulerError::Config(_)));
}

#[test]
fn test_build_wires_empty_scheduler() {
    let service = DraftServiceBuilder::default()
        .store(Arc::new(InMemoryLeagueStore::new()))
        .build()
        .unwrap();
    assert!(service.scheduler().is_empty());
    assert!(!service.scheduler().is_running());
}
