//! Tests for engine configuration

use std::time::Duration;

use pokedraft_core::config::EngineConfig;

#[test]
fn test_from_json_fills_defaults() {
    let cfg = EngineConfig::from_json_str(r#"{"default_turn_time_limit_minutes": 2}"#).unwrap();
    assert_eq!(cfg.default_turn_time_limit_minutes, 2);
    assert_eq!(cfg.commit_timeout(), Duration::from_secs(5));
    assert_eq!(cfg.handler_timeout(), Duration::from_secs(30));
}

#[test]
fn test_from_json_rejects_invalid_values() {
    let err = EngineConfig::from_json_str(r#"{"commit_timeout_ms": 0}"#).unwrap_err();
    assert!(err.contains("commit_timeout_ms"));

    let err = EngineConfig::from_json_str(r#"{"commit_timeout_ms": 40000}"#).unwrap_err();
    assert!(err.contains("handler_timeout_ms"));

    let err = EngineConfig::from_json_str("not json").unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_zero_default_turn_limit_invalid() {
    let cfg = EngineConfig {
        default_turn_time_limit_minutes: 0,
        ..EngineConfig::default()
    };
    assert!(cfg.validate().is_err());
}
