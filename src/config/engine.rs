//! Engine and scheduler timing configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Env var for [`EngineConfig::default_turn_time_limit_minutes`].
pub const ENV_DEFAULT_TURN_MINUTES: &str = "DRAFT_DEFAULT_TURN_MINUTES";
/// Env var for [`EngineConfig::commit_timeout_ms`].
pub const ENV_COMMIT_TIMEOUT_MS: &str = "DRAFT_COMMIT_TIMEOUT_MS";
/// Env var for [`EngineConfig::handler_timeout_ms`].
pub const ENV_HANDLER_TIMEOUT_MS: &str = "DRAFT_HANDLER_TIMEOUT_MS";
/// Env var for [`EngineConfig::audit_capacity`].
pub const ENV_AUDIT_CAPACITY: &str = "DRAFT_AUDIT_CAPACITY";

/// Draft engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Turn limit used when a draft is started with a limit of zero.
    pub default_turn_time_limit_minutes: u32,
    /// Upper bound on one turn commit.
    pub commit_timeout_ms: u64,
    /// Upper bound on one scheduler handler invocation.
    pub handler_timeout_ms: u64,
    /// Events kept by the in-memory audit sink.
    pub audit_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_turn_time_limit_minutes: 60,
            commit_timeout_ms: 5_000,
            handler_timeout_ms: 30_000,
            audit_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.default_turn_time_limit_minutes == 0 {
            return Err("default_turn_time_limit_minutes must be greater than 0".into());
        }
        if self.commit_timeout_ms == 0 {
            return Err("commit_timeout_ms must be greater than 0".into());
        }
        if self.handler_timeout_ms <= self.commit_timeout_ms {
            return Err("handler_timeout_ms must exceed commit_timeout_ms".into());
        }
        if self.audit_capacity == 0 {
            return Err("audit_capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate. Missing fields
    /// take their defaults.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load overrides from the process environment, reading `.env` first
    /// when present.
    pub fn from_env() -> Result<Self, String> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup; unset variables keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(v) = parse_var(&lookup, ENV_DEFAULT_TURN_MINUTES)? {
            cfg.default_turn_time_limit_minutes = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_COMMIT_TIMEOUT_MS)? {
            cfg.commit_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_HANDLER_TIMEOUT_MS)? {
            cfg.handler_timeout_ms = v;
        }
        if let Some(v) = parse_var(&lookup, ENV_AUDIT_CAPACITY)? {
            cfg.audit_capacity = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Commit bound as a duration.
    pub const fn commit_timeout(&self) -> Duration {
        Duration::from_millis(self.commit_timeout_ms)
    }

    /// Handler bound as a duration.
    pub const fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, String>
where
    T::Err: std::fmt::Display,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| format!("{name}: invalid value `{raw}`: {e}"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides() {
        let cfg = EngineConfig::from_lookup(|name| match name {
            ENV_DEFAULT_TURN_MINUTES => Some("5".into()),
            ENV_COMMIT_TIMEOUT_MS => Some(" 250 ".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(cfg.default_turn_time_limit_minutes, 5);
        assert_eq!(cfg.commit_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.handler_timeout_ms, 30_000);
    }

    #[test]
    fn test_lookup_rejects_garbage() {
        let err = EngineConfig::from_lookup(|name| {
            (name == ENV_AUDIT_CAPACITY).then(|| "lots".to_string())
        })
        .unwrap_err();
        assert!(err.contains(ENV_AUDIT_CAPACITY));
    }
}
