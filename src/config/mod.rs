//! Configuration models for the draft engine and scheduler.

pub mod engine;

pub use engine::EngineConfig;
