//! Builders that wire the scheduler, engine and season service together.

pub mod service_builder;

pub use service_builder::{DraftService, DraftServiceBuilder};
