//! Lastseen Core
//!
//! Shared building blocks for the ingestion service and the freshness check:
//! the clock abstraction, the persisted timestamp type and duration parsing.

pub mod config;
pub mod time;

/// Re-export common types
pub use config::{parse_seconds, ConfigError};
pub use time::{MockClock, SystemClock, TimeProvider, Timestamp};
