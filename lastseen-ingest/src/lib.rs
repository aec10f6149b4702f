//! Lastseen Ingestion
//!
//! Records the arrival time of every received event name. Arrivals either go
//! straight to the store (immediate mode) or are staged in an
//! [`ArrivalBuffer`] that the [`CommitScheduler`] flushes periodically
//! (batched mode).

pub mod buffer;
pub mod config;
pub mod receiver;
pub mod scheduler;
pub mod source;

pub use buffer::ArrivalBuffer;
pub use config::{BusConfig, IngestConfig, IngestMode, IMMEDIATE_PRUNE_PERIOD};
pub use receiver::EventReceiver;
pub use scheduler::{CommitScheduler, SchedulerConfig};
pub use source::{IngestError, IngestStats, Ingestor, MessageSource, SourceError};
