//! Ingest loop
//!
//! Connects a [`MessageSource`] to the receiver and the commit scheduler.
//! The source is abstract so the whole pipeline runs in tests without a
//! broker.

use crate::{ArrivalBuffer, CommitScheduler, EventReceiver, IngestMode, SchedulerConfig};
use async_trait::async_trait;
use lastseen_core::TimeProvider;
use lastseen_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Error from a message source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("source closed: {0}")]
    Closed(String),
}

/// Ingestion error types
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("message source error: {0}")]
    Source(#[from] SourceError),

    #[error("receive task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Anything that yields the names of received events
#[async_trait]
pub trait MessageSource: Send {
    /// Wait for the next event and return its name; `None` once the source
    /// has ended.
    async fn next_topic(&mut self) -> Result<Option<String>, SourceError>;
}

/// Counters for one ingest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub received: u64,
    pub failed: u64,
}

/// Receiver plus scheduler for one store
pub struct Ingestor {
    receiver: EventReceiver,
    scheduler: Arc<CommitScheduler>,
}

impl Ingestor {
    /// Wire up the receive path and the scheduler for `mode`.
    ///
    /// In batched mode the buffer is seeded with the last committed arrival
    /// of every known name. In immediate mode the scheduler gets a buffer
    /// nothing writes to and only prunes.
    pub fn new(
        store: Arc<Store>,
        mode: IngestMode,
        retention: Duration,
        clock: Arc<dyn TimeProvider>,
    ) -> Result<Self, StoreError> {
        let buffer = Arc::new(ArrivalBuffer::new());

        let receiver = match mode {
            IngestMode::Immediate => EventReceiver::immediate(store.clone(), clock.clone()),
            IngestMode::Batched { .. } => {
                let known = store.last_seen_all()?;
                info!(names = known.len(), "Seeded arrival buffer from store");
                buffer.seed(known);
                EventReceiver::batched(buffer.clone(), clock.clone())
            }
        };

        let scheduler = Arc::new(CommitScheduler::new(
            store,
            buffer,
            clock,
            SchedulerConfig {
                period: mode.scheduler_period(),
                retention,
            },
        ));

        Ok(Self {
            receiver,
            scheduler,
        })
    }

    pub fn receiver(&self) -> &EventReceiver {
        &self.receiver
    }

    pub fn scheduler(&self) -> &Arc<CommitScheduler> {
        &self.scheduler
    }

    /// Consume events until the source ends.
    ///
    /// Store failures on the receive path are logged and counted; the loop
    /// keeps going. When the source ends, whatever is still staged gets one
    /// final commit.
    pub async fn run<S: MessageSource + ?Sized>(
        &self,
        source: &mut S,
    ) -> Result<IngestStats, IngestError> {
        let scheduler_task = Arc::clone(&self.scheduler).spawn();
        let mut stats = IngestStats::default();

        let outcome = loop {
            let topic = match source.next_topic().await {
                Ok(Some(topic)) => topic,
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            };

            stats.received += 1;
            if let Err(e) = self.dispatch(topic.clone()).await {
                stats.failed += 1;
                error!(topic = %topic, error = %e, "Failed to record arrival");
            }
        };

        scheduler_task.abort();
        let scheduler = Arc::clone(&self.scheduler);
        match tokio::task::spawn_blocking(move || scheduler.tick()).await {
            Ok(Ok(_)) => {}
            Ok(Err(_)) => warn!("Final commit failed"),
            Err(e) => error!(error = %e, "Final commit task panicked"),
        }

        info!(received = stats.received, failed = stats.failed, "Ingest loop stopped");
        outcome?;
        Ok(stats)
    }

    async fn dispatch(&self, topic: String) -> Result<(), IngestError> {
        if self.receiver.is_immediate() {
            let receiver = self.receiver.clone();
            tokio::task::spawn_blocking(move || receiver.on_event(&topic)).await??;
        } else {
            self.receiver.on_event(&topic)?;
        }
        Ok(())
    }
}
