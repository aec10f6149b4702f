//! Commit Scheduler
//!
//! Periodically drains the arrival buffer into the store and applies the
//! receive-log retention policy. One tick is `drain -> apply -> prune`, run
//! as a single store transaction.
//!
//! A tick whose transaction fails drops what it drained. The data is not
//! re-buffered, which keeps the buffer bounded at one window's worth of
//! arrivals.

use crate::ArrivalBuffer;
use lastseen_core::TimeProvider;
use lastseen_store::{FlushStats, Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Scheduler configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Time between ticks; must be non-zero
    pub period: Duration,

    /// Receive-log rows older than this are pruned on every tick
    pub retention: Duration,
}

/// Drives buffer flushes and retention pruning
pub struct CommitScheduler {
    store: Arc<Store>,
    buffer: Arc<ArrivalBuffer>,
    clock: Arc<dyn TimeProvider>,
    config: SchedulerConfig,
}

impl CommitScheduler {
    pub fn new(
        store: Arc<Store>,
        buffer: Arc<ArrivalBuffer>,
        clock: Arc<dyn TimeProvider>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            buffer,
            clock,
            config,
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    /// Run one drain/apply/prune cycle synchronously.
    ///
    /// On failure the drained arrivals are lost and the error is returned
    /// after being logged.
    pub fn tick(&self) -> Result<FlushStats, StoreError> {
        let now = self.clock.now();
        let prune_before = now.saturating_sub(self.config.retention);
        let updates = self.buffer.drain();

        let result = if updates.is_empty() {
            self.store
                .prune_receive_log(prune_before)
                .map(|pruned| FlushStats {
                    pruned,
                    ..FlushStats::default()
                })
        } else {
            self.store.apply_batch(&updates, prune_before)
        };

        match &result {
            Ok(stats) => {
                debug!(
                    names = stats.names,
                    arrivals = stats.arrivals,
                    pruned = stats.pruned,
                    "Commit tick complete"
                );
            }
            Err(e) => {
                let dropped: usize = updates.iter().map(|u| u.arrivals.len()).sum();
                error!(
                    error = %e,
                    dropped_names = updates.len(),
                    dropped_arrivals = dropped,
                    "Commit tick failed, staged arrivals dropped"
                );
            }
        }

        result
    }

    /// Tick forever on the configured period.
    ///
    /// The first tick fires one full period after start. Each tick runs on
    /// the blocking pool so the store transaction never stalls the runtime.
    pub async fn run(self: Arc<Self>) {
        info!(
            period_ms = self.config.period.as_millis() as u64,
            retention_secs = self.config.retention.as_secs(),
            "Commit scheduler started"
        );

        let start = tokio::time::Instant::now() + self.config.period;
        let mut interval = tokio::time::interval_at(start, self.config.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let scheduler = Arc::clone(&self);
            if let Err(e) = tokio::task::spawn_blocking(move || scheduler.tick()).await {
                error!(error = %e, "Commit tick task panicked");
            }
        }
    }

    /// Spawn [`run`](Self::run) onto the current runtime
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
