//! Event Receiver
//!
//! Called once per inbound event. The mode is fixed when the receiver is
//! built: immediate receivers write straight to the store, batched receivers
//! only touch the arrival buffer.

use crate::ArrivalBuffer;
use lastseen_core::TimeProvider;
use lastseen_store::{Store, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Records that an event with a given name arrived now
#[derive(Clone)]
pub enum EventReceiver {
    /// One store transaction per event, durable on return
    Immediate {
        store: Arc<Store>,
        clock: Arc<dyn TimeProvider>,
    },

    /// Stage into the shared buffer; the commit scheduler persists it later
    Batched {
        buffer: Arc<ArrivalBuffer>,
        clock: Arc<dyn TimeProvider>,
    },
}

impl EventReceiver {
    pub fn immediate(store: Arc<Store>, clock: Arc<dyn TimeProvider>) -> Self {
        EventReceiver::Immediate { store, clock }
    }

    pub fn batched(buffer: Arc<ArrivalBuffer>, clock: Arc<dyn TimeProvider>) -> Self {
        EventReceiver::Batched { buffer, clock }
    }

    /// Record one arrival of `name`, stamped with the current time.
    ///
    /// Names are not validated. Returns the interval since the previous
    /// arrival of the same name, if one is known. Only immediate mode can
    /// fail, and only with a storage error.
    pub fn on_event(&self, name: &str) -> Result<Option<Duration>, StoreError> {
        match self {
            EventReceiver::Immediate { store, clock } => {
                let at = clock.now();
                let interval = store.record_arrival(name, at)?;
                debug!(topic = name, at = %at, ?interval, "Committed arrival");
                Ok(interval)
            }
            EventReceiver::Batched { buffer, clock } => {
                let at = clock.now();
                let interval = buffer.stage(name, at);
                debug!(topic = name, at = %at, ?interval, "Staged arrival");
                Ok(interval)
            }
        }
    }

    pub fn is_immediate(&self) -> bool {
        matches!(self, EventReceiver::Immediate { .. })
    }
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventReceiver::Immediate { store, .. } => f
                .debug_struct("Immediate")
                .field("store", &store.path())
                .finish(),
            EventReceiver::Batched { buffer, .. } => f
                .debug_struct("Batched")
                .field("staged", &buffer.len())
                .finish(),
        }
    }
}
