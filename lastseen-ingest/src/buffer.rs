//! Arrival Buffer
//!
//! In-memory staging area between the receive path and the commit scheduler.
//! Both sides take the same mutex for exactly one operation (stage one
//! arrival, or swap out everything staged), and never hold it across storage
//! I/O.

use ahash::AHashMap;
use lastseen_core::Timestamp;
use lastseen_store::NameUpdate;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::time::Duration;

#[derive(Debug, Default)]
struct BufferState {
    /// Arrivals staged in the current commit window
    staged: AHashMap<String, StagedName>,

    /// Latest arrival per name handed to the scheduler so far
    last_known: AHashMap<String, Timestamp>,
}

#[derive(Debug)]
struct StagedName {
    latest: Timestamp,
    interval: Option<Duration>,
    arrivals: SmallVec<[Timestamp; 4]>,
}

/// Shared staging buffer for batched ingestion
#[derive(Debug, Default)]
pub struct ArrivalBuffer {
    state: Mutex<BufferState>,
}

impl ArrivalBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the last committed arrival per name so the first arrival of a
    /// name in a fresh process still gets an interval.
    pub fn seed(&self, entries: impl IntoIterator<Item = (String, Timestamp)>) {
        let mut state = self.state.lock();
        for (name, at) in entries {
            state
                .last_known
                .entry(name)
                .and_modify(|known| *known = (*known).max(at))
                .or_insert(at);
        }
    }

    /// Stage one arrival and return the interval computed for it.
    ///
    /// The interval is measured against the name's latest arrival staged in
    /// this window if there is one, otherwise against the latest arrival
    /// already handed to the scheduler. That arrival may belong to a window
    /// whose flush failed, so an interval can span a dropped window.
    pub fn stage(&self, name: &str, at: Timestamp) -> Option<Duration> {
        let mut state = self.state.lock();
        let BufferState { staged, last_known } = &mut *state;

        if let Some(entry) = staged.get_mut(name) {
            let interval = at.saturating_duration_since(entry.latest);
            entry.latest = at;
            entry.interval = Some(interval);
            entry.arrivals.push(at);
            return Some(interval);
        }

        let interval = last_known
            .get(name)
            .map(|prev| at.saturating_duration_since(*prev));
        let mut arrivals = SmallVec::new();
        arrivals.push(at);
        staged.insert(
            name.to_string(),
            StagedName {
                latest: at,
                interval,
                arrivals,
            },
        );
        interval
    }

    /// Swap out everything staged for an empty window.
    ///
    /// The drained latest times become the reference for intervals of the
    /// next window, whether or not the following flush succeeds.
    pub fn drain(&self) -> Vec<NameUpdate> {
        let staged = {
            let mut state = self.state.lock();
            let staged = std::mem::take(&mut state.staged);
            for (name, entry) in &staged {
                state.last_known.insert(name.clone(), entry.latest);
            }
            staged
        };

        staged
            .into_iter()
            .map(|(name, entry)| NameUpdate {
                name,
                last_seen: entry.latest,
                interval: entry.interval,
                arrivals: entry.arrivals,
            })
            .collect()
    }

    /// Number of names staged in the current window
    pub fn len(&self) -> usize {
        self.state.lock().staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().staged.is_empty()
    }
}
