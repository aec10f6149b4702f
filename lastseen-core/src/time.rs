//! Clock Abstraction
//!
//! Every component that stamps or ages an arrival reads the time through a
//! [`TimeProvider`], so ingestion and freshness checks can run against a
//! controlled clock in tests.

use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Wall clock instant, nanoseconds since the Unix epoch
///
/// Persisted as a SQLite INTEGER. Values beyond `i64::MAX` are clamped when
/// written, which is far past any realistic arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The Unix epoch
    pub const EPOCH: Timestamp = Timestamp(0);

    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(NANOS_PER_SEC))
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Value as stored in the database
    pub fn to_sql(self) -> i64 {
        i64::try_from(self.0).unwrap_or(i64::MAX)
    }

    /// Value read back from the database; negative values clamp to the epoch
    pub fn from_sql(raw: i64) -> Self {
        Self(u64::try_from(raw).unwrap_or(0))
    }

    /// Time elapsed from `earlier` to `self`, zero if `earlier` is later
    pub fn saturating_duration_since(&self, earlier: Timestamp) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

    pub fn saturating_sub(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_sub(duration_nanos(duration)))
    }

    pub fn saturating_add(&self, duration: Duration) -> Timestamp {
        Timestamp(self.0.saturating_add(duration_nanos(duration)))
    }

    /// RFC 3339 rendering in UTC with whole seconds
    pub fn to_rfc3339(&self) -> String {
        let secs = (self.0 / NANOS_PER_SEC) as i64;
        let nanos = (self.0 % NANOS_PER_SEC) as u32;
        match DateTime::from_timestamp(secs, nanos) {
            Some(dt) => dt.to_rfc3339_opts(SecondsFormat::Secs, true),
            None => format!("{}ns", self.0),
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

/// Time provider trait
///
/// Abstraction over time sources that allows mocking for testing.
pub trait TimeProvider: Send + Sync {
    /// Current wall clock time
    fn now(&self) -> Timestamp;
}

/// Real time provider using the system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeProvider for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Timestamp(duration_nanos(d)))
            .unwrap_or(Timestamp::EPOCH)
    }
}

/// Mock time provider for tests
///
/// Clones share the same underlying counter.
#[derive(Debug, Clone, Default)]
pub struct MockClock {
    nanos: Arc<AtomicU64>,
}

impl MockClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(start.as_nanos())),
        }
    }

    pub fn advance(&self, duration: Duration) {
        self.nanos
            .fetch_add(duration_nanos(duration), Ordering::SeqCst);
    }

    pub fn set(&self, at: Timestamp) {
        self.nanos.store(at.as_nanos(), Ordering::SeqCst);
    }
}

impl TimeProvider for MockClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_after_epoch() {
        assert!(SystemClock.now() > Timestamp::from_secs(1_600_000_000));
    }

    #[test]
    fn test_mock_clock_advance_and_set() {
        let clock = MockClock::new(Timestamp::from_secs(100));
        clock.advance(Duration::from_millis(1500));
        assert_eq!(clock.now(), Timestamp::from_nanos(101_500_000_000));

        clock.set(Timestamp::from_secs(5));
        assert_eq!(clock.now(), Timestamp::from_secs(5));
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let a = MockClock::new(Timestamp::EPOCH);
        let b = a.clone();
        b.advance(Duration::from_secs(3));
        assert_eq!(a.now(), Timestamp::from_secs(3));
    }

    #[test]
    fn test_saturating_arithmetic() {
        let t = Timestamp::from_secs(10);
        assert_eq!(t.saturating_sub(Duration::from_secs(20)), Timestamp::EPOCH);
        assert_eq!(
            t.saturating_duration_since(Timestamp::from_secs(4)),
            Duration::from_secs(6)
        );
        assert_eq!(
            Timestamp::from_secs(4).saturating_duration_since(t),
            Duration::ZERO
        );
        assert_eq!(t.saturating_add(Duration::from_secs(1)), Timestamp::from_secs(11));
    }

    #[test]
    fn test_sql_round_trip_clamps_negative() {
        assert_eq!(Timestamp::from_sql(-5), Timestamp::EPOCH);
        assert_eq!(Timestamp::from_sql(Timestamp::from_secs(7).to_sql()), Timestamp::from_secs(7));
    }

    #[test]
    fn test_rfc3339_rendering() {
        assert_eq!(Timestamp::from_secs(0).to_rfc3339(), "1970-01-01T00:00:00Z");
        assert_eq!(
            Timestamp::from_secs(1_700_000_000).to_string(),
            "2023-11-14T22:13:20Z"
        );
    }
}
