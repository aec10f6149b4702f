//! Lastseen Store
//!
//! Access layer over the embedded SQLite database holding, per topic name,
//! the last arrival time, the last inter-arrival interval and a
//! retention-bounded log of raw arrival times.
//!
//! A single ingestion process is assumed per database file. Immediate-mode
//! writes read the previous arrival and write the new one inside one
//! IMMEDIATE transaction; concurrent writers from other processes are not
//! coordinated beyond SQLite's own locking.

pub mod schema;
mod snapshot;

use lastseen_core::Timestamp;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use smallvec::SmallVec;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub use schema::{LAST_INTERVAL_TABLE, LAST_SEEN_TABLE, RECEIVE_TIMES_TABLE};
pub use snapshot::Snapshot;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Store error types
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Everything staged for one name during a commit window
#[derive(Debug, Clone, PartialEq)]
pub struct NameUpdate {
    pub name: String,

    /// Most recent staged arrival
    pub last_seen: Timestamp,

    /// Gap to the previous arrival, if one was known when staging
    pub interval: Option<Duration>,

    /// Every staged arrival, oldest first
    pub arrivals: SmallVec<[Timestamp; 4]>,
}

/// Counts from one applied batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub names: usize,
    pub arrivals: usize,
    pub pruned: usize,
}

/// Handle to the tracking database
///
/// The connection is guarded by a mutex so the handle can be shared between
/// the receive path and the commit scheduler.
#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl Store {
    /// Open or create a database for writing and make sure the schema exists
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        schema::create(&conn)?;

        info!(path = %path.display(), journal_mode = %mode, "Opened tracking database");

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Open an existing database without write access.
    ///
    /// Never creates the file or the schema.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn =
            Connection::open_with_flags(path, flags).map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory database with the schema created
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::create(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    /// File backing this store, `None` for in-memory databases
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist one arrival immediately.
    ///
    /// Reads the previous last-seen time, then writes last-seen, the interval
    /// (when there was a previous arrival) and a receive-log row, all in one
    /// transaction. Returns the interval that was written.
    pub fn record_arrival(&self, name: &str, at: Timestamp) -> Result<Option<Duration>> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let previous = tx
            .query_row(schema::SELECT_LAST_SEEN, params![name], |row| row.get::<_, i64>(0))
            .optional()?
            .map(Timestamp::from_sql);
        let interval = previous.map(|prev| at.saturating_duration_since(prev));

        tx.execute(schema::UPSERT_LAST_SEEN, params![name, at.to_sql()])?;
        if let Some(interval) = interval {
            tx.execute(schema::UPSERT_LAST_INTERVAL, params![name, duration_to_sql(interval)])?;
        }
        tx.execute(schema::INSERT_RECEIVE_TIME, params![name, at.to_sql()])?;
        tx.commit()?;

        Ok(interval)
    }

    /// Apply a drained batch and prune the receive log in one transaction.
    ///
    /// Receive-log rows with `time <= prune_before` are deleted after the
    /// batch is written. Either everything is committed or nothing is.
    pub fn apply_batch(
        &self,
        updates: &[NameUpdate],
        prune_before: Timestamp,
    ) -> Result<FlushStats> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut stats = FlushStats::default();

        {
            let mut upsert_seen = tx.prepare_cached(schema::UPSERT_LAST_SEEN)?;
            let mut upsert_interval = tx.prepare_cached(schema::UPSERT_LAST_INTERVAL)?;
            let mut insert_time = tx.prepare_cached(schema::INSERT_RECEIVE_TIME)?;

            for update in updates {
                upsert_seen.execute(params![update.name, update.last_seen.to_sql()])?;
                if let Some(interval) = update.interval {
                    upsert_interval.execute(params![update.name, duration_to_sql(interval)])?;
                }
                for arrival in &update.arrivals {
                    insert_time.execute(params![update.name, arrival.to_sql()])?;
                }
                stats.names += 1;
                stats.arrivals += update.arrivals.len();
            }
        }

        stats.pruned = tx.execute(schema::PRUNE_RECEIVE_TIMES, params![prune_before.to_sql()])?;
        tx.commit()?;

        debug!(
            names = stats.names,
            arrivals = stats.arrivals,
            pruned = stats.pruned,
            "Applied batch"
        );

        Ok(stats)
    }

    /// Delete receive-log rows with `time <= before`
    pub fn prune_receive_log(&self, before: Timestamp) -> Result<usize> {
        let conn = self.conn.lock();
        Ok(conn.execute(schema::PRUNE_RECEIVE_TIMES, params![before.to_sql()])?)
    }

    /// Last committed arrival for a name
    pub fn last_seen(&self, name: &str) -> Result<Option<Timestamp>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(schema::SELECT_LAST_SEEN, params![name], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(raw.map(Timestamp::from_sql))
    }

    /// Every name with its last committed arrival
    pub fn last_seen_all(&self) -> Result<Vec<(String, Timestamp)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(schema::SELECT_ALL_LAST_SEEN)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, Timestamp::from_sql(row.get(1)?)))
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Last committed inter-arrival interval for a name
    pub fn last_interval(&self, name: &str) -> Result<Option<Duration>> {
        let conn = self.conn.lock();
        let raw = conn
            .query_row(
                "SELECT time FROM topic_last_interval WHERE name = ?1",
                params![name],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(raw.map(duration_from_sql))
    }

    /// Retained arrival times for a name, oldest first
    pub fn receive_times(&self, name: &str) -> Result<Vec<Timestamp>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT time FROM topic_receive_times WHERE name = ?1 ORDER BY time")?;
        let rows = stmt.query_map(params![name], |row| row.get::<_, i64>(0))?;
        let times = rows
            .map(|raw| raw.map(Timestamp::from_sql))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(times)
    }

    /// Number of rows currently in the receive log
    pub fn receive_log_len(&self) -> Result<usize> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM topic_receive_times", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Delete every row from every table
    pub fn reset(&self) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM topic_last_seen;
             DELETE FROM topic_last_interval;
             DELETE FROM topic_receive_times;",
        )?;
        tx.commit()?;
        info!("Tracking database reset");
        Ok(())
    }

    /// Run `f` against a consistent read snapshot.
    ///
    /// All queries issued through the [`Snapshot`] run inside one read
    /// transaction, so a concurrent flush is seen either entirely or not at
    /// all.
    pub fn snapshot<T, E>(
        &self,
        f: impl FnOnce(&Snapshot<'_>) -> std::result::Result<T, E>,
    ) -> std::result::Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(StoreError::from)?;
        let result = f(&Snapshot::new(&tx));
        tx.finish().map_err(StoreError::from)?;
        result
    }
}

fn duration_to_sql(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

fn duration_from_sql(raw: i64) -> Duration {
    Duration::from_nanos(u64::try_from(raw).unwrap_or(0))
}
