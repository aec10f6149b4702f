// Persisted schema
//
// Three tables keyed by topic name. Times and intervals are INTEGER
// nanoseconds (see `lastseen_core::Timestamp`).

use rusqlite::Connection;

/// Most recent arrival per name
pub const LAST_SEEN_TABLE: &str = "topic_last_seen";

/// Gap between the two most recent arrivals per name
pub const LAST_INTERVAL_TABLE: &str = "topic_last_interval";

/// One row per arrival, pruned by retention
pub const RECEIVE_TIMES_TABLE: &str = "topic_receive_times";

const CREATE_SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS topic_last_seen (
        name TEXT NOT NULL UNIQUE,
        time INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS topic_last_interval (
        name TEXT NOT NULL UNIQUE,
        time INTEGER NOT NULL
    );
    CREATE TABLE IF NOT EXISTS topic_receive_times (
        name TEXT NOT NULL,
        time INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_topic_receive_times_time
        ON topic_receive_times(time);
";

/// Create all tables and indexes. Idempotent.
pub(crate) fn create(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(CREATE_SCHEMA)
}

pub(crate) const SELECT_LAST_SEEN: &str = "SELECT time FROM topic_last_seen WHERE name = ?1";

pub(crate) const SELECT_ALL_LAST_SEEN: &str = "SELECT name, time FROM topic_last_seen";

pub(crate) const UPSERT_LAST_SEEN: &str = "INSERT INTO topic_last_seen (name, time) VALUES (?1, ?2)
     ON CONFLICT(name) DO UPDATE SET time = excluded.time";

pub(crate) const UPSERT_LAST_INTERVAL: &str = "INSERT INTO topic_last_interval (name, time) VALUES (?1, ?2)
     ON CONFLICT(name) DO UPDATE SET time = excluded.time";

pub(crate) const INSERT_RECEIVE_TIME: &str =
    "INSERT INTO topic_receive_times (name, time) VALUES (?1, ?2)";

pub(crate) const PRUNE_RECEIVE_TIMES: &str = "DELETE FROM topic_receive_times WHERE time <= ?1";

pub(crate) const SELECT_TABLE: &str =
    "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1";
