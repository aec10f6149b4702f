// Read snapshot
//
// Borrowed view over an open read transaction, handed to the closure passed
// to `Store::snapshot`.

use crate::{schema, Result};
use lastseen_core::Timestamp;
use rusqlite::{params, Connection, OptionalExtension, Transaction};

/// Consistent read-only view of the store
pub struct Snapshot<'a> {
    conn: &'a Connection,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(tx: &'a Transaction<'_>) -> Self {
        Self { conn: tx }
    }

    /// Whether a table with this name exists
    pub fn has_table(&self, table: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(schema::SELECT_TABLE, params![table], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    /// Last arrival recorded for exactly this name
    pub fn last_seen(&self, name: &str) -> Result<Option<Timestamp>> {
        let raw = self
            .conn
            .query_row(schema::SELECT_LAST_SEEN, params![name], |row| row.get::<_, i64>(0))
            .optional()?;
        Ok(raw.map(Timestamp::from_sql))
    }

    /// Every recorded name with its last arrival
    pub fn last_seen_entries(&self) -> Result<Vec<(String, Timestamp)>> {
        let mut stmt = self.conn.prepare(schema::SELECT_ALL_LAST_SEEN)?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, Timestamp::from_sql(row.get(1)?)))
        })?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}
