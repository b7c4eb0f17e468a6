//! A SQLite connection that counts round-trips.
//!
//! Every statement the harness sends goes through [`TrackedConnection`], so the
//! counter is the single source of truth for "how many times did we talk to
//! the database". Each executed statement counts as one round-trip.

use crate::error::Result;
use log::trace;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use std::cell::Cell;
use std::path::Path;

pub struct TrackedConnection {
    conn: Connection,
    round_trips: Cell<u64>,
}

impl TrackedConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            round_trips: Cell::new(0),
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Connection::open_in_memory()?))
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(Connection::open(path)?))
    }

    /// Underlying connection. Statements issued through it are not counted.
    pub fn inner(&self) -> &Connection {
        &self.conn
    }

    pub fn round_trips(&self) -> u64 {
        self.round_trips.get()
    }

    pub fn reset_round_trips(&self) {
        self.round_trips.set(0);
    }

    fn record_round_trip(&self, sql: &str) {
        self.round_trips.set(self.round_trips.get() + 1);
        trace!("round-trip #{}: {}", self.round_trips.get(), sql);
    }

    /// Run a query and collect every row through `map`.
    pub fn query_rows<T, F>(&self, sql: &str, params: &[SqlValue], mut map: F) -> Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.record_round_trip(sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt.query_map(params_from_iter(params.iter()), |row| map(row))?;
        let mut result = Vec::new();
        for r in rows {
            result.push(r?);
        }
        Ok(result)
    }

    /// Run a query expected to yield exactly one row.
    ///
    /// A missing row surfaces as `rusqlite::Error::QueryReturnedNoRows` wrapped
    /// in [`crate::BenchError::Sqlite`]; callers that care match on it.
    pub fn query_row<T, F>(&self, sql: &str, params: &[SqlValue], map: F) -> Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.record_round_trip(sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.query_row(params_from_iter(params.iter()), map)?)
    }

    /// Like [`query_row`](Self::query_row) but maps "no rows" to `None`.
    pub fn query_optional<T, F>(&self, sql: &str, params: &[SqlValue], map: F) -> Result<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        self.record_round_trip(sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        match stmt.query_row(params_from_iter(params.iter()), map) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Execute a single data-modifying statement and return affected rows.
    pub fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.record_round_trip(sql);
        let mut stmt = self.conn.prepare_cached(sql)?;
        Ok(stmt.execute(params_from_iter(params.iter()))?)
    }

    /// Execute a batch of DDL statements as one round-trip.
    pub fn execute_batch(&self, sql: &str) -> Result<()> {
        self.record_round_trip(sql);
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
