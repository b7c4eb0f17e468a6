//! Streaming iteration over a filtered table in fixed-size pages.
//!
//! Pages are fetched with keyset pagination on the primary key. Each query asks
//! for one row more than the page size; the extra row is discarded and only
//! tells the iterator whether another page exists. Iteration therefore stops
//! after exactly `ceil(N / P)` queries (one for an empty match set) and the
//! database never has to materialize more than `P + 1` rows per query.

use crate::codec::{all_columns_sql, read_record};
use crate::connection::TrackedConnection;
use crate::error::Result;
use crate::predicate::Predicate;
use fb_core::types::BenchmarkRecord;
use log::debug;
use rusqlite::types::Value as SqlValue;
use std::collections::VecDeque;

pub struct ChunkedIter<'c> {
    conn: &'c TrackedConnection,
    first_page_sql: String,
    next_page_sql: String,
    filter_params: Vec<SqlValue>,
    page_size: usize,
    buffer: VecDeque<BenchmarkRecord>,
    cursor: Option<i64>,
    yielded: u64,
    exhausted: bool,
    pages: u64,
    peak_buffered: usize,
}

impl<'c> ChunkedIter<'c> {
    /// `page_size` of zero is treated as one.
    pub fn new(
        conn: &'c TrackedConnection,
        table: &str,
        filter: &Predicate,
        page_size: usize,
    ) -> Self {
        let columns = all_columns_sql();
        let mut filter_params = Vec::new();
        let filter_sql = filter.to_sql(&mut filter_params);

        let first_page_sql =
            format!("SELECT {columns} FROM {table} WHERE {filter_sql} ORDER BY id LIMIT ?");
        let next_page_sql = format!(
            "SELECT {columns} FROM {table} WHERE id > ? AND {filter_sql} ORDER BY id LIMIT ?"
        );

        Self {
            conn,
            first_page_sql,
            next_page_sql,
            filter_params,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            cursor: None,
            yielded: 0,
            exhausted: false,
            pages: 0,
            peak_buffered: 0,
        }
    }

    /// Pages fetched so far; each one is a round-trip.
    pub fn pages(&self) -> u64 {
        self.pages
    }

    /// Largest number of rows held client-side at any point.
    pub fn peak_buffered(&self) -> usize {
        self.peak_buffered
    }

    /// Rows fetched from the database so far.
    pub fn fetched_rows(&self) -> u64 {
        self.yielded
    }

    fn fetch_page(&mut self) -> Result<()> {
        let limit = SqlValue::Integer(self.page_size as i64 + 1);
        let (sql, params) = match self.cursor {
            None => {
                let mut params = self.filter_params.clone();
                params.push(limit);
                (&self.first_page_sql, params)
            }
            Some(last_id) => {
                let mut params = Vec::with_capacity(self.filter_params.len() + 2);
                params.push(SqlValue::Integer(last_id));
                params.extend(self.filter_params.iter().cloned());
                params.push(limit);
                (&self.next_page_sql, params)
            }
        };

        let mut page = self.conn.query_rows(sql, &params, |row| read_record(row))?;
        self.pages += 1;

        let has_more = page.len() > self.page_size;
        page.truncate(self.page_size);
        let fetched = page.len();
        if let Some(last) = page.last() {
            self.cursor = Some(last.id);
        }
        self.buffer.extend(page);
        self.yielded += fetched as u64;
        self.peak_buffered = self.peak_buffered.max(self.buffer.len());

        debug!(
            "page {} fetched {} rows ({} so far, more: {})",
            self.pages, fetched, self.yielded, has_more
        );
        self.exhausted = !has_more;
        Ok(())
    }
}

impl Iterator for ChunkedIter<'_> {
    type Item = Result<BenchmarkRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() && !self.exhausted {
            if let Err(e) = self.fetch_page() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }
        self.buffer.pop_front().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::{seed, SeedParams};
    use crate::schema::TableSchema;

    fn seeded(rows: usize) -> (TrackedConnection, TableSchema) {
        let conn = TrackedConnection::open_in_memory().unwrap();
        let schema = TableSchema::default();
        let params = SeedParams::standard().with_rows(rows).with_seed(7);
        seed(&conn, &schema, &params).unwrap();
        conn.reset_round_trips();
        (conn, schema)
    }

    #[test]
    fn page_queries_stay_bounded_by_the_limit() {
        let conn = TrackedConnection::open_in_memory().unwrap();
        let iter = ChunkedIter::new(&conn, "t", &Predicate::All, 10);
        for sql in [&iter.first_page_sql, &iter.next_page_sql] {
            assert!(!sql.contains("OVER"), "{sql}");
            assert!(sql.ends_with("ORDER BY id LIMIT ?"), "{sql}");
        }
    }

    #[test]
    fn exact_multiple_needs_no_trailing_query() {
        let (conn, schema) = seeded(40);
        let mut iter = ChunkedIter::new(&conn, schema.table(), &Predicate::All, 10);
        assert_eq!(iter.by_ref().count(), 40);
        assert_eq!(iter.pages(), 4);
        assert_eq!(conn.round_trips(), 4);
        assert_eq!(iter.fetched_rows(), 40);
        assert!(iter.peak_buffered() <= 10);
    }

    #[test]
    fn partial_last_page_ends_iteration() {
        let (conn, schema) = seeded(41);
        let mut iter = ChunkedIter::new(&conn, schema.table(), &Predicate::All, 10);
        assert_eq!(iter.by_ref().count(), 41);
        assert_eq!(iter.pages(), 5);
        assert!(iter.next().is_none());
        assert_eq!(conn.round_trips(), 5);
    }
}
