//! Result objects produced by the fetch strategies.
//!
//! [`LiveRecord`] is backed by the table: columns it was not fetched with are
//! loaded from the database on first access. [`MappingRecord`] is a detached
//! key-value snapshot with no way back to its row.

use crate::codec::read_value;
use crate::connection::TrackedConnection;
use crate::error::{BenchError, Result};
use crate::lazy::Lazy;
use fb_core::types::{Column, Value};
use log::debug;
use rusqlite::types::Value as SqlValue;
use std::collections::BTreeMap;
use std::rc::Rc;

pub struct LiveRecord<'c> {
    id: i64,
    fields: BTreeMap<Column, Lazy<'c, Value>>,
}

impl<'c> LiveRecord<'c> {
    /// Build a record from the columns a query returned. Every other column
    /// becomes a deferred cell that refetches from `table` by primary key.
    pub(crate) fn new(
        conn: &'c TrackedConnection,
        table: &Rc<str>,
        id: i64,
        loaded: impl IntoIterator<Item = (Column, Value)>,
    ) -> Self {
        let mut fields: BTreeMap<Column, Lazy<'c, Value>> = loaded
            .into_iter()
            .map(|(column, value)| (column, Lazy::loaded(value)))
            .collect();
        fields.insert(Column::Id, Lazy::loaded(Value::Integer(id)));

        for column in Column::ALL {
            if !fields.contains_key(&column) {
                let table = Rc::clone(table);
                fields.insert(
                    column,
                    Lazy::deferred(move || refetch_column(conn, &table, id, column)),
                );
            }
        }
        Self { id, fields }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    /// Read a column, fetching it from the database if it was deferred.
    pub fn get(&self, column: Column) -> Result<&Value> {
        // Every column has a cell, loaded or deferred.
        self.fields[&column].get()
    }

    pub fn is_loaded(&self, column: Column) -> bool {
        self.fields.get(&column).is_some_and(Lazy::is_loaded)
    }

    /// Columns not yet fetched for this object.
    pub fn deferred_columns(&self) -> Vec<Column> {
        self.fields
            .iter()
            .filter(|(_, cell)| !cell.is_loaded())
            .map(|(&column, _)| column)
            .collect()
    }
}

impl std::fmt::Debug for LiveRecord<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveRecord")
            .field("id", &self.id)
            .field("fields", &self.fields)
            .finish()
    }
}

/// One secondary round-trip: load a single column of a single row.
fn refetch_column(conn: &TrackedConnection, table: &str, id: i64, column: Column) -> Result<Value> {
    debug!("deferred load of {table}.{column} for id {id}");
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", column.name(), table);
    conn.query_optional(&sql, &[SqlValue::Integer(id)], |row| {
        read_value(row, 0, column)
    })?
    .ok_or_else(|| BenchError::RowNotFound {
        table: table.to_string(),
        id,
    })
}

/// Plain key-value record. Only the fetched columns exist.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingRecord {
    values: BTreeMap<Column, Value>,
}

impl MappingRecord {
    pub(crate) fn new(values: impl IntoIterator<Item = (Column, Value)>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }

    pub fn get(&self, column: Column) -> Result<&Value> {
        self.values.get(&column).ok_or_else(|| BenchError::KeyNotFound {
            key: column.name().to_string(),
        })
    }

    /// Lookup by column name. Names that are not columns are missing keys too.
    pub fn get_by_name(&self, key: &str) -> Result<&Value> {
        match key.parse::<Column>() {
            Ok(column) => self.get(column),
            Err(_) => Err(BenchError::KeyNotFound {
                key: key.to_string(),
            }),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = Column> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populate::insert_records;
    use crate::schema::TableSchema;
    use chrono::{TimeZone, Utc};
    use fb_core::types::NewRecord;
    use uuid::Uuid;

    fn one_row() -> (TrackedConnection, TableSchema) {
        let conn = TrackedConnection::open_in_memory().unwrap();
        let schema = TableSchema::default();
        schema.create(&conn).unwrap();
        let begin = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        insert_records(
            &conn,
            &schema,
            &[NewRecord::new(begin, 11, Uuid::from_u128(1), Uuid::from_u128(2))],
        )
        .unwrap();
        conn.reset_round_trips();
        (conn, schema)
    }

    #[test]
    fn deferred_column_costs_one_round_trip_then_caches() {
        let (conn, schema) = one_row();
        let table: Rc<str> = Rc::from(schema.table());
        let record = LiveRecord::new(&conn, &table, 1, [(Column::ClientId, Value::Integer(11))]);

        assert!(record.is_loaded(Column::ClientId));
        assert!(!record.is_loaded(Column::DatabookId));
        assert_eq!(record.get(Column::ClientId).unwrap(), &Value::Integer(11));
        assert_eq!(conn.round_trips(), 0);

        assert_eq!(
            record.get(Column::DatabookId).unwrap(),
            &Value::Uuid(Uuid::from_u128(1))
        );
        record.get(Column::DatabookId).unwrap();
        assert_eq!(conn.round_trips(), 1);
        assert_eq!(record.get(Column::KnowledgeEndDate).unwrap(), &Value::Null);
        assert_eq!(conn.round_trips(), 2);
    }

    #[test]
    fn refetch_of_deleted_row_is_row_not_found() {
        let (conn, schema) = one_row();
        let table: Rc<str> = Rc::from(schema.table());
        let record = LiveRecord::new(&conn, &table, 1, Vec::<(Column, Value)>::new());
        conn.inner()
            .execute("DELETE FROM benchmark_record WHERE id = 1", [])
            .unwrap();

        let err = record.get(Column::DatasheetId).unwrap_err();
        assert!(matches!(err, BenchError::RowNotFound { id: 1, .. }));
        // The primary key is always loaded.
        assert_eq!(record.get(Column::Id).unwrap(), &Value::Integer(1));
    }

    #[test]
    fn mapping_record_missing_key_is_an_error() {
        let record = MappingRecord::new([(Column::ClientId, Value::Integer(3))]);
        assert_eq!(record.get(Column::ClientId).unwrap(), &Value::Integer(3));
        assert!(matches!(
            record.get(Column::Data),
            Err(BenchError::KeyNotFound { key }) if key == "data"
        ));
        assert!(matches!(
            record.get_by_name("bogus"),
            Err(BenchError::KeyNotFound { key }) if key == "bogus"
        ));
        assert_eq!(record.len(), 1);
    }
}
