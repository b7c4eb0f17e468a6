//! Conversion between [`Value`] and SQLite storage classes.
//!
//! Timestamps are stored as INTEGER microseconds, UUIDs as hyphenated TEXT and
//! JSON documents as serialized TEXT.

use fb_core::types::{
    micros_to_timestamp, timestamp_to_micros, BenchmarkRecord, Column, ColumnType, Value,
};
use rusqlite::types::{Type, Value as SqlValue};
use rusqlite::Row;
use uuid::Uuid;

/// Bind form of a value.
pub fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Timestamp(v) => SqlValue::Integer(timestamp_to_micros(*v)),
        Value::Uuid(v) => SqlValue::Text(v.hyphenated().to_string()),
        Value::Json(v) => SqlValue::Text(v.to_string()),
    }
}

/// Read column `idx` of `row`, interpreting it as `column`'s type.
pub fn read_value(row: &Row<'_>, idx: usize, column: Column) -> rusqlite::Result<Value> {
    match column.column_type() {
        ColumnType::Integer => Ok(row.get::<_, Option<i64>>(idx)?.into()),
        ColumnType::Timestamp => match row.get::<_, Option<i64>>(idx)? {
            None => Ok(Value::Null),
            Some(micros) => micros_to_timestamp(micros)
                .map(Value::Timestamp)
                .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros)),
        },
        ColumnType::Uuid => match row.get::<_, Option<String>>(idx)? {
            None => Ok(Value::Null),
            Some(text) => Uuid::parse_str(&text)
                .map(Value::Uuid)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        },
        ColumnType::Json => match row.get::<_, Option<String>>(idx)? {
            None => Ok(Value::Null),
            Some(text) => serde_json::from_str(&text)
                .map(Value::Json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))),
        },
    }
}

/// Read `columns` from consecutive positions of `row` starting at zero.
pub fn read_values(row: &Row<'_>, columns: &[Column]) -> rusqlite::Result<Vec<Value>> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, &column)| read_value(row, idx, column))
        .collect()
}

/// Read a full record from a row selected with [`all_columns_sql`].
pub fn read_record(row: &Row<'_>) -> rusqlite::Result<BenchmarkRecord> {
    let values = read_values(row, &Column::ALL)?;
    let mut values = values.into_iter();
    let mut next = || values.next().unwrap_or(Value::Null);

    let id = required_integer(next(), Column::Id)?;
    let knowledge_begin_date = next()
        .as_timestamp()
        .ok_or_else(|| invalid_null(Column::KnowledgeBeginDate))?;
    let knowledge_end_date = next().as_timestamp();
    let client_id = required_integer(next(), Column::ClientId)?;
    let databook_id = next()
        .as_uuid()
        .ok_or_else(|| invalid_null(Column::DatabookId))?;
    let datasheet_id = next()
        .as_uuid()
        .ok_or_else(|| invalid_null(Column::DatasheetId))?;
    let data = match next() {
        Value::Json(v) => Some(v),
        _ => None,
    };

    Ok(BenchmarkRecord {
        id,
        knowledge_begin_date,
        knowledge_end_date,
        client_id,
        databook_id,
        datasheet_id,
        data,
    })
}

fn required_integer(value: Value, column: Column) -> rusqlite::Result<i64> {
    value.as_integer().ok_or_else(|| invalid_null(column))
}

fn invalid_null(column: Column) -> rusqlite::Error {
    rusqlite::Error::InvalidColumnType(column.ordinal(), column.name().to_string(), Type::Null)
}

/// Comma-separated column list in declaration order.
pub fn all_columns_sql() -> String {
    column_list(&Column::ALL)
}

pub fn column_list(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn uuid_and_json_decode_from_text() {
        let conn = Connection::open_in_memory().unwrap();
        let id = Uuid::from_u128(42);
        let (uuid, json) = conn
            .query_row(
                "SELECT ?1, ?2",
                rusqlite::params![
                    to_sql(&Value::Uuid(id)),
                    to_sql(&Value::Json(serde_json::json!({"k": [1, 2]})))
                ],
                |row| {
                    Ok((
                        read_value(row, 0, Column::DatabookId)?,
                        read_value(row, 1, Column::Data)?,
                    ))
                },
            )
            .unwrap();
        assert_eq!(uuid, Value::Uuid(id));
        assert_eq!(json, Value::Json(serde_json::json!({"k": [1, 2]})));
    }

    #[test]
    fn malformed_uuid_is_a_conversion_error() {
        let conn = Connection::open_in_memory().unwrap();
        let err = conn
            .query_row("SELECT 'not-a-uuid'", [], |row| {
                read_value(row, 0, Column::DatasheetId)
            })
            .unwrap_err();
        assert!(matches!(err, rusqlite::Error::FromSqlConversionFailure(0, Type::Text, _)));
    }

    #[test]
    fn null_reads_as_null_for_every_type() {
        let conn = Connection::open_in_memory().unwrap();
        for column in Column::ALL {
            let v = conn
                .query_row("SELECT NULL", [], |row| read_value(row, 0, column))
                .unwrap();
            assert_eq!(v, Value::Null, "column {column}");
        }
    }
}
