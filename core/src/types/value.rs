use crate::constants::MICROS_PER_DAY;
use crate::types::ColumnType;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use uuid::Uuid;

/// A single cell read from (or bound into) the benchmark table.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
    Json(serde_json::Value),
}

impl Value {
    /// The column type this value can be stored in, or `None` for NULL.
    pub fn value_type(&self) -> Option<ColumnType> {
        match self {
            Value::Null => None,
            Value::Integer(_) => Some(ColumnType::Integer),
            Value::Timestamp(_) => Some(ColumnType::Timestamp),
            Value::Uuid(_) => Some(ColumnType::Uuid),
            Value::Json(_) => Some(ColumnType::Json),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    /// Stable textual form. Two values are equal for deduplication purposes
    /// iff their canonical forms are equal.
    pub fn canonical(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Integer(v) => v.to_string(),
            Value::Timestamp(v) => v.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            Value::Uuid(v) => v.hyphenated().to_string(),
            Value::Json(v) => v.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// Timestamps are stored as whole microseconds since the Unix epoch.
pub fn timestamp_to_micros(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

/// Inverse of [`timestamp_to_micros`]. Returns `None` outside chrono's range.
pub fn micros_to_timestamp(micros: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
}

/// A signed offset that can be added to a column inside the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offset {
    /// Plain integer addend, valid for integer columns.
    Integer(i64),
    /// Time interval, valid for timestamp columns.
    Interval(Duration),
}

impl Offset {
    /// Interval of whole days, or `None` if it does not fit in microseconds.
    pub fn days(days: i64) -> Option<Self> {
        days.checked_mul(MICROS_PER_DAY)
            .map(|micros| Offset::Interval(Duration::microseconds(micros)))
    }

    /// The column type this offset can be added to.
    pub fn addable_to(self) -> ColumnType {
        match self {
            Offset::Integer(_) => ColumnType::Integer,
            Offset::Interval(_) => ColumnType::Timestamp,
        }
    }

    /// Addend in storage units (integers as-is, intervals in microseconds).
    /// `None` when the interval is too long to express in microseconds.
    pub fn storage_addend(self) -> Option<i64> {
        match self {
            Offset::Integer(v) => Some(v),
            Offset::Interval(d) => d.num_microseconds(),
        }
    }
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Offset::Integer(v) => write!(f, "{v:+}"),
            Offset::Interval(d) => write!(f, "{:+}s", d.num_seconds()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_micros_roundtrip_keeps_precision() {
        let ts = micros_to_timestamp(1_700_000_000_123_456).unwrap();
        assert_eq!(timestamp_to_micros(ts), 1_700_000_000_123_456);
    }

    #[test]
    fn canonical_form_distinguishes_types() {
        assert_eq!(Value::Integer(7).canonical(), "7");
        assert_eq!(Value::Null.canonical(), "NULL");
        let id = Uuid::from_u128(0x1234);
        assert_eq!(
            Value::Uuid(id).canonical(),
            "00000000-0000-0000-0000-000000001234"
        );
    }

    #[test]
    fn day_offset_is_stored_in_microseconds() {
        let offset = Offset::days(10).unwrap();
        assert_eq!(offset.addable_to(), ColumnType::Timestamp);
        assert_eq!(offset.storage_addend(), Some(10 * MICROS_PER_DAY));
        assert_eq!(Offset::Integer(3).addable_to(), ColumnType::Integer);
    }

    #[test]
    fn oversized_offsets_are_not_clamped() {
        assert_eq!(Offset::days(i64::MAX / 1_000), None);
        let long = Offset::Interval(Duration::seconds(i64::MAX / 1_000));
        assert_eq!(long.storage_addend(), None);
        assert_eq!(Offset::Integer(i64::MAX).storage_addend(), Some(i64::MAX));
    }

    #[test]
    fn optional_values_map_none_to_null() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some(5i64)), Value::Integer(5));
    }
}
