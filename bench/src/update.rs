//! In-place column updates evaluated by the database.
//!
//! `SET target = source + offset` is computed inside a single `UPDATE`
//! statement, so there is no read-modify-write window in the application.
//! Operand types are checked before anything is sent to the database.

use crate::codec::to_sql;
use crate::error::{BenchError, Result};
use crate::predicate::Predicate;
use fb_core::types::{Column, Offset, Value};
use rusqlite::types::Value as SqlValue;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateExpr {
    /// `target = source + offset`
    Add { source: Column, offset: Offset },
    /// `target = value`
    Set(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldUpdate {
    pub target: Column,
    pub expr: UpdateExpr,
}

impl FieldUpdate {
    pub fn add(target: Column, source: Column, offset: Offset) -> Self {
        Self {
            target,
            expr: UpdateExpr::Add { source, offset },
        }
    }

    pub fn set(target: Column, value: impl Into<Value>) -> Self {
        Self {
            target,
            expr: UpdateExpr::Set(value.into()),
        }
    }

    /// Type-check the assignment without touching the database.
    pub fn check(&self) -> Result<()> {
        if self.target.is_primary_key() {
            return Err(BenchError::ImmutableColumn(self.target));
        }
        let expected = self.target.column_type();

        match &self.expr {
            UpdateExpr::Add { source, offset } => {
                let source_type = source.column_type();
                if source_type != offset.addable_to() {
                    return Err(BenchError::TypeMismatch {
                        column: *source,
                        expected: offset.addable_to(),
                        found: source_type.name().to_string(),
                    });
                }
                if source_type != expected {
                    return Err(BenchError::TypeMismatch {
                        column: self.target,
                        expected,
                        found: source_type.name().to_string(),
                    });
                }
                // NULL + offset is NULL, which a required column cannot hold.
                if source.is_nullable() && !self.target.is_nullable() {
                    return Err(BenchError::NullViolation(self.target));
                }
                Ok(())
            }
            UpdateExpr::Set(value) => match value.value_type() {
                None if self.target.is_nullable() => Ok(()),
                None => Err(BenchError::NullViolation(self.target)),
                Some(found) if found == expected => Ok(()),
                Some(found) => Err(BenchError::TypeMismatch {
                    column: self.target,
                    expected,
                    found: found.name().to_string(),
                }),
            },
        }
    }

    /// Checked `UPDATE` statement for `table` restricted by `filter`.
    pub fn to_sql(&self, table: &str, filter: &Predicate) -> Result<(String, Vec<SqlValue>)> {
        self.check()?;
        filter.validate()?;

        let mut params = Vec::new();
        let assignment = match &self.expr {
            UpdateExpr::Add { source, offset } => {
                let addend = offset
                    .storage_addend()
                    .ok_or(BenchError::OutOfRange { column: self.target })?;
                params.push(SqlValue::Integer(addend));
                format!("{} = {} + ?", self.target.name(), source.name())
            }
            UpdateExpr::Set(value) => {
                params.push(to_sql(value));
                format!("{} = ?", self.target.name())
            }
        };
        let (where_sql, where_params) = filter.where_clause();
        params.extend(where_params);
        Ok((format!("UPDATE {table} SET {assignment}{where_sql}"), params))
    }
}

impl fmt::Display for FieldUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.expr {
            UpdateExpr::Add { source, offset } => {
                write!(f, "{} = {} {}", self.target, source, offset)
            }
            UpdateExpr::Set(value) => write!(f, "{} = {}", self.target, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fb_core::constants::MICROS_PER_DAY;
    use fb_core::types::ColumnType;
    use uuid::Uuid;

    #[test]
    fn end_from_begin_plus_days_is_well_typed() {
        let update = FieldUpdate::add(
            Column::KnowledgeEndDate,
            Column::KnowledgeBeginDate,
            Offset::days(10).unwrap(),
        );
        update.check().unwrap();

        let filter = Predicate::eq(Column::DatabookId, Uuid::from_u128(1));
        let (sql, params) = update.to_sql("benchmark_record", &filter).unwrap();
        assert_eq!(
            sql,
            "UPDATE benchmark_record SET knowledge_end_date = knowledge_begin_date + ? WHERE databook_id = ?"
        );
        assert_eq!(params[0], SqlValue::Integer(10 * MICROS_PER_DAY));
        assert_eq!(update.to_string(), "knowledge_end_date = knowledge_begin_date +864000s");
    }

    #[test]
    fn day_offset_on_uuid_is_a_mismatch() {
        let update = FieldUpdate::add(Column::DatabookId, Column::DatabookId, Offset::days(1).unwrap());
        match update.check() {
            Err(BenchError::TypeMismatch {
                column,
                expected,
                found,
            }) => {
                assert_eq!(column, Column::DatabookId);
                assert_eq!(expected, ColumnType::Timestamp);
                assert_eq!(found, "uuid");
            }
            other => panic!("expected mismatch, got {other:?}"),
        }
    }

    #[test]
    fn integer_sum_into_timestamp_is_a_mismatch() {
        let update = FieldUpdate::add(Column::KnowledgeEndDate, Column::ClientId, Offset::Integer(1));
        assert!(matches!(
            update.check(),
            Err(BenchError::TypeMismatch {
                column: Column::KnowledgeEndDate,
                ..
            })
        ));
    }

    #[test]
    fn unrepresentable_interval_is_out_of_range() {
        let update = FieldUpdate::add(
            Column::KnowledgeEndDate,
            Column::KnowledgeBeginDate,
            Offset::Interval(chrono::Duration::seconds(i64::MAX / 1_000)),
        );
        assert!(matches!(
            update.to_sql("benchmark_record", &Predicate::All),
            Err(BenchError::OutOfRange {
                column: Column::KnowledgeEndDate
            })
        ));
    }

    #[test]
    fn primary_key_and_required_nulls_are_rejected() {
        assert!(matches!(
            FieldUpdate::set(Column::Id, 5i64).check(),
            Err(BenchError::ImmutableColumn(Column::Id))
        ));
        assert!(matches!(
            FieldUpdate::set(Column::ClientId, Value::Null).check(),
            Err(BenchError::NullViolation(Column::ClientId))
        ));
        assert!(matches!(
            FieldUpdate::add(Column::KnowledgeBeginDate, Column::KnowledgeEndDate, Offset::days(1).unwrap())
                .check(),
            Err(BenchError::NullViolation(Column::KnowledgeBeginDate))
        ));
        FieldUpdate::set(Column::KnowledgeEndDate, Value::Null)
            .check()
            .unwrap();
        FieldUpdate::add(Column::ClientId, Column::ClientId, Offset::Integer(100))
            .check()
            .unwrap();
    }
}
