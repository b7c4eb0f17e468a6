//! Boolean filter expressions compiled into a single SQL `WHERE` clause.
//!
//! Predicates compose with `&`, `|` and `!`, so a compound filter such as
//! `(a | b) & !(a & b)` is evaluated by the database in one query instead of
//! fetching both sides and combining them on the client.
//!
//! Comparisons on nullable columns are rendered as `(col op ? AND col IS NOT
//! NULL)`, which is FALSE rather than NULL for a missing value. Every
//! predicate is therefore two-valued: a NULL never satisfies a comparison
//! (including `ne`) and always satisfies its negation.

use crate::codec::to_sql;
use crate::error::{BenchError, Result};
use fb_core::types::{Column, Value};
use rusqlite::types::Value as SqlValue;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    All,
    Compare {
        column: Column,
        op: CmpOp,
        value: Value,
    },
    In {
        column: Column,
        values: Vec<Value>,
    },
    IsNull(Column),
    And(Box<Predicate>, Box<Predicate>),
    Or(Box<Predicate>, Box<Predicate>),
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn compare(column: Column, op: CmpOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            column,
            op,
            value: value.into(),
        }
    }

    pub fn eq(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Eq, value)
    }

    pub fn ne(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Ne, value)
    }

    pub fn lt(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Lt, value)
    }

    pub fn gt(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Gt, value)
    }

    pub fn ge(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Ge, value)
    }

    pub fn le(column: Column, value: impl Into<Value>) -> Self {
        Self::compare(column, CmpOp::Le, value)
    }

    pub fn is_in<V: Into<Value>>(column: Column, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            column,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(column: Column) -> Self {
        Predicate::IsNull(column)
    }

    /// Rows matching exactly one of `a` and `b`.
    pub fn xor(a: Predicate, b: Predicate) -> Self {
        (a.clone() | b.clone()) & !(a & b)
    }

    /// Check every literal against the type of the column it is compared with.
    pub fn validate(&self) -> Result<()> {
        match self {
            Predicate::All | Predicate::IsNull(_) => Ok(()),
            Predicate::Compare { column, op, value } => {
                if value.is_null() && matches!(op, CmpOp::Eq | CmpOp::Ne) {
                    return Ok(());
                }
                check_type(*column, value)
            }
            Predicate::In { column, values } => {
                values.iter().try_for_each(|v| check_type(*column, v))
            }
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.validate()?;
                b.validate()
            }
            Predicate::Not(p) => p.validate(),
        }
    }

    /// Columns this predicate reads, in first-seen order.
    pub fn columns(&self) -> Vec<Column> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns(&self, out: &mut Vec<Column>) {
        match self {
            Predicate::All => {}
            Predicate::Compare { column, .. }
            | Predicate::In { column, .. }
            | Predicate::IsNull(column) => {
                if !out.contains(column) {
                    out.push(*column);
                }
            }
            Predicate::And(a, b) | Predicate::Or(a, b) => {
                a.collect_columns(out);
                b.collect_columns(out);
            }
            Predicate::Not(p) => p.collect_columns(out),
        }
    }

    /// Render as a SQL boolean expression, appending bind values to `params`.
    pub fn to_sql(&self, params: &mut Vec<SqlValue>) -> String {
        match self {
            Predicate::All => "1".to_string(),
            Predicate::Compare {
                column,
                op: CmpOp::Eq,
                value: Value::Null,
            } => format!("{} IS NULL", column.name()),
            Predicate::Compare {
                column,
                op: CmpOp::Ne,
                value: Value::Null,
            } => format!("{} IS NOT NULL", column.name()),
            Predicate::Compare { column, op, value } => {
                params.push(to_sql(value));
                known(*column, format!("{} {} ?", column.name(), op.sql()))
            }
            Predicate::In { values, .. } if values.is_empty() => "0".to_string(),
            Predicate::In { column, values } => {
                params.extend(values.iter().map(to_sql));
                let marks = vec!["?"; values.len()].join(", ");
                known(*column, format!("{} IN ({})", column.name(), marks))
            }
            Predicate::IsNull(column) => format!("{} IS NULL", column.name()),
            Predicate::And(a, b) => {
                format!("({} AND {})", a.to_sql(params), b.to_sql(params))
            }
            Predicate::Or(a, b) => {
                format!("({} OR {})", a.to_sql(params), b.to_sql(params))
            }
            Predicate::Not(p) => format!("NOT {}", p.to_sql(params)),
        }
    }

    /// ` WHERE ...` clause (empty for [`Predicate::All`]) plus its bind values.
    pub fn where_clause(&self) -> (String, Vec<SqlValue>) {
        if *self == Predicate::All {
            return (String::new(), Vec::new());
        }
        let mut params = Vec::new();
        let sql = format!(" WHERE {}", self.to_sql(&mut params));
        (sql, params)
    }
}

/// Guard a comparison on a nullable column so it cannot evaluate to NULL.
fn known(column: Column, comparison: String) -> String {
    if column.is_nullable() {
        format!("({comparison} AND {} IS NOT NULL)", column.name())
    } else {
        comparison
    }
}

fn check_type(column: Column, value: &Value) -> Result<()> {
    let expected = column.column_type();
    match value.value_type() {
        Some(found) if found == expected => Ok(()),
        found => Err(BenchError::TypeMismatch {
            column,
            expected,
            found: found.map_or("null", |t| t.name()).to_string(),
        }),
    }
}

/// Human-readable form with literals inlined, used in plan labels.
impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::All => f.write_str("all"),
            Predicate::Compare {
                column,
                op: CmpOp::Eq,
                value: Value::Null,
            }
            | Predicate::IsNull(column) => write!(f, "{column} IS NULL"),
            Predicate::Compare {
                column,
                op: CmpOp::Ne,
                value: Value::Null,
            } => write!(f, "{column} IS NOT NULL"),
            Predicate::Compare { column, op, value } => {
                write!(f, "{column} {} {value}", op.sql())
            }
            Predicate::In { column, values } => {
                let list = values
                    .iter()
                    .map(Value::canonical)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{column} IN ({list})")
            }
            Predicate::And(a, b) => write!(f, "({a} AND {b})"),
            Predicate::Or(a, b) => write!(f, "({a} OR {b})"),
            Predicate::Not(p) => write!(f, "NOT {p}"),
        }
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (a, b) => Predicate::And(Box::new(a), Box::new(b)),
        }
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        match (self, rhs) {
            (Predicate::All, _) | (_, Predicate::All) => Predicate::All,
            (a, b) => Predicate::Or(Box::new(a), Box::new(b)),
        }
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        match self {
            Predicate::Not(inner) => *inner,
            p => Predicate::Not(Box::new(p)),
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn compound_predicate_renders_in_order_with_params() {
        let a = Predicate::eq(Column::ClientId, 4i64);
        let b = Predicate::eq(Column::DatabookId, Uuid::from_u128(9));
        let (sql, params) = Predicate::xor(a, b).where_clause();
        assert_eq!(
            sql,
            " WHERE ((client_id = ? OR databook_id = ?) AND NOT (client_id = ? AND databook_id = ?))"
        );
        assert_eq!(params.len(), 4);
        assert_eq!(params[0], SqlValue::Integer(4));
        assert_eq!(params[2], SqlValue::Integer(4));
    }

    #[test]
    fn all_is_identity_for_and_and_absorbing_for_or() {
        let p = Predicate::eq(Column::ClientId, 1i64);
        assert_eq!(Predicate::All & p.clone(), p);
        assert_eq!(p.clone() | Predicate::All, Predicate::All);
        assert_eq!(!!p.clone(), p);
        assert_eq!(Predicate::All.where_clause(), (String::new(), vec![]));
    }

    #[test]
    fn null_equality_uses_is_null() {
        let mut params = Vec::new();
        let sql = Predicate::eq(Column::KnowledgeEndDate, Value::Null).to_sql(&mut params);
        assert_eq!(sql, "knowledge_end_date IS NULL");
        assert!(params.is_empty());
        let sql = Predicate::ne(Column::Data, Value::Null).to_sql(&mut params);
        assert_eq!(sql, "data IS NOT NULL");
    }

    #[test]
    fn nullable_comparisons_never_yield_null() {
        let mut params = Vec::new();
        let sql = (!Predicate::gt(Column::KnowledgeEndDate, 5i64)).to_sql(&mut params);
        assert_eq!(
            sql,
            "NOT (knowledge_end_date > ? AND knowledge_end_date IS NOT NULL)"
        );
        let sql = Predicate::is_in(Column::ClientId, [1i64]).to_sql(&mut params);
        assert_eq!(sql, "client_id IN (?)");
    }

    #[test]
    fn display_inlines_literals() {
        let p = Predicate::xor(
            Predicate::eq(Column::ClientId, 3i64),
            Predicate::is_null(Column::Data),
        );
        assert_eq!(
            p.to_string(),
            "((client_id = 3 OR data IS NULL) AND NOT (client_id = 3 AND data IS NULL))"
        );
        assert_eq!(Predicate::is_in(Column::Id, [1i64, 2]).to_string(), "id IN (1, 2)");
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let p = Predicate::is_in(Column::ClientId, Vec::<i64>::new());
        assert_eq!(p.to_sql(&mut Vec::new()), "0");
    }

    #[test]
    fn validate_rejects_wrongly_typed_literals() {
        let bad = Predicate::eq(Column::DatabookId, 5i64) & Predicate::gt(Column::ClientId, 1i64);
        match bad.validate() {
            Err(BenchError::TypeMismatch {
                column, found, ..
            }) => {
                assert_eq!(column, Column::DatabookId);
                assert_eq!(found, "integer");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
        assert!(Predicate::lt(Column::ClientId, Value::Null).validate().is_err());
        assert!(Predicate::eq(Column::ClientId, Value::Null).validate().is_ok());
        assert!(Predicate::is_in(Column::ClientId, [1i64, 2, 3]).validate().is_ok());
    }

    #[test]
    fn columns_are_collected_once() {
        let p = Predicate::xor(
            Predicate::eq(Column::ClientId, 1i64),
            Predicate::eq(Column::DatabookId, Uuid::nil()),
        );
        assert_eq!(p.columns(), vec![Column::ClientId, Column::DatabookId]);
    }
}
