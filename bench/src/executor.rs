//! Runs plans (strategy + filter + aggregation) and database-side updates,
//! measuring wall-clock time and round-trips for each.

use crate::connection::TrackedConnection;
use crate::error::{BenchError, Result};
use crate::predicate::Predicate;
use crate::schema::TableSchema;
use crate::strategy::{Fetched, ResultSet, Strategy};
use crate::update::FieldUpdate;
use fb_core::types::Column;
use log::{debug, info};
use rusqlite::ErrorCode;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Materialize the rows with the plan's strategy.
    Fetch,
    /// Ask only whether any row matches.
    Exists,
    /// Ask only how many rows match.
    Count,
}

impl Aggregate {
    pub fn name(self) -> &'static str {
        match self {
            Aggregate::Fetch => "fetch",
            Aggregate::Exists => "exists",
            Aggregate::Count => "count",
        }
    }
}

/// One benchmarkable unit of work.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub strategy: Strategy,
    pub filter: Predicate,
    pub aggregate: Aggregate,
    /// Columns read from every fetched object after the fetch.
    pub touch: Vec<Column>,
}

impl Plan {
    pub fn fetch(strategy: Strategy) -> Self {
        Self {
            strategy,
            filter: Predicate::All,
            aggregate: Aggregate::Fetch,
            touch: Vec::new(),
        }
    }

    pub fn filtered(mut self, filter: Predicate) -> Self {
        self.filter = filter;
        self
    }

    pub fn aggregate(mut self, aggregate: Aggregate) -> Self {
        self.aggregate = aggregate;
        self
    }

    pub fn touching(mut self, columns: &[Column]) -> Self {
        self.touch = columns.to_vec();
        self
    }

    /// Label used in reports. Includes the filter unless it matches every row.
    pub fn label(&self) -> String {
        let base = match self.aggregate {
            Aggregate::Fetch if self.touch.is_empty() => self.strategy.to_string(),
            Aggregate::Fetch => {
                let touched = self
                    .touch
                    .iter()
                    .map(|c| c.name())
                    .collect::<Vec<_>>()
                    .join(",");
                format!("{} +read {}", self.strategy, touched)
            }
            other => other.name().to_string(),
        };
        match self.filter {
            Predicate::All => base,
            ref filter => format!("{base} where {filter}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rows(usize),
    Exists(bool),
    Count(u64),
}

impl Outcome {
    pub fn rows(self) -> u64 {
        match self {
            Outcome::Rows(n) => n as u64,
            Outcome::Exists(found) => u64::from(found),
            Outcome::Count(n) => n,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub label: String,
    pub elapsed: Duration,
    pub round_trips: u64,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub rows_affected: usize,
    pub elapsed: Duration,
    pub round_trips: u64,
}

/// `EXPLAIN QUERY PLAN` output for a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub details: Vec<String>,
}

impl QueryPlan {
    /// True when SQLite reaches the rows through an index rather than a full scan.
    pub fn uses_index(&self) -> bool {
        self.details
            .iter()
            .any(|d| d.contains(" INDEX ") || d.contains("INTEGER PRIMARY KEY"))
    }
}

impl fmt::Display for QueryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.details.join("; "))
    }
}

pub struct Executor<'c> {
    conn: &'c TrackedConnection,
    schema: &'c TableSchema,
}

impl<'c> Executor<'c> {
    pub fn new(conn: &'c TrackedConnection, schema: &'c TableSchema) -> Self {
        Self { conn, schema }
    }

    pub fn connection(&self) -> &'c TrackedConnection {
        self.conn
    }

    pub fn schema(&self) -> &'c TableSchema {
        self.schema
    }

    pub fn fetch(&self, strategy: &Strategy, filter: &Predicate) -> Result<Fetched<'c>> {
        strategy.fetch(self.conn, self.schema.table(), filter)
    }

    pub fn count(&self, filter: &Predicate) -> Result<u64> {
        filter.validate()?;
        let (where_sql, params) = filter.where_clause();
        let sql = format!("SELECT COUNT(*) FROM {}{where_sql}", self.schema.table());
        let n = self.conn.query_row(&sql, &params, |r| r.get::<_, i64>(0))?;
        Ok(n as u64)
    }

    pub fn exists(&self, filter: &Predicate) -> Result<bool> {
        filter.validate()?;
        let (where_sql, params) = filter.where_clause();
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {}{where_sql})",
            self.schema.table()
        );
        self.conn.query_row(&sql, &params, |r| r.get::<_, bool>(0))
    }

    /// Execute `plan` once and measure it.
    pub fn run(&self, plan: &Plan) -> Result<Measurement> {
        let before = self.conn.round_trips();
        let start = Instant::now();

        let outcome = match plan.aggregate {
            Aggregate::Fetch => {
                let fetched = self.fetch(&plan.strategy, &plan.filter)?;
                touch(&fetched.result, &plan.touch)?;
                Outcome::Rows(fetched.result.len())
            }
            Aggregate::Exists => Outcome::Exists(self.exists(&plan.filter)?),
            Aggregate::Count => Outcome::Count(self.count(&plan.filter)?),
        };

        let elapsed = start.elapsed();
        let round_trips = self.conn.round_trips() - before;
        debug!(
            "{}: {:?} in {:?} over {} round-trips",
            plan.label(),
            outcome,
            elapsed,
            round_trips
        );
        Ok(Measurement {
            label: plan.label(),
            elapsed,
            round_trips,
            outcome,
        })
    }

    /// Apply `update` to every row matching `filter` in one statement.
    ///
    /// Operand types are checked first; a mismatch returns before anything
    /// is sent to the database.
    pub fn update(&self, update: &FieldUpdate, filter: &Predicate) -> Result<UpdateOutcome> {
        let (sql, params) = update.to_sql(self.schema.table(), filter)?;
        let before = self.conn.round_trips();
        let start = Instant::now();
        let rows_affected = match self.conn.execute(&sql, &params) {
            Err(BenchError::Sqlite(e))
                if e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) =>
            {
                return Err(BenchError::OutOfRange {
                    column: update.target,
                });
            }
            other => other?,
        };
        let elapsed = start.elapsed();
        info!("update `{update}` changed {rows_affected} rows in {elapsed:?}");
        Ok(UpdateOutcome {
            rows_affected,
            elapsed,
            round_trips: self.conn.round_trips() - before,
        })
    }

    pub fn explain(&self, filter: &Predicate) -> Result<QueryPlan> {
        filter.validate()?;
        let (where_sql, params) = filter.where_clause();
        let sql = format!(
            "EXPLAIN QUERY PLAN SELECT id FROM {}{where_sql}",
            self.schema.table()
        );
        let details = self
            .conn
            .query_rows(&sql, &params, |r| r.get::<_, String>(3))?;
        Ok(QueryPlan { details })
    }
}

/// Read `columns` from every object in `result`.
///
/// Live objects load deferred columns on demand. Mapping records and flat
/// lists have nothing to load from, so asking for a column they lack fails.
fn touch(result: &ResultSet<'_>, columns: &[Column]) -> Result<()> {
    if columns.is_empty() {
        return Ok(());
    }
    match result {
        ResultSet::Live(records) => {
            for record in records {
                for &column in columns {
                    record.get(column)?;
                }
            }
        }
        ResultSet::Mappings(records) => {
            for record in records {
                for &column in columns {
                    record.get(column)?;
                }
            }
        }
        ResultSet::Scalars { column, values } => {
            if let Some(missing) = columns.iter().find(|c| *c != column) {
                if !values.is_empty() {
                    return Err(BenchError::KeyNotFound {
                        key: missing.name().to_string(),
                    });
                }
            }
        }
        ResultSet::Streamed { .. } => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_name_touched_columns_and_aggregates() {
        let plan = Plan::fetch(Strategy::Projection(vec![Column::DatabookId]));
        assert_eq!(plan.label(), "projection-fetch:databook_id");
        let plan = plan.touching(&[Column::ClientId, Column::Data]);
        assert_eq!(plan.label(), "projection-fetch:databook_id +read client_id,data");
        let plan = plan.aggregate(Aggregate::Count);
        assert_eq!(plan.label(), "count");
    }

    #[test]
    fn aggregate_labels_carry_their_filter() {
        let count = |client: i64| {
            Plan::fetch(Strategy::FlatList(Column::Id))
                .filtered(Predicate::eq(Column::ClientId, client))
                .aggregate(Aggregate::Count)
        };
        assert_eq!(count(1).label(), "count where client_id = 1");
        assert_ne!(count(1).label(), count(2).label());
        let exists = Plan::fetch(Strategy::FlatList(Column::Id))
            .filtered(Predicate::is_null(Column::KnowledgeEndDate))
            .aggregate(Aggregate::Exists);
        assert_eq!(exists.label(), "exists where knowledge_end_date IS NULL");
    }

    #[test]
    fn query_plan_detects_index_search() {
        let scan = QueryPlan {
            details: vec!["SCAN benchmark_record".to_string()],
        };
        assert!(!scan.uses_index());
        let search = QueryPlan {
            details: vec![
                "SEARCH benchmark_record USING COVERING INDEX benchmark_record_databook_id_idx (databook_id=?)"
                    .to_string(),
            ],
        };
        assert!(search.uses_index());
        let by_key = QueryPlan {
            details: vec!["SEARCH benchmark_record USING INTEGER PRIMARY KEY (rowid<?)".to_string()],
        };
        assert!(by_key.uses_index());
    }

    #[test]
    fn outcome_row_counts() {
        assert_eq!(Outcome::Rows(4).rows(), 4);
        assert_eq!(Outcome::Exists(true).rows(), 1);
        assert_eq!(Outcome::Exists(false).rows(), 0);
        assert_eq!(Outcome::Count(12).rows(), 12);
    }
}
