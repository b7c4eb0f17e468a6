//! Fetch strategies and the registry the runner picks them from.
//!
//! Every strategy answers the same question ("which rows match this filter")
//! with a different trade-off between round-trips, payload per row and client
//! memory. [`Strategy::fetch`] reports the round-trips each one spent.

use crate::chunked::ChunkedIter;
use crate::codec::{column_list, read_value, read_values};
use crate::connection::TrackedConnection;
use crate::error::{BenchError, Result};
use crate::predicate::Predicate;
use crate::record::{LiveRecord, MappingRecord};
use fb_core::constants::DEFAULT_PAGE_SIZE;
use fb_core::types::{Column, Value};
use log::debug;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Live objects with only the named columns loaded.
    Projection(Vec<Column>),
    /// Live objects with every column except the named ones loaded.
    Exclusion(Vec<Column>),
    /// Detached key-value records of the named columns.
    Mapping(Vec<Column>),
    /// Bare values of one column.
    FlatList(Column),
    /// Bare values of one column, deduplicated by the database.
    DistinctFlatList(Column),
    /// Full records streamed in pages of `page_size`.
    Chunked { page_size: usize },
}

/// What a strategy hands back.
#[derive(Debug)]
pub enum ResultSet<'c> {
    Live(Vec<LiveRecord<'c>>),
    Mappings(Vec<MappingRecord>),
    Scalars { column: Column, values: Vec<Value> },
    Streamed {
        rows: usize,
        pages: u64,
        peak_buffered: usize,
    },
}

impl ResultSet<'_> {
    pub fn len(&self) -> usize {
        match self {
            ResultSet::Live(v) => v.len(),
            ResultSet::Mappings(v) => v.len(),
            ResultSet::Scalars { values, .. } => values.len(),
            ResultSet::Streamed { rows, .. } => *rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Fetched<'c> {
    pub result: ResultSet<'c>,
    pub round_trips: u64,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Projection(_) => "projection-fetch",
            Strategy::Exclusion(_) => "exclusion-fetch",
            Strategy::Mapping(_) => "mapping-fetch",
            Strategy::FlatList(_) => "flat-list-fetch",
            Strategy::DistinctFlatList(_) => "database-distinct-fetch",
            Strategy::Chunked { .. } => "chunked-iteration",
        }
    }

    /// Columns a row of the first query carries, primary key first for live objects.
    pub fn selected_columns(&self) -> Vec<Column> {
        match self {
            Strategy::Projection(cols) => with_primary_key(cols.iter().copied()),
            Strategy::Exclusion(excluded) => {
                with_primary_key(Column::ALL.into_iter().filter(|c| !excluded.contains(c)))
            }
            Strategy::Mapping(cols) => dedup(cols.iter().copied()),
            Strategy::FlatList(col) | Strategy::DistinctFlatList(col) => vec![*col],
            Strategy::Chunked { .. } => Column::ALL.to_vec(),
        }
    }

    /// Run the strategy against `table`, returning its results and the
    /// round-trips it took to produce them.
    pub fn fetch<'c>(
        &self,
        conn: &'c TrackedConnection,
        table: &str,
        filter: &Predicate,
    ) -> Result<Fetched<'c>> {
        filter.validate()?;
        let columns = self.selected_columns();
        if columns.is_empty() {
            return Err(BenchError::UnknownStrategy(self.to_string()));
        }
        let before = conn.round_trips();
        let (where_sql, params) = filter.where_clause();

        let result = match self {
            Strategy::Projection(_) | Strategy::Exclusion(_) => {
                let sql = format!(
                    "SELECT {} FROM {table}{where_sql} ORDER BY id",
                    column_list(&columns)
                );
                debug!("{}: {sql}", self.name());
                let rows = conn.query_rows(&sql, &params, |row| read_values(row, &columns))?;
                let table: Rc<str> = Rc::from(table);
                let records = rows
                    .into_iter()
                    .map(|values| {
                        let id = values.first().and_then(Value::as_integer).unwrap_or_default();
                        LiveRecord::new(conn, &table, id, columns.iter().copied().zip(values))
                    })
                    .collect();
                ResultSet::Live(records)
            }
            Strategy::Mapping(_) => {
                let sql = format!(
                    "SELECT {} FROM {table}{where_sql} ORDER BY id",
                    column_list(&columns)
                );
                debug!("{}: {sql}", self.name());
                let rows = conn.query_rows(&sql, &params, |row| {
                    Ok(MappingRecord::new(
                        columns.iter().copied().zip(read_values(row, &columns)?),
                    ))
                })?;
                ResultSet::Mappings(rows)
            }
            Strategy::FlatList(column) => {
                let sql = format!("SELECT {column} FROM {table}{where_sql} ORDER BY id");
                debug!("{}: {sql}", self.name());
                let values = conn.query_rows(&sql, &params, |row| read_value(row, 0, *column))?;
                ResultSet::Scalars {
                    column: *column,
                    values,
                }
            }
            Strategy::DistinctFlatList(column) => {
                let sql = format!("SELECT DISTINCT {column} FROM {table}{where_sql} ORDER BY {column}");
                debug!("{}: {sql}", self.name());
                let values = conn.query_rows(&sql, &params, |row| read_value(row, 0, *column))?;
                ResultSet::Scalars {
                    column: *column,
                    values,
                }
            }
            Strategy::Chunked { page_size } => {
                let mut iter = ChunkedIter::new(conn, table, filter, *page_size);
                let mut rows = 0usize;
                for record in iter.by_ref() {
                    record?;
                    rows += 1;
                }
                ResultSet::Streamed {
                    rows,
                    pages: iter.pages(),
                    peak_buffered: iter.peak_buffered(),
                }
            }
        };

        Ok(Fetched {
            result,
            round_trips: conn.round_trips() - before,
        })
    }
}

fn dedup(columns: impl Iterator<Item = Column>) -> Vec<Column> {
    let mut out: Vec<Column> = Vec::new();
    for c in columns {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

fn with_primary_key(columns: impl Iterator<Item = Column>) -> Vec<Column> {
    dedup(std::iter::once(Column::Id).chain(columns))
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |cols: &[Column]| column_list(cols).replace(", ", ",");
        match self {
            Strategy::Projection(cols) | Strategy::Exclusion(cols) | Strategy::Mapping(cols) => {
                write!(f, "{}:{}", self.name(), list(cols))
            }
            Strategy::FlatList(col) | Strategy::DistinctFlatList(col) => {
                write!(f, "{}:{}", self.name(), col)
            }
            Strategy::Chunked { page_size } => write!(f, "{}:{}", self.name(), page_size),
        }
    }
}

fn parse_columns(args: &str) -> Result<Vec<Column>> {
    args.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Column>().map_err(BenchError::from))
        .collect()
}

fn parse_single_column(args: &str) -> Result<Column> {
    let name = if args.trim().is_empty() {
        Column::DatabookId.name()
    } else {
        args
    };
    Ok(name.parse::<Column>()?)
}

impl FromStr for Strategy {
    type Err = BenchError;

    /// `name[:args]`, e.g. `projection-fetch:client_id,databook_id` or
    /// `chunked-iteration:500`. Single-column strategies default to
    /// `databook_id`; chunked iteration defaults to the standard page size.
    fn from_str(s: &str) -> Result<Self> {
        let (name, args) = s.trim().split_once(':').unwrap_or((s.trim(), ""));
        match name {
            "projection-fetch" => Ok(Strategy::Projection(parse_columns(args)?)),
            "exclusion-fetch" => Ok(Strategy::Exclusion(parse_columns(args)?)),
            "mapping-fetch" => match parse_columns(args)? {
                cols if cols.is_empty() => Err(BenchError::UnknownStrategy(s.to_string())),
                cols => Ok(Strategy::Mapping(cols)),
            },
            "flat-list-fetch" => Ok(Strategy::FlatList(parse_single_column(args)?)),
            "database-distinct-fetch" => Ok(Strategy::DistinctFlatList(parse_single_column(args)?)),
            "chunked-iteration" => {
                let page_size = if args.trim().is_empty() {
                    DEFAULT_PAGE_SIZE
                } else {
                    args.trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|&n| n > 0)
                        .ok_or_else(|| BenchError::UnknownStrategy(s.to_string()))?
                };
                Ok(Strategy::Chunked { page_size })
            }
            _ => Err(BenchError::UnknownStrategy(s.to_string())),
        }
    }
}

/// The set of strategies a run compares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyRegistry {
    strategies: Vec<Strategy>,
}

impl StrategyRegistry {
    /// One instance of every variant, configured the way the comparison
    /// report expects: projections of the two identifier columns, the JSON
    /// document excluded, and `databook_id` as the flat/distinct column.
    pub fn standard(page_size: usize) -> Self {
        Self {
            strategies: vec![
                Strategy::Projection(vec![Column::ClientId, Column::DatabookId]),
                Strategy::Exclusion(vec![Column::Data]),
                Strategy::Mapping(vec![Column::Id, Column::ClientId, Column::DatabookId]),
                Strategy::FlatList(Column::DatabookId),
                Strategy::DistinctFlatList(Column::DatabookId),
                Strategy::Chunked { page_size },
            ],
        }
    }

    /// Parse a `;`-separated list of strategies, e.g.
    /// `flat-list-fetch:client_id;chunked-iteration:100`.
    pub fn parse(list: &str) -> Result<Self> {
        let strategies = list
            .split(';')
            .filter(|s| !s.trim().is_empty())
            .map(str::parse::<Strategy>)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { strategies })
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(Strategy::name).collect()
    }
}
