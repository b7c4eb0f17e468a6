//! Schema definition for the benchmark table and its optional indexes.

use crate::connection::TrackedConnection;
use crate::error::{BenchError, Result};
use fb_core::constants::DEFAULT_TABLE;
use fb_core::types::Column;
use log::debug;

/// A B-tree index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub columns: Vec<Column>,
}

impl IndexDef {
    /// Index named `<table>_<col>_<col>_idx`.
    pub fn on(table: &str, columns: &[Column]) -> Self {
        let suffix = columns
            .iter()
            .map(|c| c.name())
            .collect::<Vec<_>>()
            .join("_");
        Self {
            name: format!("{table}_{suffix}_idx"),
            columns: columns.to_vec(),
        }
    }
}

/// The benchmark table: its name plus whatever indexes are declared on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    table: String,
    indexes: Vec<IndexDef>,
}

impl TableSchema {
    /// Unindexed table called `table`.
    pub fn new(table: &str) -> Result<Self> {
        validate_identifier(table)?;
        Ok(Self {
            table: table.to_string(),
            indexes: Vec::new(),
        })
    }

    /// Declare an additional single-column index.
    pub fn with_index(mut self, column: Column) -> Self {
        self.add_index(&[column]);
        self
    }

    /// Declare an additional index over `columns`.
    pub fn with_compound_index(mut self, columns: &[Column]) -> Self {
        self.add_index(columns);
        self
    }

    fn add_index(&mut self, columns: &[Column]) {
        let index = IndexDef::on(&self.table, columns);
        if !self.indexes.contains(&index) {
            self.indexes.push(index);
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn indexes(&self) -> &[IndexDef] {
        &self.indexes
    }

    /// True if some declared index has `column` as its leading column.
    pub fn is_indexed(&self, column: Column) -> bool {
        column.is_primary_key()
            || self
                .indexes
                .iter()
                .any(|idx| idx.columns.first() == Some(&column))
    }

    pub fn create_table_sql(&self) -> String {
        let columns = Column::ALL
            .iter()
            .map(|&c| {
                if c.is_primary_key() {
                    return format!("{} INTEGER PRIMARY KEY", c.name());
                }
                let mut def = format!("{} {}", c.name(), c.column_type().sql_type());
                if !c.is_nullable() {
                    def.push_str(" NOT NULL");
                }
                // SQLite turns overflowing integer arithmetic into REAL.
                if c.column_type().sql_type() == "INTEGER" {
                    def.push_str(&format!(" CHECK (typeof({}) <> 'real')", c.name()));
                }
                def
            })
            .collect::<Vec<_>>()
            .join(",\n    ");
        format!("CREATE TABLE IF NOT EXISTS {} (\n    {}\n)", self.table, columns)
    }

    /// Create the table and every declared index.
    pub fn create(&self, conn: &TrackedConnection) -> Result<()> {
        conn.execute_batch(&self.create_table_sql())?;
        self.create_indexes(conn)
    }

    pub fn create_indexes(&self, conn: &TrackedConnection) -> Result<()> {
        for idx in &self.indexes {
            let cols = idx
                .columns
                .iter()
                .map(|c| c.name())
                .collect::<Vec<_>>()
                .join(", ");
            debug!("creating index {} on {}({})", idx.name, self.table, cols);
            conn.execute_batch(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} ({})",
                idx.name, self.table, cols
            ))?;
        }
        Ok(())
    }

    pub fn drop_indexes(&self, conn: &TrackedConnection) -> Result<()> {
        for idx in &self.indexes {
            debug!("dropping index {}", idx.name);
            conn.execute_batch(&format!("DROP INDEX IF EXISTS {}", idx.name))?;
        }
        Ok(())
    }

    pub fn row_count(&self, conn: &TrackedConnection) -> Result<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table);
        conn.query_row(&sql, &[], |r| r.get::<_, i64>(0))
            .map(|n| n as u64)
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
            indexes: Vec::new(),
        }
    }
}

/// Table and index names are spliced into SQL, so only plain identifiers pass.
pub fn validate_identifier(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(BenchError::InvalidTableName(name.to_string()))
    }
}

/// Configure a connection for maximum in-memory performance.
pub fn configure_connection(conn: &TrackedConnection) -> Result<()> {
    conn.inner().execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = OFF;
         PRAGMA cache_size = -131072;
         PRAGMA mmap_size = 268435456;
         PRAGMA temp_store = MEMORY;",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_identifier_table_names() {
        assert!(TableSchema::new("benchmark_record").is_ok());
        assert!(TableSchema::new("_t1").is_ok());
        for bad in ["", "1abc", "drop table x", "t;--", "naïve"] {
            assert!(
                matches!(TableSchema::new(bad), Err(BenchError::InvalidTableName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn create_table_marks_required_columns_not_null() {
        let sql = TableSchema::default().create_table_sql();
        assert!(sql.contains("id INTEGER PRIMARY KEY"));
        assert!(sql.contains("knowledge_begin_date INTEGER NOT NULL CHECK"));
        assert!(sql.contains("knowledge_end_date INTEGER CHECK (typeof(knowledge_end_date) <> 'real'),"));
        assert!(sql.contains("client_id INTEGER NOT NULL CHECK (typeof(client_id) <> 'real')"));
        assert!(sql.contains("databook_id TEXT NOT NULL"));
        assert!(sql.contains("data TEXT\n"));
    }

    #[test]
    fn duplicate_indexes_are_declared_once() {
        let schema = TableSchema::default()
            .with_index(Column::DatabookId)
            .with_index(Column::DatabookId)
            .with_compound_index(&[Column::ClientId, Column::DatabookId]);
        assert_eq!(schema.indexes().len(), 2);
        assert!(schema.is_indexed(Column::DatabookId));
        assert!(schema.is_indexed(Column::ClientId));
        assert!(schema.is_indexed(Column::Id));
        assert!(!schema.is_indexed(Column::DatasheetId));
    }

    #[test]
    fn create_and_drop_indexes() {
        let conn = TrackedConnection::open_in_memory().unwrap();
        let schema = TableSchema::default().with_index(Column::ClientId);
        schema.create(&conn).unwrap();

        let count_indexes = |conn: &TrackedConnection| -> i64 {
            conn.inner()
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = ?1",
                    [&schema.indexes()[0].name],
                    |r| r.get(0),
                )
                .unwrap()
        };
        assert_eq!(count_indexes(&conn), 1);
        schema.drop_indexes(&conn).unwrap();
        assert_eq!(count_indexes(&conn), 0);
        assert_eq!(schema.row_count(&conn).unwrap(), 0);
    }
}
