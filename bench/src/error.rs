use fb_core::types::{Column, ColumnType, UnknownColumn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A mapping record was asked for a column it was not fetched with.
    #[error("key '{key}' not present in mapping record")]
    KeyNotFound { key: String },

    /// A deferred column could not be loaded because its row is gone.
    #[error("row {id} no longer exists in '{table}'")]
    RowNotFound { table: String, id: i64 },

    #[error("type mismatch on '{column}': expected {expected}, found {found}")]
    TypeMismatch {
        column: Column,
        expected: ColumnType,
        found: String,
    },

    #[error("column '{0}' cannot be updated")]
    ImmutableColumn(Column),

    #[error("column '{0}' is required and cannot be set to NULL")]
    NullViolation(Column),

    /// The result of an update would not fit in the column's integer storage.
    #[error("update of '{column}' overflows its storage range")]
    OutOfRange { column: Column },

    #[error(transparent)]
    UnknownColumn(#[from] UnknownColumn),

    #[error("unknown strategy '{0}'")]
    UnknownStrategy(String),

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("invalid value for {name}: {reason}")]
    InvalidConfig { name: &'static str, reason: String },

    #[error("cannot decode column '{column}': {reason}")]
    Decode { column: Column, reason: String },
}

pub type Result<T> = std::result::Result<T, BenchError>;
