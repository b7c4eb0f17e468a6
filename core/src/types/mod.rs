//! Data model of the benchmark table: columns, cell values and rows.

mod column;
mod record;
mod value;

pub use column::{Column, ColumnType, UnknownColumn};
pub use record::{BenchmarkRecord, NewRecord};
pub use value::{micros_to_timestamp, timestamp_to_micros, Offset, Value};
