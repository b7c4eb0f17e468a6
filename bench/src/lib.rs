//! Query-Strategy Benchmark
//!
//! Measures how ORM-style fetch patterns behave against one large, flat
//! SQLite table: projection vs. exclusion vs. key-value vs. flat-list fetches,
//! deduplication in the database vs. on the client, and paged streaming.
//! Every run reports wall-clock time and the number of database round-trips.
//!
//! Run benchmarks: `cargo bench`
//! Run the comparison report: `cargo run --release`
//! Run tests: `cargo test`

pub mod chunked;
pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod executor;
pub mod lazy;
pub mod populate;
pub mod predicate;
pub mod record;
pub mod report;
pub mod schema;
pub mod strategy;
pub mod update;

pub use error::{BenchError, Result};
