//! Shared constants for the benchmark table and its synthetic data.

/// Table name used when none is configured.
pub const DEFAULT_TABLE: &str = "benchmark_record";

/// Default page size for chunked iteration.
pub const DEFAULT_PAGE_SIZE: usize = 2_000;

/// Offset applied by the canonical `end = begin + N days` update.
pub const KNOWLEDGE_OFFSET_DAYS: i64 = 10;

pub const MICROS_PER_SECOND: i64 = 1_000_000;
pub const MICROS_PER_DAY: i64 = 86_400 * MICROS_PER_SECOND;

/// Seed used for synthetic data unless overridden.
pub const DEFAULT_SEED: u64 = 0x5EED_DA7A_B00C_0001;

/// Earliest synthetic `knowledge_begin_date`: 2020-01-01T00:00:00Z.
pub const SYNTHETIC_EPOCH_MICROS: i64 = 1_577_836_800 * MICROS_PER_SECOND;

/// Width of the window synthetic begin dates are drawn from (roughly four years).
pub const SYNTHETIC_WINDOW_MICROS: i64 = 4 * 365 * MICROS_PER_DAY;
