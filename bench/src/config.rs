//! Runner configuration, resolved from `FETCHBENCH_*` environment variables
//! (optionally seeded from a `.env` file).

use crate::error::{BenchError, Result};
use crate::schema::validate_identifier;
use fb_core::constants::{DEFAULT_PAGE_SIZE, DEFAULT_SEED, DEFAULT_TABLE};
use log::LevelFilter;
use std::env;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// SQLite file; `None` means an in-memory database.
    pub db_path: Option<String>,
    pub table: String,
    pub rows: usize,
    pub page_size: usize,
    pub warmup: u32,
    pub samples: u32,
    pub seed: u64,
    pub log_level: LevelFilter,
    pub log_file: Option<String>,
    /// Where to write the JSON summary, if anywhere.
    pub report_json: Option<String>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            table: DEFAULT_TABLE.to_string(),
            rows: 100_000,
            page_size: DEFAULT_PAGE_SIZE,
            warmup: 2,
            samples: 10,
            seed: DEFAULT_SEED,
            log_level: LevelFilter::Info,
            log_file: Some("fetchbench.log".to_string()),
            report_json: None,
        }
    }
}

impl BenchConfig {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let table = get("FETCHBENCH_TABLE").unwrap_or(defaults.table);
        validate_identifier(&table)?;

        let page_size = parse_or("FETCHBENCH_PAGE_SIZE", get("FETCHBENCH_PAGE_SIZE"), defaults.page_size)?;
        if page_size == 0 {
            return Err(invalid("FETCHBENCH_PAGE_SIZE", "must be at least 1"));
        }
        let samples = parse_or("FETCHBENCH_SAMPLES", get("FETCHBENCH_SAMPLES"), defaults.samples)?;
        if samples == 0 {
            return Err(invalid("FETCHBENCH_SAMPLES", "must be at least 1"));
        }

        let log_level = match get("FETCHBENCH_LOG_LEVEL") {
            None => defaults.log_level,
            Some(v) => parse_log_level(&v)
                .ok_or_else(|| invalid("FETCHBENCH_LOG_LEVEL", &format!("unknown level '{v}'")))?,
        };

        let log_file = match get("FETCHBENCH_LOG_FILE") {
            Some(v) if v.eq_ignore_ascii_case("none") => None,
            Some(v) => Some(v),
            None => defaults.log_file,
        };

        Ok(Self {
            db_path: get("FETCHBENCH_DB_PATH").filter(|p| p != ":memory:"),
            table,
            rows: parse_or("FETCHBENCH_ROWS", get("FETCHBENCH_ROWS"), defaults.rows)?,
            page_size,
            warmup: parse_or("FETCHBENCH_WARMUP", get("FETCHBENCH_WARMUP"), defaults.warmup)?,
            samples,
            seed: parse_or("FETCHBENCH_SEED", get("FETCHBENCH_SEED"), defaults.seed)?,
            log_level,
            log_file,
            report_json: get("FETCHBENCH_REPORT_JSON"),
        })
    }
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

fn parse_or<T: std::str::FromStr>(name: &'static str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(v) => v
            .replace('_', "")
            .parse::<T>()
            .map_err(|_| invalid(name, &format!("'{v}' is not a valid number"))),
    }
}

fn invalid(name: &'static str, reason: &str) -> BenchError {
    BenchError::InvalidConfig {
        name,
        reason: reason.to_string(),
    }
}
