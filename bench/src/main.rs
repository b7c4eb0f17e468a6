//! Standalone benchmark runner that prints the formatted report.
//!
//! Seeds the table, runs every plan unindexed, then again with indexes on
//! `databook_id` and `client_id`, and finally demonstrates the database-side
//! update. Configuration comes from `FETCHBENCH_*` environment variables.
//!
//! Usage:
//!   cargo run --release
//!   cargo run --release -- 'flat-list-fetch:client_id;chunked-iteration:500'

use anyhow::Context;
use fb_core::initialize_logger;
use fb_core::types::{Column, Offset, Value};
use fetchbench::config::BenchConfig;
use fetchbench::connection::TrackedConnection;
use fetchbench::executor::{Aggregate, Executor, Plan};
use fetchbench::populate::{seed, SeedParams};
use fetchbench::predicate::Predicate;
use fetchbench::report::{print_report, write_json, StrategyResult};
use fetchbench::schema::{configure_connection, TableSchema};
use fetchbench::strategy::{ResultSet, Strategy, StrategyRegistry};
use fetchbench::update::FieldUpdate;
use fetchbench::BenchError;
use log::{error, info, warn};
use std::path::Path;

fn bench_plan(
    executor: &Executor<'_>,
    plan: &Plan,
    layout: &str,
    config: &BenchConfig,
) -> anyhow::Result<StrategyResult> {
    let index_used = executor.explain(&plan.filter)?.uses_index();

    for _ in 0..config.warmup {
        executor
            .run(plan)
            .with_context(|| format!("warmup run of {}", plan.label()))?;
    }

    let mut result = StrategyResult::new(&plan.label(), layout, index_used);
    for _ in 0..config.samples {
        let m = executor
            .run(plan)
            .with_context(|| format!("sample run of {}", plan.label()))?;
        result.add_sample(&m);
    }
    Ok(result)
}

fn run_suite(
    executor: &Executor<'_>,
    plans: &[Plan],
    layout: &str,
    config: &BenchConfig,
) -> anyhow::Result<Vec<StrategyResult>> {
    let mut results = Vec::new();
    for plan in plans {
        eprint!("  Benchmarking {}/{layout}...", plan.label());
        let r = bench_plan(executor, plan, layout, config)?;
        eprintln!(" done ({:.2}ms mean)", r.mean_us() / 1000.0);
        results.push(r);
    }
    Ok(results)
}

/// Any databook and client present in the table, used to build filters.
fn sample_keys(executor: &Executor<'_>) -> anyhow::Result<Option<(Value, Value)>> {
    let first = |column: Column| -> anyhow::Result<Option<Value>> {
        let fetched = executor.fetch(&Strategy::DistinctFlatList(column), &Predicate::All)?;
        Ok(match fetched.result {
            ResultSet::Scalars { values, .. } => values.into_iter().next(),
            _ => None,
        })
    };
    Ok(first(Column::DatabookId)?.zip(first(Column::ClientId)?))
}

fn build_plans(registry: &StrategyRegistry, keys: Option<&(Value, Value)>) -> Vec<Plan> {
    let mut plans: Vec<Plan> = registry
        .strategies()
        .iter()
        .cloned()
        .map(Plan::fetch)
        .collect();

    let Some((databook, client)) = keys else {
        return plans;
    };
    let by_databook = Predicate::eq(Column::DatabookId, databook.clone());
    let by_client = Predicate::eq(Column::ClientId, client.clone());

    plans.push(
        Plan::fetch(Strategy::Projection(vec![Column::DatabookId]))
            .filtered(by_databook.clone())
            .touching(&[Column::KnowledgeBeginDate]),
    );
    plans.push(
        Plan::fetch(Strategy::Mapping(vec![Column::Id, Column::ClientId]))
            .filtered(Predicate::xor(by_databook.clone(), by_client.clone())),
    );
    plans.push(
        Plan::fetch(Strategy::FlatList(Column::Id))
            .filtered(by_databook.clone())
            .aggregate(Aggregate::Count),
    );
    plans.push(
        Plan::fetch(Strategy::FlatList(Column::Id))
            .filtered(by_client)
            .aggregate(Aggregate::Exists),
    );
    plans
}

fn demonstrate_update(executor: &Executor<'_>, databook: &Value) -> anyhow::Result<()> {
    println!("\n── Database-side update ───────────────────────────────");
    let filter = Predicate::eq(Column::DatabookId, databook.clone());
    let offset = Offset::days(fb_core::constants::KNOWLEDGE_OFFSET_DAYS)
        .context("knowledge offset does not fit in a timestamp")?;

    let update = FieldUpdate::add(
        Column::KnowledgeEndDate,
        Column::KnowledgeBeginDate,
        offset,
    );
    let outcome = executor.update(&update, &filter)?;
    println!(
        "  {update} where databook_id = {databook}: {} rows in {:?} ({} round-trip)",
        outcome.rows_affected, outcome.elapsed, outcome.round_trips
    );

    let mismatched = FieldUpdate::add(
        Column::KnowledgeEndDate,
        Column::ClientId,
        offset,
    );
    let trips_before = executor.connection().round_trips();
    match executor.update(&mismatched, &filter) {
        Err(e @ BenchError::TypeMismatch { .. }) => println!(
            "  {mismatched}: rejected before execution ({e}); {} statements sent",
            executor.connection().round_trips() - trips_before
        ),
        Err(e) => return Err(e.into()),
        Ok(o) => warn!("mismatched update unexpectedly changed {} rows", o.rows_affected),
    }
    Ok(())
}

fn run(config: &BenchConfig) -> anyhow::Result<()> {
    let registry = match std::env::args().nth(1) {
        Some(list) => StrategyRegistry::parse(&list).context("parsing strategy list")?,
        None => StrategyRegistry::standard(config.page_size),
    };

    let conn = match &config.db_path {
        Some(path) => TrackedConnection::open(path)
            .with_context(|| format!("opening database {path}"))?,
        None => TrackedConnection::open_in_memory()?,
    };
    configure_connection(&conn)?;

    let indexed = TableSchema::new(&config.table)?
        .with_index(Column::DatabookId)
        .with_index(Column::ClientId);
    let plain = TableSchema::new(&config.table)?;

    plain.create(&conn)?;
    indexed.drop_indexes(&conn)?;
    let existing = plain.row_count(&conn)?;
    if existing == 0 {
        let params = SeedParams::standard()
            .with_rows(config.rows)
            .with_seed(config.seed);
        seed(&conn, &plain, &params)?;
    } else {
        info!("Reusing {existing} rows already in '{}'", plain.table());
    }

    println!("Running fetch strategy benchmark...");
    println!("  Strategies:    {}", registry.names().join(", "));
    println!("  Warmup runs:   {}", config.warmup);
    println!("  Sample runs:   {}", config.samples);

    let keys = sample_keys(&Executor::new(&conn, &plain))?;
    let plans = build_plans(&registry, keys.as_ref());
    let mut results = Vec::new();

    // ── Unindexed ───────────────────────────────────────────────────
    println!("\n── Unindexed table ────────────────────────────────────");
    results.extend(run_suite(&Executor::new(&conn, &plain), &plans, "unindexed", config)?);

    // ── Indexed ─────────────────────────────────────────────────────
    println!("\n── Indexed table ──────────────────────────────────────");
    indexed.create_indexes(&conn)?;
    let executor = Executor::new(&conn, &indexed);
    results.extend(run_suite(&executor, &plans, "indexed", config)?);

    match &keys {
        Some((databook, _)) => demonstrate_update(&executor, databook)?,
        None => eprintln!("  Table is empty, skipping update demonstration."),
    }

    print_report(&results);

    if let Some(path) = &config.report_json {
        write_json(&results, Path::new(path))
            .with_context(|| format!("writing JSON report to {path}"))?;
        info!("JSON report written to {path}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = BenchConfig::from_env().context("reading FETCHBENCH_* configuration")?;
    initialize_logger(config.log_level, config.log_file.as_deref())?;

    if let Err(e) = run(&config) {
        error!("benchmark failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
