//! Criterion benchmark harness: measures fetch latency of every strategy on
//! an unindexed and an indexed table.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fb_core::types::{Column, Value};
use fetchbench::connection::TrackedConnection;
use fetchbench::executor::{Aggregate, Executor, Plan};
use fetchbench::populate::{seed, SeedParams};
use fetchbench::predicate::Predicate;
use fetchbench::schema::{configure_connection, TableSchema};
use fetchbench::strategy::{ResultSet, Strategy, StrategyRegistry};
use std::time::Duration;

const ROWS: usize = 20_000;
const PAGE_SIZE: usize = 1_000;

/// Create an in-memory SQLite database, populate it, and return the connection.
fn setup_db(schema: &TableSchema) -> TrackedConnection {
    let conn = TrackedConnection::open_in_memory().expect("Failed to open in-memory SQLite");
    configure_connection(&conn).expect("Failed to configure connection");
    seed(&conn, schema, &SeedParams::standard().with_rows(ROWS)).expect("Failed to populate");
    conn
}

fn some_databook(conn: &TrackedConnection, schema: &TableSchema) -> Value {
    let fetched = Executor::new(conn, schema)
        .fetch(&Strategy::DistinctFlatList(Column::DatabookId), &Predicate::All)
        .expect("distinct fetch failed");
    match fetched.result {
        ResultSet::Scalars { mut values, .. } => values.swap_remove(0),
        _ => unreachable!("distinct fetch returns scalars"),
    }
}

fn bench_strategies(c: &mut Criterion, group_name: &str, schema: TableSchema) {
    let conn = setup_db(&schema);
    let executor = Executor::new(&conn, &schema);
    let mut group = c.benchmark_group(group_name);
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    for strategy in StrategyRegistry::standard(PAGE_SIZE).strategies() {
        let plan = Plan::fetch(strategy.clone());
        group.bench_with_input(BenchmarkId::from_parameter(strategy), &plan, |b, plan| {
            b.iter(|| executor.run(plan).expect("fetch failed"));
        });
    }

    let by_databook = Predicate::eq(Column::DatabookId, some_databook(&conn, &schema));
    let filtered = [
        Plan::fetch(Strategy::Projection(vec![Column::DatabookId]))
            .filtered(by_databook.clone())
            .touching(&[Column::ClientId]),
        Plan::fetch(Strategy::FlatList(Column::Id))
            .filtered(by_databook.clone())
            .aggregate(Aggregate::Count),
        Plan::fetch(Strategy::FlatList(Column::Id))
            .filtered(by_databook)
            .aggregate(Aggregate::Exists),
    ];
    for plan in &filtered {
        group.bench_with_input(BenchmarkId::from_parameter(plan.label()), plan, |b, plan| {
            b.iter(|| executor.run(plan).expect("filtered run failed"));
        });
    }
    group.finish();
}

fn bench_unindexed(c: &mut Criterion) {
    bench_strategies(c, "fetch/unindexed", TableSchema::default());
}

fn bench_indexed(c: &mut Criterion) {
    let schema = TableSchema::default()
        .with_index(Column::DatabookId)
        .with_index(Column::ClientId);
    bench_strategies(c, "fetch/indexed", schema);
}

criterion_group!(benches, bench_unindexed, bench_indexed);
criterion_main!(benches);
