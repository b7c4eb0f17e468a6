//! Data population: generates a synthetic, denormalized record set and bulk
//! inserts it.
//!
//! Generation is deterministic for a given seed, so repeated runs benchmark
//! the same table contents.

use crate::codec::to_sql;
use crate::connection::TrackedConnection;
use crate::error::Result;
use crate::schema::TableSchema;
use chrono::Duration;
use fb_core::constants::{DEFAULT_SEED, SYNTHETIC_EPOCH_MICROS, SYNTHETIC_WINDOW_MICROS};
use fb_core::types::{micros_to_timestamp, NewRecord, Value};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::params_from_iter;
use serde_json::json;
use uuid::Uuid;

const CURRENCIES: [&str; 4] = ["USD", "EUR", "INR", "GBP"];

/// Shape of the synthetic data set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedParams {
    pub rows: usize,
    /// Distinct `client_id` values (1..=clients).
    pub clients: usize,
    /// Distinct `databook_id` values.
    pub databooks: usize,
    /// Distinct `datasheet_id` values per databook.
    pub datasheets_per_databook: usize,
    pub seed: u64,
}

impl SeedParams {
    /// Standard data set: 100k rows over 50 clients and 200 databooks.
    pub fn standard() -> Self {
        Self {
            rows: 100_000,
            clients: 50,
            databooks: 200,
            datasheets_per_databook: 8,
            seed: DEFAULT_SEED,
        }
    }

    /// Stressed data set: 1M rows over 500 clients and 2000 databooks.
    pub fn stressed() -> Self {
        Self {
            rows: 1_000_000,
            clients: 500,
            databooks: 2_000,
            datasheets_per_databook: 8,
            seed: DEFAULT_SEED,
        }
    }

    pub fn with_rows(mut self, rows: usize) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Draw a UUID from `rng` so the same seed yields the same identifiers.
fn seeded_uuid(rng: &mut StdRng) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// Generate synthetic records matching `params`.
pub fn generate_synthetic(params: &SeedParams) -> Vec<NewRecord> {
    let mut rng = StdRng::seed_from_u64(params.seed);

    let databooks: Vec<Uuid> = (0..params.databooks.max(1))
        .map(|_| seeded_uuid(&mut rng))
        .collect();
    let datasheets: Vec<Vec<Uuid>> = databooks
        .iter()
        .map(|_| {
            (0..params.datasheets_per_databook.max(1))
                .map(|_| seeded_uuid(&mut rng))
                .collect()
        })
        .collect();

    let epoch = micros_to_timestamp(SYNTHETIC_EPOCH_MICROS).unwrap_or_default();
    let mut records = Vec::with_capacity(params.rows);
    for i in 0..params.rows {
        let book = rng.gen_range(0..databooks.len());
        let sheet = rng.gen_range(0..datasheets[book].len());
        let begin =
            epoch + Duration::microseconds(rng.gen_range(0..SYNTHETIC_WINDOW_MICROS));
        let client_id = rng.gen_range(1..=params.clients.max(1)) as i64;

        let mut record =
            NewRecord::new(begin, client_id, databooks[book], datasheets[book][sheet]);

        // Roughly one row in ten carries no document.
        if rng.gen_ratio(9, 10) {
            let amount = rng.gen_range(0..1_000_000) as f64 / 100.0;
            let currency = CURRENCIES[rng.gen_range(0..CURRENCIES.len())];
            let tags: Vec<String> = (0..rng.gen_range(0..4)).map(|t| format!("tag{t}")).collect();
            record = record.with_data(json!({
                "row": i,
                "amount": amount,
                "currency": currency,
                "tags": tags,
            }));
        }
        records.push(record);
    }
    records
}

/// Bulk insert `records` in one transaction. Returns the number inserted.
///
/// Seeding goes through the raw connection and is not counted as benchmark
/// round-trips.
pub fn insert_records(
    conn: &TrackedConnection,
    schema: &TableSchema,
    records: &[NewRecord],
) -> Result<usize> {
    let tx = conn.inner().unchecked_transaction()?;
    {
        let mut stmt = tx.prepare_cached(&format!(
            "INSERT INTO {} (knowledge_begin_date, knowledge_end_date, client_id,
                             databook_id, datasheet_id, data)
             VALUES (?1, NULL, ?2, ?3, ?4, ?5)",
            schema.table()
        ))?;
        for record in records {
            let row = [
                to_sql(&Value::Timestamp(record.knowledge_begin_date)),
                to_sql(&Value::Integer(record.client_id)),
                to_sql(&Value::Uuid(record.databook_id)),
                to_sql(&Value::Uuid(record.datasheet_id)),
                to_sql(&record.data.clone().into()),
            ];
            stmt.execute(params_from_iter(row.iter()))?;
        }
    }
    tx.commit()?;
    Ok(records.len())
}

/// Create the table (if needed) and fill it with synthetic data.
pub fn seed(conn: &TrackedConnection, schema: &TableSchema, params: &SeedParams) -> Result<usize> {
    schema.create(conn)?;
    info!(
        "Generating {} synthetic rows ({} clients, {} databooks) into '{}'",
        params.rows,
        params.clients,
        params.databooks,
        schema.table()
    );
    let records = generate_synthetic(params);
    let inserted = insert_records(conn, schema, &records)?;
    info!("Inserted {inserted} rows into '{}'", schema.table());
    Ok(inserted)
}
