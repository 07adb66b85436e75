//! Deterministic demonstration dataset.
//!
//! Rows are produced in the raw textual form of the inventory export
//! (`"R$ 1234,56"`, `"42.5%"`, ISO dates) so they flow through the same
//! normalization as real files.

use chrono::{Duration, NaiveDate};
use rand::prelude::*;

use crate::ingest::SourceBatch;
use crate::parser::{Column, RawRow};

/// Rows generated by default
pub const DEMO_ROWS: usize = 1000;

/// Seed used by default
pub const DEMO_SEED: u64 = 42;

/// Source label of generated rows
pub const DEMO_SOURCE: &str = "demo";

const LOCATIONS: [&str; 5] = [
    "1.01 BRÁS",
    "1.02 VILA ALPINA",
    "2.01 SANTOS",
    "SENAI SEDE",
    "3.01 TAUBATÉ",
];

const USEFUL_LIVES: [u32; 5] = [10, 15, 20, 25, 50];

/// Justifications with cumulative probability thresholds
const JUSTIFICATIONS: [(f64, &str); 3] = [
    (0.25, "RECLASSIFICAR: Alta similaridade (70%+)"),
    (0.70, "AVALIAR: Similaridade moderada (45%)"),
    (1.00, "MANTER: Similaridade baixa (25%)"),
];

const FIRST_INVENTORY_ID: usize = 1_000_000;

/// Generate `n` raw rows from `seed`. Same inputs, same rows.
pub fn generate_rows(n: usize, seed: u64) -> Vec<RawRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let dates = spread_dates(n);

    (0..n)
        .map(|i| {
            let location = LOCATIONS.choose(&mut rng).copied().unwrap_or(LOCATIONS[0]);
            let life = USEFUL_LIVES.choose(&mut rng).copied().unwrap_or(USEFUL_LIVES[0]);
            let acquisition = rng.gen_range(100.0..50_000.0);
            let book = rng.gen_range(0.0..30_000.0);
            let similarity = rng.gen_range(20.0..85.0);
            let justification = pick_justification(rng.gen::<f64>());

            RawRow::new(DEMO_SOURCE)
                .with(Column::Location, location)
                .with(Column::InventoryId, (FIRST_INVENTORY_ID + i).to_string())
                .with(Column::Description, format!("EQUIPAMENTO TESTE {}", i))
                .with(Column::UsefulLife, life.to_string())
                .with(Column::AcquisitionValue, format_currency(acquisition))
                .with(Column::BookValue, format_currency(book))
                .with(Column::SimilarItem, format!("CONSUMÍVEL SIMILAR {}", i))
                .with(Column::SimilarityPct, format!("{:.1}%", similarity))
                .with(Column::IncorporationDate, dates[i].format("%Y-%m-%d").to_string())
                .with(Column::RejectionJustification, justification)
        })
        .collect()
}

/// Generated rows wrapped as a loaded source.
pub fn demo_batch(n: usize, seed: u64) -> SourceBatch {
    let rows = generate_rows(n, seed);
    SourceBatch {
        source: DEMO_SOURCE.to_string(),
        encoding: "utf-8".to_string(),
        row_count: rows.len(),
        dropped_columns: Vec::new(),
        rows,
    }
}

/// Render rows as CSV with the inventory system headers.
pub fn rows_to_csv(rows: &[RawRow]) -> Result<Vec<u8>, csv::Error> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(Column::ALL.iter().map(|c| c.export_name()))?;
    for row in rows {
        writer.write_record(Column::ALL.iter().map(|c| row.get(*c).unwrap_or("")))?;
    }
    writer.into_inner().map_err(|e| e.into_error().into())
}

/// `n` dates evenly spaced from 2010-01-01 to 2025-01-01 inclusive.
fn spread_dates(n: usize) -> Vec<NaiveDate> {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(2010, 1, 1),
        NaiveDate::from_ymd_opt(2025, 1, 1),
    ) else {
        return Vec::new();
    };
    let span = (end - start).num_days();
    let steps = n.saturating_sub(1).max(1) as i64;

    (0..n as i64)
        .map(|i| start + Duration::days(span * i / steps))
        .collect()
}

fn pick_justification(p: f64) -> &'static str {
    JUSTIFICATIONS
        .iter()
        .find(|(threshold, _)| p < *threshold)
        .map(|(_, text)| *text)
        .unwrap_or(JUSTIFICATIONS[2].1)
}

fn format_currency(value: f64) -> String {
    format!("R$ {:.2}", value).replace('.', ",")
}
