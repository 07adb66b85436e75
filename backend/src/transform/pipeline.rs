//! High-level load API: sources → raw rows → normalized, classified dataset.
//!
//! # Example
//!
//! ```rust,ignore
//! use patrimonio::{ingest_and_normalize, SourceDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let loaded = ingest_and_normalize(&[SourceDescriptor::from_arg("data")]).await?;
//!     println!("{} records", loaded.records.len());
//!     Ok(())
//! }
//! ```

use serde::Serialize;

use super::normalize::normalize_rows;
use crate::api::logs::{log_info, log_success, log_warning};
use crate::error::{PipelineError, SourceFailure};
use crate::ingest::{ingest, Ingested, SourceBatch, SourceDescriptor};
use crate::models::RecordSet;
use crate::parser::RawRow;

/// A loaded dataset together with the per-source report.
#[derive(Debug, Clone)]
pub struct LoadOutcome {
    /// The immutable dataset
    pub records: RecordSet,
    /// Sources that contributed rows
    pub sources: Vec<SourceBatch>,
    /// Sources that were skipped
    pub failures: Vec<SourceFailure>,
}

/// Summary of a load, suitable for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSummary {
    pub dataset_id: String,
    pub total_records: usize,
    pub sources: Vec<SourceBatch>,
    pub failures: Vec<SourceFailure>,
}

impl From<&LoadOutcome> for LoadSummary {
    fn from(outcome: &LoadOutcome) -> Self {
        Self {
            dataset_id: outcome.records.id().to_string(),
            total_records: outcome.records.len(),
            sources: outcome.sources.clone(),
            failures: outcome.failures.clone(),
        }
    }
}

/// Load, normalize and classify every source.
///
/// Per-source failures are reported in [`LoadOutcome::failures`]. Returns
/// [`PipelineError::NoDataLoaded`] when no source produced a single row.
pub async fn ingest_and_normalize(
    sources: &[SourceDescriptor],
) -> Result<LoadOutcome, PipelineError> {
    let ingested = ingest(sources).await;
    build_outcome(ingested)
}

/// Normalize already-ingested batches.
pub fn build_outcome(ingested: Ingested) -> Result<LoadOutcome, PipelineError> {
    let Ingested { mut batches, failures } = ingested;

    if !failures.is_empty() {
        log_warning(format!("{} fonte(s) ignorada(s)", failures.len()));
    }

    let rows: Vec<RawRow> = batches
        .iter_mut()
        .flat_map(|b| std::mem::take(&mut b.rows))
        .collect();

    if rows.is_empty() {
        log_warning("Nenhum registro carregado");
        return Err(PipelineError::NoDataLoaded { failures });
    }

    log_info(format!("🔄 Normalizando {} linhas...", rows.len()));
    let records = build_record_set(&rows);
    log_success(format!("{} registros prontos", records.len()));

    Ok(LoadOutcome {
        records,
        sources: batches,
        failures,
    })
}

/// Normalize rows into a fresh immutable dataset.
pub fn build_record_set(rows: &[RawRow]) -> RecordSet {
    RecordSet::new(normalize_rows(rows))
}
