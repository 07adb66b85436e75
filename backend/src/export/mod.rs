//! CSV and spreadsheet serialization of a record view.
//!
//! Both exports cap the number of records written. When a view exceeds the
//! cap, the first `row_limit` records are written and a warning is logged.

use chrono::{DateTime, TimeZone};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};

use crate::aggregate::{decision_summary, region_summary};
use crate::api::logs::log_warning;
use crate::error::ExportResult;
use crate::models::{AssetRecord, Decision};

/// Default ceiling on exported records.
pub const DEFAULT_EXPORT_ROW_LIMIT: usize = 100_000;

/// Column headers of a full record export, in field order.
pub const RECORD_COLUMNS: [&str; 14] = [
    "location",
    "inventoryId",
    "description",
    "usefulLifeYears",
    "acquisitionValue",
    "bookValue",
    "similarConsumableItem",
    "similarityPct",
    "incorporationYear",
    "ageYears",
    "decision",
    "similarityTier",
    "region",
    "sourceFile",
];

/// Download name for an export, e.g. `patrimonio_filtrado_20250131_1405.csv`.
pub fn export_file_name<Tz: TimeZone>(extension: &str, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("patrimonio_filtrado_{}.{}", at.format("%Y%m%d_%H%M"), extension)
}

fn capped(records: &[AssetRecord], row_limit: usize) -> &[AssetRecord] {
    if records.len() > row_limit {
        log_warning(format!(
            "Exportação limitada a {} de {} registros",
            row_limit,
            records.len()
        ));
        &records[..row_limit]
    } else {
        records
    }
}

// =============================================================================
// CSV
// =============================================================================

/// UTF-8, comma-delimited CSV with a header row.
pub fn export_csv(records: &[AssetRecord]) -> ExportResult<Vec<u8>> {
    export_csv_with_limit(records, DEFAULT_EXPORT_ROW_LIMIT)
}

pub fn export_csv_with_limit(records: &[AssetRecord], row_limit: usize) -> ExportResult<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(RECORD_COLUMNS)?;
    for record in capped(records, row_limit) {
        writer.serialize(record)?;
    }

    writer
        .into_inner()
        .map_err(|e| e.into_error().into())
}

// =============================================================================
// Spreadsheet
// =============================================================================

/// Workbook with the records, a per-decision summary and a per-region summary.
pub fn export_spreadsheet(records: &[AssetRecord]) -> ExportResult<Vec<u8>> {
    export_spreadsheet_with_limit(records, DEFAULT_EXPORT_ROW_LIMIT)
}

pub fn export_spreadsheet_with_limit(
    records: &[AssetRecord],
    row_limit: usize,
) -> ExportResult<Vec<u8>> {
    let records = capped(records, row_limit);
    let mut workbook = Workbook::new();

    write_records_sheet(workbook.add_worksheet(), records)?;
    write_decision_sheet(workbook.add_worksheet(), records)?;
    write_region_sheet(workbook.add_worksheet(), records)?;

    Ok(workbook.save_to_buffer()?)
}

fn write_header(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    Ok(())
}

fn write_opt_number(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    value: Option<f64>,
) -> Result<(), XlsxError> {
    if let Some(v) = value {
        sheet.write_number(row, col, v)?;
    }
    Ok(())
}

fn write_records_sheet(sheet: &mut Worksheet, records: &[AssetRecord]) -> Result<(), XlsxError> {
    sheet.set_name("Dados_Completos")?;
    write_header(sheet, &RECORD_COLUMNS)?;

    for (idx, r) in records.iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, r.location.as_str())?;
        sheet.write_string(row, 1, r.inventory_id.as_str())?;
        sheet.write_string(row, 2, r.description.as_str())?;
        write_opt_number(sheet, row, 3, r.useful_life_years.map(|v| v as f64))?;
        write_opt_number(sheet, row, 4, r.acquisition_value)?;
        write_opt_number(sheet, row, 5, r.book_value)?;
        sheet.write_string(row, 6, r.similar_consumable_item.as_str())?;
        write_opt_number(sheet, row, 7, r.similarity_pct)?;
        write_opt_number(sheet, row, 8, r.incorporation_year.map(f64::from))?;
        write_opt_number(sheet, row, 9, r.age_years.map(f64::from))?;
        sheet.write_string(row, 10, r.decision.as_str())?;
        sheet.write_string(row, 11, r.similarity_tier.as_str())?;
        sheet.write_string(row, 12, r.region.as_str())?;
        sheet.write_string(row, 13, r.source_file.as_str())?;
    }
    Ok(())
}

fn write_decision_sheet(sheet: &mut Worksheet, records: &[AssetRecord]) -> Result<(), XlsxError> {
    sheet.set_name("Resumo_Decisoes")?;
    write_header(
        sheet,
        &[
            "decision",
            "similarity_count",
            "similarity_mean",
            "similarity_min",
            "similarity_max",
            "year_min",
            "year_max",
        ],
    )?;

    for (idx, s) in decision_summary(records).iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, s.decision.as_str())?;
        sheet.write_number(row, 1, s.similarity_count as f64)?;
        write_opt_number(sheet, row, 2, s.similarity_mean.map(round2))?;
        write_opt_number(sheet, row, 3, s.similarity_min)?;
        write_opt_number(sheet, row, 4, s.similarity_max)?;
        write_opt_number(sheet, row, 5, s.year_min.map(f64::from))?;
        write_opt_number(sheet, row, 6, s.year_max.map(f64::from))?;
    }
    Ok(())
}

fn write_region_sheet(sheet: &mut Worksheet, records: &[AssetRecord]) -> Result<(), XlsxError> {
    sheet.set_name("Resumo_Regional")?;

    let mut headers = vec!["region"];
    headers.extend(Decision::ALL.iter().map(|d| d.as_str()));
    headers.extend(["similarity_count", "similarity_mean"]);
    write_header(sheet, &headers)?;

    let decision_cols = Decision::ALL.len() as u16;
    for (idx, s) in region_summary(records).iter().enumerate() {
        let row = idx as u32 + 1;
        sheet.write_string(row, 0, s.region.as_str())?;
        for (i, decision) in Decision::ALL.iter().enumerate() {
            let count = s.decision_counts.get(decision).copied().unwrap_or(0);
            sheet.write_number(row, 1 + i as u16, count as f64)?;
        }
        sheet.write_number(row, 1 + decision_cols, s.similarity_count as f64)?;
        write_opt_number(sheet, row, 2 + decision_cols, s.similarity_mean.map(round2))?;
    }
    Ok(())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
