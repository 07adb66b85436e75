//! Field parsers and row normalization.
//!
//! Every parser returns `Option`: malformed input yields `None` and is never
//! reported as an error.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use super::classify::{classify_decision, classify_similarity_tier, extract_region};
use crate::models::{AssetRecord, REFERENCE_YEAR};
use crate::parser::{Column, RawRow};

/// Date layouts tried in order. Day-first comes before month-first.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%YT%H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// Years outside this window are treated as unparseable.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1677..=2262;

/// Parse Brazilian-formatted currency text (`"R$ 1.234,56"` → `1234.56`).
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned = text
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".");
    parse_finite(cleaned.trim())
}

/// Parse a percentage (`"42.5%"` → `42.5`).
pub fn parse_percentage(text: &str) -> Option<f64> {
    parse_finite(text.trim().trim_end_matches('%').trim())
}

/// Parse an integer, accepting integral floats such as `"10.0"`.
pub fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(value) = text.parse::<i64>() {
        return Some(value);
    }
    parse_finite(text)
        .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
        .map(|v| v as i64)
}

/// Permissive date parse. Dates outside [`YEAR_RANGE`] yield `None`.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    parse_date_any(text.trim()).filter(|d| YEAR_RANGE.contains(&d.year()))
}

fn parse_date_any(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.date_naive());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt.date());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return Some(date);
        }
    }

    // Year-month
    if let Some((year, month)) = text.split_once('-') {
        if year.len() == 4 && month.len() <= 2 && is_digits(year) && is_digits(month) {
            return NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1);
        }
    }

    // Bare year
    if text.len() == 4 && is_digits(text) {
        return text.parse::<i32>().ok().and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1));
    }
    None
}

fn is_digits(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_digit())
}

/// Incorporation year from a date field.
pub fn parse_year(text: &str) -> Option<i16> {
    parse_date(text).and_then(|d| i16::try_from(d.year()).ok())
}

/// Age of an item in whole years against [`REFERENCE_YEAR`].
pub fn age_from_year(year: Option<i16>) -> Option<i16> {
    year.and_then(|y| REFERENCE_YEAR.checked_sub(y))
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Normalize and classify one raw row.
pub fn normalize_row(row: &RawRow) -> AssetRecord {
    let text = |column: Column| row.get(column).map(str::trim).unwrap_or("").to_string();

    let location = row.get(Column::Location);
    let similarity_pct = row.get(Column::SimilarityPct).and_then(parse_percentage);
    let incorporation_year = row.get(Column::IncorporationDate).and_then(parse_year);

    AssetRecord {
        location: location.map(str::trim).unwrap_or("").to_string(),
        inventory_id: text(Column::InventoryId),
        description: text(Column::Description),
        useful_life_years: row.get(Column::UsefulLife).and_then(parse_integer),
        acquisition_value: row.get(Column::AcquisitionValue).and_then(parse_currency),
        book_value: row.get(Column::BookValue).and_then(parse_currency),
        similar_consumable_item: text(Column::SimilarItem),
        similarity_pct,
        incorporation_year,
        age_years: age_from_year(incorporation_year),
        decision: classify_decision(row.get(Column::RejectionJustification)),
        similarity_tier: classify_similarity_tier(similarity_pct),
        region: extract_region(location),
        source_file: row.source.clone(),
    }
}

/// Normalize a batch of rows, preserving order.
pub fn normalize_rows(rows: &[RawRow]) -> Vec<AssetRecord> {
    rows.iter().map(normalize_row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Decision, SimilarityTier};

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("R$ 1.234,56"), Some(1234.56));
        assert_eq!(parse_currency("R$ 12.345.678,90"), Some(12345678.90));
        assert_eq!(parse_currency("  987,5 "), Some(987.5));
        assert_eq!(parse_currency("R$ 100"), Some(100.0));
        assert_eq!(parse_currency("R$ -"), None);
        assert_eq!(parse_currency("abc"), None);
        assert_eq!(parse_currency(""), None);
    }

    #[test]
    fn test_parse_percentage() {
        assert_eq!(parse_percentage("42.5%"), Some(42.5));
        assert_eq!(parse_percentage("75.0%"), Some(75.0));
        assert_eq!(parse_percentage("30"), Some(30.0));
        assert_eq!(parse_percentage("n/a%"), None);
        assert_eq!(parse_percentage("%"), None);
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_integer("10"), Some(10));
        assert_eq!(parse_integer(" 25 "), Some(25));
        assert_eq!(parse_integer("10.0"), Some(10));
        assert_eq!(parse_integer("10.5"), None);
        assert_eq!(parse_integer("dez"), None);
    }

    #[test]
    fn test_parse_mixed_dates() {
        assert_eq!(parse_year("2015-03-20"), Some(2015));
        assert_eq!(parse_year("20/03/2015"), Some(2015));
        assert_eq!(parse_year("2015-03-20 10:00:00"), Some(2015));
        assert_eq!(parse_year("2015-03-20T10:00:00"), Some(2015));
        assert_eq!(parse_year("2015-03-20T10:00:00Z"), Some(2015));
        assert_eq!(parse_year("12/31/2015"), Some(2015));
        assert_eq!(parse_year("1998"), Some(1998));
        assert_eq!(parse_year("not a date"), None);
        assert_eq!(parse_year("32/13/2015"), None);
        assert_eq!(parse_year("2015-03-20 10:00"), Some(2015));
        assert_eq!(parse_year("20/03/2015T10:00:00"), Some(2015));
        assert_eq!(parse_year("2015-03"), Some(2015));
        assert_eq!(parse_year("2015-13"), None);
    }

    #[test]
    fn test_out_of_range_years_are_null() {
        assert_eq!(parse_date("-31000-01-01"), None);
        assert_eq!(parse_date("-32768-01-01"), None);
        assert_eq!(parse_date("1600-01-01"), None);
        assert_eq!(parse_year("2262-12-31"), Some(2262));

        let row = RawRow::new("p.csv").with(Column::IncorporationDate, "-31000-01-01");
        let record = normalize_row(&row);
        assert_eq!(record.incorporation_year, None);
        assert_eq!(record.age_years, None);
    }

    #[test]
    fn test_age_from_year() {
        assert_eq!(age_from_year(Some(2015)), Some(10));
        assert_eq!(age_from_year(None), None);
        assert_eq!(age_from_year(Some(i16::MIN)), None);
    }

    #[test]
    fn test_normalize_full_row() {
        let row = RawRow::new("a.csv")
            .with(Column::Location, " 1.01 BRÁS ")
            .with(Column::InventoryId, "1000001")
            .with(Column::Description, "CADEIRA")
            .with(Column::UsefulLife, "10")
            .with(Column::AcquisitionValue, "R$ 1.234,56")
            .with(Column::BookValue, "R$ 0,00")
            .with(Column::SimilarItem, "CADEIRA PLÁSTICA")
            .with(Column::SimilarityPct, "75.0%")
            .with(Column::IncorporationDate, "2015-03-20")
            .with(Column::RejectionJustification, "RECLASSIFICAR: alta similaridade");

        let record = normalize_row(&row);
        assert_eq!(record.location, "1.01 BRÁS");
        assert_eq!(record.region, "1.01 BRÁS");
        assert_eq!(record.useful_life_years, Some(10));
        assert_eq!(record.acquisition_value, Some(1234.56));
        assert_eq!(record.book_value, Some(0.0));
        assert_eq!(record.similarity_pct, Some(75.0));
        assert_eq!(record.incorporation_year, Some(2015));
        assert_eq!(record.age_years, Some(10));
        assert_eq!(record.decision, Decision::Reclassificar);
        assert_eq!(record.similarity_tier, SimilarityTier::MuitoAlta);
        assert_eq!(record.source_file, "a.csv");
    }

    #[test]
    fn test_normalize_empty_row_uses_defaults() {
        let record = normalize_row(&RawRow::new("b.csv"));
        assert_eq!(record.region, "Não Informado");
        assert_eq!(record.decision, Decision::SemCategoria);
        assert_eq!(record.similarity_tier, SimilarityTier::SemDados);
        assert_eq!(record.similarity_pct, None);
        assert_eq!(record.age_years, None);
        assert_eq!(record.acquisition_value, None);
    }
}
