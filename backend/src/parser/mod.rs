//! CSV reader with encoding fallback, delimiter detection and column allow-list.
//!
//! Rows come out as [`RawRow`]s holding only the allow-listed columns. Values
//! stay textual here; typing happens in [`crate::transform::normalize`].

use csv::ReaderBuilder;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{SourceError, SourceResult};

// =============================================================================
// Column allow-list
// =============================================================================

/// Columns retained at read time. Everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Column {
    Location,
    InventoryId,
    Description,
    UsefulLife,
    AcquisitionValue,
    BookValue,
    SimilarItem,
    SimilarityPct,
    IncorporationDate,
    RejectionJustification,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::Location,
        Column::InventoryId,
        Column::Description,
        Column::UsefulLife,
        Column::AcquisitionValue,
        Column::BookValue,
        Column::SimilarItem,
        Column::SimilarityPct,
        Column::IncorporationDate,
        Column::RejectionJustification,
    ];

    /// Canonical header name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::InventoryId => "InventoryID",
            Self::Description => "Description",
            Self::UsefulLife => "UsefulLife",
            Self::AcquisitionValue => "AcquisitionValue",
            Self::BookValue => "BookValue",
            Self::SimilarItem => "SimilarItem",
            Self::SimilarityPct => "SimilarityPct",
            Self::IncorporationDate => "IncorporationDate",
            Self::RejectionJustification => "RejectionJustification",
        }
    }

    /// Header used by the inventory system exports.
    pub fn export_name(&self) -> &'static str {
        match self {
            Self::Location => "Localização",
            Self::InventoryId => "Inventário",
            Self::Description => "Denominação do Imobilizado",
            Self::UsefulLife => "Vida",
            Self::AcquisitionValue => "Valor Aquisição",
            Self::BookValue => "Valor Contábil",
            Self::SimilarItem => "Item Consumível Similar",
            Self::SimilarityPct => "Percentagem de Similaridade (%)",
            Self::IncorporationDate => "Data Incorporação",
            Self::RejectionJustification => "Justificativa de Reprova",
        }
    }

    /// Match a header (surrounding whitespace and quotes ignored) against the allow-list.
    pub fn from_header(header: &str) -> Option<Column> {
        let header = header.trim().trim_matches('"').trim();
        Self::ALL
            .into_iter()
            .find(|c| c.name() == header || c.export_name() == header)
    }
}

// =============================================================================
// Raw rows
// =============================================================================

/// One source row restricted to the allow-list, tagged with its origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawRow {
    pub source: String,
    pub values: HashMap<Column, String>,
}

impl RawRow {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            values: HashMap::new(),
        }
    }

    pub fn with(mut self, column: Column, value: impl Into<String>) -> Self {
        self.values.insert(column, value.into());
        self
    }

    /// Cell text, or `None` when the cell is absent or blank.
    pub fn get(&self, column: Column) -> Option<&str> {
        self.values
            .get(&column)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }
}

/// Result of parsing one source.
#[derive(Debug, Clone)]
pub struct ParseResult {
    /// Allow-listed rows
    pub rows: Vec<RawRow>,
    /// Encoding the content was decoded with
    pub encoding: String,
    /// Detected delimiter
    pub delimiter: char,
    /// Retained headers (as written in the file, trimmed)
    pub headers: Vec<String>,
    /// Headers dropped by the allow-list
    pub dropped: Vec<String>,
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode bytes as UTF-8, falling back to Latin-1.
///
/// Latin-1 is decoded with the WINDOWS-1252 table, which is a superset for
/// the printable range. Returns the text and the encoding label used.
pub fn decode_content(bytes: &[u8]) -> SourceResult<(String, &'static str)> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok((text.to_string(), "utf-8"));
    }

    let (text, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if had_errors {
        return Err(SourceError::Encoding(
            "content is neither UTF-8 nor Latin-1".to_string(),
        ));
    }
    Ok((text.into_owned(), "latin-1"))
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [',', ';', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

// =============================================================================
// Parsing
// =============================================================================

/// Parse decoded CSV text, keeping only allow-listed columns.
pub fn parse_str(
    content: &str,
    delimiter: char,
    source: &str,
    encoding: &str,
) -> SourceResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(SourceError::Csv("Empty CSV file".to_string()));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header_record = reader
        .headers()
        .map_err(|e| SourceError::Csv(format!("Cannot read header: {}", e)))?
        .clone();

    let mut retained: Vec<(usize, Column)> = Vec::new();
    let mut headers = Vec::new();
    let mut dropped = Vec::new();

    for (idx, raw) in header_record.iter().enumerate() {
        let trimmed = raw.trim().to_string();
        match Column::from_header(&trimmed) {
            Some(column) if !retained.iter().any(|(_, c)| *c == column) => {
                retained.push((idx, column));
                headers.push(trimmed);
            }
            _ => dropped.push(trimmed),
        }
    }

    let mut rows = Vec::new();
    for (line_idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            SourceError::Csv(format!("Line {}: {}", line_idx + 2, e))
        })?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut row = RawRow::new(source);
        for &(idx, column) in &retained {
            if let Some(value) = record.get(idx) {
                row.values.insert(column, value.trim().to_string());
            }
        }
        rows.push(row);
    }

    Ok(ParseResult {
        rows,
        encoding: encoding.to_string(),
        delimiter,
        headers,
        dropped,
    })
}

/// Parse CSV bytes with encoding fallback and delimiter detection.
pub fn parse_bytes_auto(bytes: &[u8], source: &str) -> SourceResult<ParseResult> {
    let (content, encoding) = decode_content(bytes)?;
    let delimiter = detect_delimiter(&content);
    parse_str(&content, delimiter, source, encoding)
}

/// Parse a CSV file, tagging rows with the file name.
pub fn parse_csv_file_auto<P: AsRef<Path>>(path: P) -> SourceResult<ParseResult> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_bytes_auto(&bytes, &file_label(path))
}

/// File name used as the provenance tag.
pub fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(String::from)
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Location,InventoryID,SimilarityPct,RejectionJustification";

    #[test]
    fn test_allow_list_drops_columns() {
        let csv = "Location,Extra,InventoryID\n1.01 BRÁS,x,100\n";
        let result = parse_str(csv, ',', "a.csv", "utf-8").unwrap();

        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.dropped, vec!["Extra"]);
        let row = &result.rows[0];
        assert_eq!(row.get(Column::Location), Some("1.01 BRÁS"));
        assert_eq!(row.get(Column::InventoryId), Some("100"));
        assert_eq!(row.values.len(), 2);
        assert_eq!(row.source, "a.csv");
    }

    #[test]
    fn test_headers_are_trimmed() {
        let csv = " Location , SimilarityPct \nSANTOS,40.0%\n";
        let result = parse_str(csv, ',', "a.csv", "utf-8").unwrap();
        assert_eq!(result.headers, vec!["Location", "SimilarityPct"]);
        assert_eq!(result.rows[0].get(Column::SimilarityPct), Some("40.0%"));
    }

    #[test]
    fn test_portuguese_headers_accepted() {
        let csv = "Localização;Percentagem de Similaridade (%);Justificativa de Reprova \n\
                   1.01 BRÁS;75.0%;RECLASSIFICAR\n";
        let result = parse_bytes_auto(csv.as_bytes(), "pt.csv").unwrap();
        assert_eq!(result.delimiter, ';');
        let row = &result.rows[0];
        assert_eq!(row.get(Column::Location), Some("1.01 BRÁS"));
        assert_eq!(row.get(Column::RejectionJustification), Some("RECLASSIFICAR"));
    }

    #[test]
    fn test_quoted_currency_with_comma() {
        let csv = "InventoryID,AcquisitionValue\n1,\"R$ 1.234,56\"\n";
        let result = parse_str(csv, ',', "a.csv", "utf-8").unwrap();
        assert_eq!(result.rows[0].get(Column::AcquisitionValue), Some("R$ 1.234,56"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let csv = format!("{}\nSANTOS,,\n", HEADER);
        let result = parse_str(&csv, ',', "a.csv", "utf-8").unwrap();
        let row = &result.rows[0];
        assert_eq!(row.get(Column::Location), Some("SANTOS"));
        assert_eq!(row.get(Column::InventoryId), None);
        assert_eq!(row.get(Column::RejectionJustification), None);
    }

    #[test]
    fn test_empty_lines_skipped() {
        let csv = format!("{}\nA,1,,\n\nB,2,,\n", HEADER);
        let result = parse_str(&csv, ',', "a.csv", "utf-8").unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_empty_csv_error() {
        assert!(parse_str("", ',', "a.csv", "utf-8").is_err());
    }

    #[test]
    fn test_latin1_fallback() {
        // "Location\nBRÁS" with Á encoded as 0xC1
        let bytes: &[u8] = b"Location\nBR\xC1S\n";
        let result = parse_bytes_auto(bytes, "latin.csv").unwrap();
        assert_eq!(result.encoding, "latin-1");
        assert_eq!(result.rows[0].get(Column::Location), Some("BRÁS"));
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let bytes = "\u{FEFF}Location\nSANTOS\n".as_bytes();
        let (text, encoding) = decode_content(bytes).unwrap();
        assert_eq!(encoding, "utf-8");
        assert!(text.starts_with("Location"));
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c\n1,2,3"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("single"), ',');
    }
}
