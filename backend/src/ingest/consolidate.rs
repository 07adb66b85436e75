//! Merge every CSV of a folder into a single UTF-8 file.
//!
//! All columns are kept (union of headers, first-seen order) and a
//! provenance column [`ORIGIN_COLUMN`] records the file each row came from.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::list_csv_files;
use crate::api::logs::{log_error, log_info, log_success};
use crate::error::{SourceError, SourceFailure, SourceResult};
use crate::parser::{decode_content, detect_delimiter, file_label};

/// Provenance column appended to the merged file
pub const ORIGIN_COLUMN: &str = "arquivo_origem";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidatedFile {
    pub name: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    pub files: Vec<ConsolidatedFile>,
    pub failures: Vec<SourceFailure>,
    pub total_rows: usize,
    /// Output columns, provenance column included
    pub columns: Vec<String>,
}

struct Table {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

fn read_table(path: &Path) -> SourceResult<Table> {
    let bytes = fs::read(path).map_err(|e| SourceError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let (content, _) = decode_content(&bytes)?;
    let delimiter = detect_delimiter(&content);

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| SourceError::Csv(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Csv(e.to_string()))?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(String::from).collect());
    }

    Ok(Table {
        name: file_label(path),
        headers,
        rows,
    })
}

/// Merge the CSVs of `folder` and write the result as CSV into `writer`.
///
/// Unreadable files are skipped and reported. Fails when the folder has no
/// CSV or none of them could be read.
pub fn consolidate_into<W: std::io::Write>(
    folder: &Path,
    writer: W,
) -> SourceResult<ConsolidationReport> {
    consolidate_files(&list_csv_files(folder)?, writer)
}

fn consolidate_files<W: std::io::Write>(
    files: &[PathBuf],
    writer: W,
) -> SourceResult<ConsolidationReport> {
    log_info(format!("📂 Encontrados {} arquivos CSV", files.len()));

    let mut tables = Vec::new();
    let mut failures = Vec::new();
    for (idx, path) in files.iter().enumerate() {
        match read_table(path) {
            Ok(table) => {
                log_success(format!(
                    "[{}/{}] {}: {} linhas",
                    idx + 1,
                    files.len(),
                    table.name,
                    table.rows.len()
                ));
                tables.push(table);
            }
            Err(e) => {
                log_error(format!("[{}/{}] {}: {}", idx + 1, files.len(), file_label(path), e));
                failures.push(SourceFailure::new(file_label(path), &e));
            }
        }
    }

    if tables.is_empty() {
        return Err(SourceError::Csv(
            "Nenhum arquivo foi carregado com sucesso".to_string(),
        ));
    }

    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for header in &table.headers {
            if !columns.contains(header) {
                columns.push(header.clone());
            }
        }
    }

    let mut csv_writer = csv::Writer::from_writer(writer);
    let to_source_err = |e: csv::Error| SourceError::Csv(e.to_string());

    let mut out_header = columns.clone();
    out_header.push(ORIGIN_COLUMN.to_string());
    csv_writer.write_record(&out_header).map_err(to_source_err)?;

    let mut total_rows = 0;
    for table in &tables {
        // Position of each output column in this table
        let positions: Vec<Option<usize>> = columns
            .iter()
            .map(|c| table.headers.iter().position(|h| h == c))
            .collect();

        for row in &table.rows {
            let mut record: Vec<&str> = positions
                .iter()
                .map(|p| p.and_then(|i| row.get(i)).map(String::as_str).unwrap_or(""))
                .collect();
            record.push(&table.name);
            csv_writer.write_record(&record).map_err(to_source_err)?;
        }
        total_rows += table.rows.len();
    }
    csv_writer.flush().map_err(|e| SourceError::Io {
        path: "<output>".to_string(),
        source: e,
    })?;

    log_success(format!("Consolidação concluída: {} registros", total_rows));

    Ok(ConsolidationReport {
        files: tables
            .iter()
            .map(|t| ConsolidatedFile {
                name: t.name.clone(),
                rows: t.rows.len(),
            })
            .collect(),
        failures,
        total_rows,
        columns: out_header,
    })
}

/// Merge the CSVs of `folder` into the file at `output`.
///
/// `output` is only written once the merge succeeded, and is never read as
/// an input when it lives inside `folder`.
pub fn consolidate_folder(folder: &Path, output: &Path) -> SourceResult<ConsolidationReport> {
    let output_path = fs::canonicalize(output).ok();
    let files: Vec<PathBuf> = list_csv_files(folder)?
        .into_iter()
        .filter(|path| output_path.is_none() || fs::canonicalize(path).ok() != output_path)
        .collect();
    if files.is_empty() {
        return Err(SourceError::EmptyFolder(folder.display().to_string()));
    }

    let mut merged = Vec::new();
    let report = consolidate_files(&files, &mut merged)?;
    fs::write(output, merged).map_err(|e| SourceError::Io {
        path: output.display().to_string(),
        source: e,
    })?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merges_with_provenance() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "Localização,Vida\nBRÁS,10\nSANTOS,20\n").unwrap();
        fs::write(dir.path().join("b.csv"), "Localização;Extra\nTAUBATÉ;x\n").unwrap();

        let mut out = Vec::new();
        let report = consolidate_into(dir.path(), &mut out).unwrap();

        assert_eq!(report.total_rows, 3);
        assert_eq!(report.files.len(), 2);
        assert_eq!(report.columns, vec!["Localização", "Vida", "Extra", ORIGIN_COLUMN]);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Localização,Vida,Extra,arquivo_origem");
        assert_eq!(lines[1], "BRÁS,10,,a.csv");
        assert_eq!(lines[3], "TAUBATÉ,,x,b.csv");
    }

    #[test]
    fn test_latin1_file_is_decoded() {
        let dir = tempdir().unwrap();
        // "Localização" / "BRÁS" in Windows-1252
        fs::write(dir.path().join("latin.csv"), b"Localiza\xe7\xe3o\nBR\xc1S\n").unwrap();

        let mut out = Vec::new();
        consolidate_into(dir.path(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("BRÁS,latin.csv"));
    }

    #[test]
    fn test_empty_folder_is_error() {
        let dir = tempdir().unwrap();
        let mut out = Vec::new();
        assert!(matches!(
            consolidate_into(dir.path(), &mut out),
            Err(SourceError::EmptyFolder(_))
        ));
    }

    #[test]
    fn test_writes_output_file() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        fs::write(data.join("x.csv"), "A\n1\n").unwrap();

        let output = dir.path().join("merged.csv");
        let report = consolidate_folder(&data, &output).unwrap();
        assert_eq!(report.total_rows, 1);
        assert!(fs::read_to_string(&output).unwrap().starts_with("A,arquivo_origem"));
    }

    #[test]
    fn test_output_inside_folder_is_not_an_input() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("x.csv"), "A\n1\n2\n").unwrap();
        let output = dir.path().join("merged.csv");

        // Re-running must not pick up the previous result
        for _ in 0..2 {
            let report = consolidate_folder(dir.path(), &output).unwrap();
            assert_eq!(report.total_rows, 2);
            assert_eq!(report.files.len(), 1);
        }
    }

    #[test]
    fn test_empty_folder_leaves_no_output() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();
        let output = dir.path().join("merged.csv");

        assert!(matches!(
            consolidate_folder(&data, &output),
            Err(SourceError::EmptyFolder(_))
        ));
        assert!(!output.exists());
    }
}
