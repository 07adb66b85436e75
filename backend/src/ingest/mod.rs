//! Source loading: local files, folders, uploaded streams and remote URLs.
//!
//! Every source is read independently. A failing source is recorded in
//! [`Ingested::failures`] and the batch carries on with the rest.

pub mod consolidate;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::error::{SourceError, SourceFailure, SourceResult};
use crate::parser::{file_label, parse_bytes_auto, parse_csv_file_auto, ParseResult, RawRow};

static DRIVE_FILE_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/d/([^/?#]+)").expect("valid drive id pattern")
});

/// Where a batch of rows comes from.
#[derive(Debug, Clone)]
pub enum SourceDescriptor {
    /// A single CSV file on disk.
    File(PathBuf),
    /// Every `*.csv` directly inside a directory.
    Folder(PathBuf),
    /// Bytes received from a client upload.
    Upload { name: String, bytes: Vec<u8> },
    /// A remote CSV.
    Url(String),
}

impl SourceDescriptor {
    /// Classify a command-line style argument: URL, directory or file.
    pub fn from_arg(arg: &str) -> Self {
        let trimmed = arg.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            return Self::Url(trimmed.to_string());
        }
        let path = PathBuf::from(trimmed);
        if path.is_dir() {
            Self::Folder(path)
        } else {
            Self::File(path)
        }
    }

    /// Identifier used in logs and failure reports.
    pub fn label(&self) -> String {
        match self {
            Self::File(path) => file_label(path),
            Self::Folder(path) => path.display().to_string(),
            Self::Upload { name, .. } => name.clone(),
            Self::Url(url) => url.clone(),
        }
    }
}

/// Rows read from one source.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBatch {
    pub source: String,
    pub encoding: String,
    pub row_count: usize,
    pub dropped_columns: Vec<String>,
    #[serde(skip)]
    pub rows: Vec<RawRow>,
}

impl SourceBatch {
    fn from_parse(source: String, parsed: ParseResult) -> Self {
        Self {
            source,
            encoding: parsed.encoding,
            row_count: parsed.rows.len(),
            dropped_columns: parsed.dropped,
            rows: parsed.rows,
        }
    }
}

/// Outcome of loading a set of sources.
#[derive(Debug, Clone, Default)]
pub struct Ingested {
    /// Successful sources, in input order
    pub batches: Vec<SourceBatch>,
    /// Sources that were skipped, with the reason
    pub failures: Vec<SourceFailure>,
}

impl Ingested {
    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|b| b.rows.len()).sum()
    }

    /// Concatenate all rows, preserving source order and row order.
    pub fn into_rows(self) -> Vec<RawRow> {
        self.batches.into_iter().flat_map(|b| b.rows).collect()
    }

    fn record_failure(&mut self, source: String, error: &SourceError) {
        log_error(format!("✗ Erro ao carregar {}: {}", source, error));
        self.failures.push(SourceFailure::new(source, error));
    }
}

/// Rewrite a Google-Drive share link to its direct-download form.
///
/// `https://drive.google.com/file/d/<ID>/view?usp=sharing` becomes
/// `https://drive.google.com/uc?id=<ID>`. Other URLs are returned unchanged.
pub fn rewrite_drive_url(url: &str) -> String {
    if !url.contains("drive.google.com") {
        return url.to_string();
    }
    match DRIVE_FILE_ID.captures(url) {
        Some(caps) => format!("https://drive.google.com/uc?id={}", &caps[1]),
        None => url.to_string(),
    }
}

/// List the CSV files of a folder, sorted by name.
pub fn list_csv_files(folder: &Path) -> SourceResult<Vec<PathBuf>> {
    let entries = fs::read_dir(folder).map_err(|e| SourceError::Io {
        path: folder.display().to_string(),
        source: e,
    })?;

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(SourceError::EmptyFolder(folder.display().to_string()));
    }
    Ok(files)
}

/// Fetch a remote CSV body.
async fn fetch_url(url: &str) -> SourceResult<Vec<u8>> {
    let response = reqwest::get(url).await.map_err(|e| SourceError::Http {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Http {
            url: url.to_string(),
            message: format!("HTTP {}", status),
        });
    }

    let bytes = response.bytes().await.map_err(|e| SourceError::Http {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    Ok(bytes.to_vec())
}

/// Load every source. Never fails as a whole; see [`Ingested::failures`].
pub async fn ingest(sources: &[SourceDescriptor]) -> Ingested {
    let mut out = Ingested::default();
    let mut url_count = 0usize;

    log_info(format!("📂 Carregando {} fonte(s)...", sources.len()));

    for source in sources {
        match source {
            SourceDescriptor::File(path) => load_file(path, &mut out),
            SourceDescriptor::Folder(folder) => match list_csv_files(folder) {
                Ok(files) => {
                    log_info(format!(
                        "📂 {} arquivo(s) CSV na pasta '{}'",
                        files.len(),
                        folder.display()
                    ));
                    for file in &files {
                        load_file(file, &mut out);
                    }
                }
                Err(e) => {
                    log_warning(format!("⚠️ {}", e));
                    out.record_failure(source.label(), &e);
                }
            },
            SourceDescriptor::Upload { name, bytes } => {
                match parse_bytes_auto(bytes, name) {
                    Ok(parsed) => push_batch(&mut out, name.clone(), parsed),
                    Err(e) => out.record_failure(name.clone(), &e),
                }
            }
            SourceDescriptor::Url(url) => {
                let target = rewrite_drive_url(url);
                let label = format!("URL_{}", url_count + 1);
                let result = match fetch_url(&target).await {
                    Ok(bytes) => parse_bytes_auto(&bytes, &label),
                    Err(e) => Err(e),
                };
                match result {
                    Ok(parsed) => {
                        url_count += 1;
                        push_batch(&mut out, label, parsed);
                    }
                    Err(e) => out.record_failure(url.clone(), &e),
                }
            }
        }
    }

    out
}

fn load_file(path: &Path, out: &mut Ingested) {
    let label = file_label(path);
    match parse_csv_file_auto(path) {
        Ok(parsed) => push_batch(out, label, parsed),
        Err(e) => out.record_failure(label, &e),
    }
}

fn push_batch(out: &mut Ingested, source: String, parsed: ParseResult) {
    let suffix = if parsed.encoding == "utf-8" {
        String::new()
    } else {
        format!(" ({})", parsed.encoding)
    };
    log_success(format!(
        "✓ {}: {} registros carregados{}",
        source,
        parsed.rows.len(),
        suffix
    ));
    out.batches.push(SourceBatch::from_parse(source, parsed));
}
