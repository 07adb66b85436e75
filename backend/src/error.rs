//! Error types for the inventory analysis pipeline.
//!
//! This module defines the error hierarchy used across the crate:
//!
//! - [`SourceError`] - A single source could not be read (non-fatal for a batch)
//! - [`PipelineError`] - Load-level failures (nothing could be loaded)
//! - [`ExportError`] - CSV / spreadsheet serialization errors
//! - [`ConfigError`] - Invalid environment configuration
//! - [`ServerError`] - HTTP layer errors
//!
//! Field-level parse failures (currency, percentage, date, integer) are never
//! errors: they become `None` on the normalized record.

use thiserror::Error;

// =============================================================================
// Source Errors
// =============================================================================

/// Why one source of a batch was skipped.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Failed to read file or directory.
    #[error("Failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Remote fetch failed.
    #[error("Failed to fetch '{url}': {message}")]
    Http { url: String, message: String },

    /// Content could not be decoded as UTF-8 nor Latin-1.
    #[error("Failed to decode content: {0}")]
    Encoding(String),

    /// Invalid CSV structure.
    #[error("Invalid CSV format: {0}")]
    Csv(String),

    /// Folder exists but holds no CSV files.
    #[error("No CSV files found in '{0}'")]
    EmptyFolder(String),
}

/// A skipped source together with its error, as reported to the caller.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFailure {
    /// Source identifier (file name, upload name or URL).
    pub source: String,
    /// Human-readable cause.
    pub message: String,
}

impl SourceFailure {
    pub fn new(source: impl Into<String>, error: &SourceError) -> Self {
        Self {
            source: source.into(),
            message: error.to_string(),
        }
    }
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level load errors.
///
/// This is the error returned by [`crate::transform::pipeline::ingest_and_normalize`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// No source yielded any rows.
    #[error("No data loaded ({} source(s) failed)", failures.len())]
    NoDataLoaded { failures: Vec<SourceFailure> },

    /// A single-source operation failed.
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while serializing a view.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV writer error.
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet writer error.
    #[error("Spreadsheet export failed: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// IO error while flushing.
    #[error("Export IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Config Errors
// =============================================================================

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// No dataset loaded yet.
    #[error("No dataset loaded")]
    NotLoaded,

    /// Response body could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for source reads.
pub type SourceResult<T> = Result<T, SourceError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for exports.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let source_err = SourceError::EmptyFolder("data".into());
        let pipeline_err: PipelineError = source_err.into();
        assert!(pipeline_err.to_string().contains("data"));

        let server_err: ServerError = pipeline_err.into();
        assert!(server_err.to_string().contains("Pipeline"));
    }

    #[test]
    fn test_no_data_message_counts_failures() {
        let failures = vec![
            SourceFailure::new("a.csv", &SourceError::Csv("bad".into())),
            SourceFailure::new("b.csv", &SourceError::Encoding("bad".into())),
        ];
        let err = PipelineError::NoDataLoaded { failures };
        assert!(err.to_string().contains("2 source(s)"));
    }

    #[test]
    fn test_source_failure_keeps_message() {
        let err = SourceError::Http {
            url: "https://example.com/x.csv".into(),
            message: "HTTP 404".into(),
        };
        let failure = SourceFailure::new("https://example.com/x.csv", &err);
        assert!(failure.message.contains("HTTP 404"));
    }
}
