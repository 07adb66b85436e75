//! # Patrimônio - asset inventory analysis
//!
//! Loads asset-inventory CSV exports (local files, folders, uploads or remote
//! URLs), normalizes Brazilian-formatted fields, classifies every item by
//! disposition decision, similarity tier and region, and serves filtered
//! views, aggregate metrics and CSV/xlsx exports.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Sources   │────▶│   Parser    │────▶│  Transform  │────▶│  RecordSet  │
//! │ file/url/up │     │ (auto-enc)  │     │ (normalize) │     │ (immutable) │
//! └─────────────┘     └─────────────┘     └─────────────┘     └──────┬──────┘
//!                                                                    │
//!                           ┌─────────────┬──────────────┬───────────┘
//!                           ▼             ▼              ▼
//!                       ┌────────┐  ┌───────────┐  ┌──────────┐
//!                       │ Query  │  │ Aggregate │  │  Export  │
//!                       └────────┘  └───────────┘  └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use patrimonio::{aggregate, filter, ingest_and_normalize, FilterPredicates, SourceDescriptor};
//!
//! #[tokio::main]
//! async fn main() {
//!     let loaded = ingest_and_normalize(&[SourceDescriptor::from_arg("data")]).await.unwrap();
//!     let view = filter(&loaded.records, &FilterPredicates::default());
//!     println!("{:?}", aggregate(&view).summary);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Domain models (AssetRecord, Decision, SimilarityTier)
//! - [`parser`] - CSV parsing with encoding fallback and column allow-list
//! - [`ingest`] - Source loading and folder consolidation
//! - [`transform`] - Normalization, classification and the load pipeline
//! - [`query`] - Filter predicates
//! - [`aggregate`] - Metrics and detail analytics
//! - [`export`] - CSV and spreadsheet output
//! - [`cache`] - Query result cache
//! - [`demo`] - Demonstration dataset
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Loading
pub mod ingest;
pub mod parser;

// Transformation
pub mod transform;

// Analysis
pub mod aggregate;
pub mod query;

// Output
pub mod export;

// Caching
pub mod cache;

// Demo data
pub mod demo;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ConfigError,
    ExportError,
    PipelineError,
    ServerError,
    SourceError,
    SourceFailure,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    AssetRecord,
    Decision,
    RecordSet,
    SimilarityTier,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    parse_bytes_auto,
    parse_csv_file_auto,
    Column,
    ParseResult,
    RawRow,
};

pub use ingest::{
    consolidate::{consolidate_folder, ConsolidationReport},
    ingest,
    SourceBatch,
    SourceDescriptor,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::{
    build_record_set,
    classify_decision,
    classify_similarity_tier,
    extract_region,
    ingest_and_normalize,
    normalize_row,
    LoadOutcome,
    LoadSummary,
};

// =============================================================================
// Re-exports - Query & Aggregation
// =============================================================================

pub use query::{filter, filter_options, FilterOptions, FilterPredicates};

pub use aggregate::{aggregate, details, Details, Metrics};

// =============================================================================
// Re-exports - Export
// =============================================================================

pub use export::{export_csv, export_file_name, export_spreadsheet};

// =============================================================================
// Re-exports - Cache & Config
// =============================================================================

pub use cache::{CacheKey, QueryCache};

pub use config::AppConfig;

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
