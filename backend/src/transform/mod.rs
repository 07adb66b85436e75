//! Transformation module.
//!
//! Raw rows become typed, classified records here:
//! - Normalize: currency, percentage, date and integer parsing
//! - Classify: decision, similarity tier and region rule tables
//! - Pipeline: load sources and build the dataset

pub mod classify;
pub mod normalize;
pub mod pipeline;

pub use classify::{classify_decision, classify_similarity_tier, extract_region};
pub use normalize::{normalize_row, normalize_rows, parse_currency, parse_percentage, parse_year};
pub use pipeline::*;
