//! Domain models for the inventory pipeline.
//!
//! - [`AssetRecord`] - One asset item after normalization and classification
//! - [`Decision`] - Disposition category derived from the rejection justification
//! - [`SimilarityTier`] - Bucketed similarity percentage
//! - [`RecordSet`] - Immutable, shareable handle over the consolidated dataset

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Year the item age is computed against.
pub const REFERENCE_YEAR: i16 = 2025;

/// Region used when an item has no location.
pub const UNKNOWN_REGION: &str = "Não Informado";

/// Filter value meaning "do not filter on this field".
pub const ALL_FILTER: &str = "Todas";

// =============================================================================
// Decision
// =============================================================================

/// Disposition of an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decision {
    #[serde(rename = "RECLASSIFICAR")]
    Reclassificar,
    #[serde(rename = "AVALIAR")]
    Avaliar,
    #[serde(rename = "MANTER")]
    Manter,
    #[serde(rename = "OUTROS")]
    Outros,
    #[serde(rename = "Sem Categoria")]
    SemCategoria,
}

impl Decision {
    pub const ALL: [Decision; 5] = [
        Decision::Reclassificar,
        Decision::Avaliar,
        Decision::Manter,
        Decision::Outros,
        Decision::SemCategoria,
    ];

    /// Display label, also used for exact-match filtering and exports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reclassificar => "RECLASSIFICAR",
            Self::Avaliar => "AVALIAR",
            Self::Manter => "MANTER",
            Self::Outros => "OUTROS",
            Self::SemCategoria => "Sem Categoria",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Decision {
    type Err = String;

    /// Accepts the display label or the variant name (`SemCategoria`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "RECLASSIFICAR" => Ok(Self::Reclassificar),
            "AVALIAR" => Ok(Self::Avaliar),
            "MANTER" => Ok(Self::Manter),
            "OUTROS" => Ok(Self::Outros),
            "Sem Categoria" | "SemCategoria" => Ok(Self::SemCategoria),
            other => Err(format!("Unknown decision: {}", other)),
        }
    }
}

// =============================================================================
// Similarity Tier
// =============================================================================

/// Similarity bucket, lower bound inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SimilarityTier {
    #[serde(rename = "Muito Alta (≥70%)")]
    MuitoAlta,
    #[serde(rename = "Alta (50-69%)")]
    Alta,
    #[serde(rename = "Moderada (35-49%)")]
    Moderada,
    #[serde(rename = "Baixa (<35%)")]
    Baixa,
    #[serde(rename = "Sem Dados")]
    SemDados,
}

impl SimilarityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MuitoAlta => "Muito Alta (≥70%)",
            Self::Alta => "Alta (50-69%)",
            Self::Moderada => "Moderada (35-49%)",
            Self::Baixa => "Baixa (<35%)",
            Self::SemDados => "Sem Dados",
        }
    }
}

impl fmt::Display for SimilarityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Asset Record
// =============================================================================

/// One inventory item after type coercion and derived-field computation.
///
/// `region` and `decision` are always populated; numeric fields are `None`
/// when the source text was missing or malformed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetRecord {
    pub location: String,
    pub inventory_id: String,
    pub description: String,
    pub useful_life_years: Option<i64>,
    pub acquisition_value: Option<f64>,
    pub book_value: Option<f64>,
    pub similar_consumable_item: String,
    pub similarity_pct: Option<f64>,
    pub incorporation_year: Option<i16>,
    pub age_years: Option<i16>,
    pub decision: Decision,
    pub similarity_tier: SimilarityTier,
    pub region: String,
    pub source_file: String,
}

// =============================================================================
// Record Set
// =============================================================================

/// The consolidated dataset.
///
/// Cloning is cheap (shared `Arc`); the records are never mutated after
/// construction. `id` identifies this exact dataset for cache keys.
#[derive(Debug, Clone)]
pub struct RecordSet {
    id: Uuid,
    records: Arc<[AssetRecord]>,
}

impl RecordSet {
    pub fn new(records: Vec<AssetRecord>) -> Self {
        Self {
            id: Uuid::new_v4(),
            records: records.into(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn records(&self) -> &[AssetRecord] {
        &self.records
    }
}

impl Deref for RecordSet {
    type Target = [AssetRecord];

    fn deref(&self) -> &Self::Target {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_from_label_and_variant() {
        assert_eq!("RECLASSIFICAR".parse::<Decision>(), Ok(Decision::Reclassificar));
        assert_eq!("Sem Categoria".parse::<Decision>(), Ok(Decision::SemCategoria));
        assert_eq!("SemCategoria".parse::<Decision>(), Ok(Decision::SemCategoria));
        assert!("reclassificar".parse::<Decision>().is_err());
    }

    #[test]
    fn test_decision_serializes_as_label() {
        let json = serde_json::to_string(&Decision::SemCategoria).unwrap();
        assert_eq!(json, "\"Sem Categoria\"");
        for decision in Decision::ALL {
            assert_eq!(decision.as_str().parse::<Decision>(), Ok(decision));
        }
    }

    #[test]
    fn test_record_set_is_shared() {
        let set = RecordSet::new(Vec::new());
        let clone = set.clone();
        assert_eq!(set.id(), clone.id());
        assert!(clone.is_empty());
    }
}
