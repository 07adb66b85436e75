//! Rule tables deriving categorical labels from normalized fields.
//!
//! Every function here is total: any input, including `None`, maps to
//! exactly one label.

use crate::models::{Decision, SimilarityTier, UNKNOWN_REGION};

/// Keyword → decision, checked in order. First match wins.
pub const DECISION_RULES: &[(&str, Decision)] = &[
    ("RECLASSIFICAR", Decision::Reclassificar),
    ("AVALIAR", Decision::Avaliar),
    ("MANTER", Decision::Manter),
];

/// Inclusive lower bound → tier, checked top-down.
pub const SIMILARITY_TIERS: &[(f64, SimilarityTier)] = &[
    (70.0, SimilarityTier::MuitoAlta),
    (50.0, SimilarityTier::Alta),
    (35.0, SimilarityTier::Moderada),
];

/// Similarity at or above which an item is considered high priority.
pub const HIGH_SIMILARITY: f64 = 70.0;

/// Classify a rejection justification.
///
/// `None` maps to [`Decision::SemCategoria`]; text without any keyword maps
/// to [`Decision::Outros`]. Matching is case-insensitive substring search.
pub fn classify_decision(justification: Option<&str>) -> Decision {
    let Some(text) = justification else {
        return Decision::SemCategoria;
    };
    let upper = text.to_uppercase();
    DECISION_RULES
        .iter()
        .find(|(keyword, _)| upper.contains(keyword))
        .map(|&(_, decision)| decision)
        .unwrap_or(Decision::Outros)
}

/// Bucket a similarity percentage.
pub fn classify_similarity_tier(pct: Option<f64>) -> SimilarityTier {
    // NaN compares false against every bound and lands in Baixa
    let Some(pct) = pct else {
        return SimilarityTier::SemDados;
    };
    SIMILARITY_TIERS
        .iter()
        .find(|(lower, _)| pct >= *lower)
        .map(|&(_, tier)| tier)
        .unwrap_or(SimilarityTier::Baixa)
}

/// Region grouping key: the trimmed location, or "Não Informado".
pub fn extract_region(location: Option<&str>) -> String {
    match location {
        Some(loc) => loc.trim().to_string(),
        None => UNKNOWN_REGION.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_priority_order() {
        assert_eq!(classify_decision(Some("MANTER ou AVALIAR")), Decision::Avaliar);
        assert_eq!(
            classify_decision(Some("manter, avaliar e reclassificar")),
            Decision::Reclassificar
        );
        assert_eq!(classify_decision(Some("Manter: baixa")), Decision::Manter);
    }

    #[test]
    fn test_decision_defaults() {
        assert_eq!(classify_decision(None), Decision::SemCategoria);
        assert_eq!(classify_decision(Some("")), Decision::Outros);
        assert_eq!(classify_decision(Some("descartar")), Decision::Outros);
    }

    #[test]
    fn test_decision_is_total() {
        let inputs = [None, Some(""), Some("x"), Some("RECLASSIFICAR: alta"), Some("ávaliar")];
        for input in inputs {
            let decision = classify_decision(input);
            assert!(Decision::ALL.contains(&decision));
        }
    }

    #[test]
    fn test_similarity_tier_boundaries() {
        assert_eq!(classify_similarity_tier(Some(70.0)), SimilarityTier::MuitoAlta);
        assert_eq!(classify_similarity_tier(Some(69.9)), SimilarityTier::Alta);
        assert_eq!(classify_similarity_tier(Some(50.0)), SimilarityTier::Alta);
        assert_eq!(classify_similarity_tier(Some(49.9)), SimilarityTier::Moderada);
        assert_eq!(classify_similarity_tier(Some(35.0)), SimilarityTier::Moderada);
        assert_eq!(classify_similarity_tier(Some(34.9)), SimilarityTier::Baixa);
        assert_eq!(classify_similarity_tier(Some(-5.0)), SimilarityTier::Baixa);
        assert_eq!(classify_similarity_tier(None), SimilarityTier::SemDados);
    }

    #[test]
    fn test_extract_region() {
        assert_eq!(extract_region(Some("  1.01 BRÁS ")), "1.01 BRÁS");
        assert_eq!(extract_region(None), "Não Informado");
    }
}
