//! Filter engine over the normalized dataset.
//!
//! A filter is a conjunction of optional predicates. Unset predicates (or
//! the "Todas" sentinel) are not applied. Filtering never mutates its input;
//! it returns a new vector holding copies of the matching records.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

use crate::models::{AssetRecord, Decision, ALL_FILTER};

/// Predicates for [`filter`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterPredicates {
    /// Exact region match
    pub region: Option<String>,
    /// Exact decision label match (e.g. `RECLASSIFICAR`, `Sem Categoria`)
    pub decision: Option<String>,
    /// Inclusive lower bound on incorporation year
    pub year_min: Option<i16>,
    /// Inclusive upper bound on incorporation year
    pub year_max: Option<i16>,
    /// Inclusive lower bound on similarity percentage
    #[serde(deserialize_with = "finite_bound")]
    pub similarity_min: Option<f64>,
}

/// Rejects `NaN` and infinities, which have no JSON form.
fn finite_bound<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    match Option::<f64>::deserialize(deserializer)? {
        Some(v) if !v.is_finite() => Err(de::Error::custom("similarity_min must be a finite number")),
        value => Ok(value),
    }
}

impl FilterPredicates {
    /// True when no predicate would be applied.
    pub fn is_empty(&self) -> bool {
        active(&self.region).is_none()
            && active(&self.decision).is_none()
            && self.year_min.is_none()
            && self.year_max.is_none()
            && self.similarity_min.is_none()
    }

    /// Check numeric bounds for values that cannot be compared or cached.
    pub fn validate(&self) -> Result<(), String> {
        match self.similarity_min {
            Some(v) if !v.is_finite() => Err(format!("similarity_min must be a finite number, got {}", v)),
            _ => Ok(()),
        }
    }

    /// Test a single record against every active predicate.
    pub fn matches(&self, record: &AssetRecord) -> bool {
        if let Some(region) = active(&self.region) {
            if record.region != region {
                return false;
            }
        }

        if let Some(label) = active(&self.decision) {
            match label.parse::<Decision>() {
                Ok(decision) if decision == record.decision => {}
                _ => return false,
            }
        }

        // A missing year fails any bound
        if let Some(min) = self.year_min {
            if !record.incorporation_year.is_some_and(|y| y >= min) {
                return false;
            }
        }
        if let Some(max) = self.year_max {
            if !record.incorporation_year.is_some_and(|y| y <= max) {
                return false;
            }
        }

        if let Some(min) = self.similarity_min {
            if !record.similarity_pct.is_some_and(|s| s >= min) {
                return false;
            }
        }

        true
    }
}

fn active(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty() && *v != ALL_FILTER)
}

/// Return the records satisfying all predicates, in input order.
pub fn filter(records: &[AssetRecord], predicates: &FilterPredicates) -> Vec<AssetRecord> {
    records
        .iter()
        .filter(|r| predicates.matches(r))
        .cloned()
        .collect()
}

/// Values available for filter widgets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    /// Distinct regions, sorted
    pub regions: Vec<String>,
    /// Distinct decision labels present, sorted
    pub decisions: Vec<String>,
    /// Earliest incorporation year present
    pub year_min: Option<i16>,
    /// Latest incorporation year present
    pub year_max: Option<i16>,
}

/// Collect the distinct regions, decisions and year span of a dataset.
pub fn filter_options(records: &[AssetRecord]) -> FilterOptions {
    let regions: BTreeSet<&str> = records.iter().map(|r| r.region.as_str()).collect();
    let decisions: BTreeSet<&str> = records.iter().map(|r| r.decision.as_str()).collect();
    let years = records.iter().filter_map(|r| r.incorporation_year);

    FilterOptions {
        regions: regions.into_iter().map(String::from).collect(),
        decisions: decisions.into_iter().map(String::from).collect(),
        year_min: years.clone().min(),
        year_max: years.max(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Column, RawRow};
    use crate::transform::normalize_row;

    fn record(region: &str, similarity: &str, date: &str, justification: &str) -> AssetRecord {
        normalize_row(
            &RawRow::new("t.csv")
                .with(Column::Location, region)
                .with(Column::SimilarityPct, similarity)
                .with(Column::IncorporationDate, date)
                .with(Column::RejectionJustification, justification),
        )
    }

    fn sample() -> Vec<AssetRecord> {
        vec![
            record("1.01 BRÁS", "75.0%", "2012-01-10", "RECLASSIFICAR"),
            record("2.01 SANTOS", "30.0%", "2018-05-01", "MANTER"),
            record("1.01 BRÁS", "55.0%", "", "AVALIAR"),
            record("2.01 SANTOS", "", "2020-02-02", "RECLASSIFICAR"),
            record("", "45.0%", "2015-07-07", ""),
        ]
    }

    #[test]
    fn test_no_predicates_returns_everything() {
        let records = sample();
        assert_eq!(filter(&records, &FilterPredicates::default()), records);

        let todas = FilterPredicates {
            region: Some("Todas".into()),
            decision: Some("Todas".into()),
            ..Default::default()
        };
        assert!(todas.is_empty());
        assert_eq!(filter(&records, &todas).len(), records.len());
    }

    #[test]
    fn test_region_and_decision_exact_match() {
        let records = sample();
        let by_region = FilterPredicates {
            region: Some("1.01 BRÁS".into()),
            ..Default::default()
        };
        assert_eq!(filter(&records, &by_region).len(), 2);

        let by_decision = FilterPredicates {
            decision: Some("RECLASSIFICAR".into()),
            ..Default::default()
        };
        assert_eq!(filter(&records, &by_decision).len(), 2);

        let unknown = FilterPredicates {
            decision: Some("reclassificar".into()),
            ..Default::default()
        };
        assert!(filter(&records, &unknown).is_empty());
    }

    #[test]
    fn test_missing_year_excluded_by_year_bound() {
        let records = sample();
        let predicates = FilterPredicates {
            year_min: Some(2000),
            ..Default::default()
        };
        let view = filter(&records, &predicates);
        assert_eq!(view.len(), 4);
        assert!(view.iter().all(|r| r.incorporation_year.is_some()));

        let range = FilterPredicates {
            year_min: Some(2015),
            year_max: Some(2018),
            ..Default::default()
        };
        let years: Vec<_> = filter(&records, &range)
            .iter()
            .filter_map(|r| r.incorporation_year)
            .collect();
        assert_eq!(years, vec![2018, 2015]);
    }

    #[test]
    fn test_similarity_bound_is_inclusive() {
        let records = sample();
        let predicates = FilterPredicates {
            similarity_min: Some(55.0),
            ..Default::default()
        };
        assert_eq!(filter(&records, &predicates).len(), 2);
    }

    #[test]
    fn test_filter_is_idempotent() {
        let records = sample();
        let predicates = FilterPredicates {
            region: Some("2.01 SANTOS".into()),
            year_min: Some(2010),
            ..Default::default()
        };
        let once = filter(&records, &predicates);
        let twice = filter(&once, &predicates);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_commutes_across_predicates() {
        let records = sample();
        let region = FilterPredicates {
            region: Some("2.01 SANTOS".into()),
            ..Default::default()
        };
        let decision = FilterPredicates {
            decision: Some("RECLASSIFICAR".into()),
            ..Default::default()
        };
        let both = FilterPredicates {
            region: region.region.clone(),
            decision: decision.decision.clone(),
            ..Default::default()
        };

        let sequential = filter(&filter(&records, &region), &decision);
        let reversed = filter(&filter(&records, &decision), &region);
        let combined = filter(&records, &both);
        assert_eq!(sequential, combined);
        assert_eq!(reversed, combined);
        assert_eq!(combined.len(), 1);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let records = sample();
        let before = records.clone();
        let _ = filter(&records, &FilterPredicates {
            similarity_min: Some(99.0),
            ..Default::default()
        });
        assert_eq!(records, before);
    }

    #[test]
    fn test_non_finite_similarity_is_invalid() {
        for bound in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let predicates = FilterPredicates {
                similarity_min: Some(bound),
                ..Default::default()
            };
            assert!(predicates.validate().is_err());
        }
        assert!(FilterPredicates::default().validate().is_ok());

        let parsed: FilterPredicates = serde_json::from_str(r#"{"similarity_min": 42.5}"#).unwrap();
        assert_eq!(parsed.similarity_min, Some(42.5));
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_filter_options() {
        let options = filter_options(&sample());
        assert_eq!(
            options.regions,
            vec!["1.01 BRÁS", "2.01 SANTOS", "Não Informado"]
        );
        assert_eq!(
            options.decisions,
            vec!["AVALIAR", "MANTER", "RECLASSIFICAR", "Sem Categoria"]
        );
        assert_eq!(options.year_min, Some(2012));
        assert_eq!(options.year_max, Some(2020));
    }
}
