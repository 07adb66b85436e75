//! Summary statistics and group-by rollups over a record view.
//!
//! All functions accept an empty slice and return empty or zero-valued
//! results; no percentage is computed over zero items.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::models::{AssetRecord, Decision};
use crate::transform::classify::HIGH_SIMILARITY;

/// Number of regions listed in the high-priority summary.
const TOP_REGIONS: usize = 5;

/// Default bin count for the similarity histogram.
pub const HISTOGRAM_BINS: usize = 20;

// =============================================================================
// Strategic summary
// =============================================================================

/// Headline metrics of a view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StrategicSummary {
    pub total_itens: usize,
    pub reclassificar: usize,
    pub avaliar: usize,
    pub manter: usize,
    /// `None` when `total_itens == 0`
    pub percentual_reclassificar: Option<f64>,
    pub percentual_avaliar: Option<f64>,
    pub percentual_manter: Option<f64>,
    /// Mean of non-null similarity
    pub similaridade_media: Option<f64>,
    /// Items with similarity ≥ 70
    pub alta_similaridade: usize,
    /// Mean of non-null age
    pub idade_media: Option<f64>,
}

/// One row of the per-region rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRollup {
    pub region: String,
    pub itens_reclassificar: usize,
    pub similaridade_media: Option<f64>,
    pub total_itens: usize,
    /// `itens_reclassificar / total_itens × 100`
    pub eficiencia: f64,
}

/// Result of [`aggregate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub summary: StrategicSummary,
    pub regions: Vec<RegionRollup>,
}

impl Metrics {
    pub fn is_empty(&self) -> bool {
        self.summary.total_itens == 0
    }
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn percent(part: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64 * 100.0)
}

fn count_decision(records: &[AssetRecord], decision: Decision) -> usize {
    records.iter().filter(|r| r.decision == decision).count()
}

/// Compute the headline metrics and the per-region rollup.
pub fn aggregate(records: &[AssetRecord]) -> Metrics {
    if records.is_empty() {
        return Metrics::default();
    }

    Metrics {
        summary: strategic_summary(records),
        regions: region_rollup(records),
    }
}

/// Decision counts, percentages, similarity and age means.
pub fn strategic_summary(records: &[AssetRecord]) -> StrategicSummary {
    let total = records.len();
    let reclassificar = count_decision(records, Decision::Reclassificar);
    let avaliar = count_decision(records, Decision::Avaliar);
    let manter = count_decision(records, Decision::Manter);

    StrategicSummary {
        total_itens: total,
        reclassificar,
        avaliar,
        manter,
        percentual_reclassificar: percent(reclassificar, total),
        percentual_avaliar: percent(avaliar, total),
        percentual_manter: percent(manter, total),
        similaridade_media: mean(records.iter().filter_map(|r| r.similarity_pct)),
        alta_similaridade: records
            .iter()
            .filter(|r| r.similarity_pct.is_some_and(|s| s >= HIGH_SIMILARITY))
            .count(),
        idade_media: mean(records.iter().filter_map(|r| r.age_years).map(f64::from)),
    }
}

/// Per-region reclassify count, mean similarity and efficiency.
///
/// Sorted by efficiency (descending), then region name.
pub fn region_rollup(records: &[AssetRecord]) -> Vec<RegionRollup> {
    #[derive(Default)]
    struct Acc {
        total: usize,
        reclassificar: usize,
        similarity: Vec<f64>,
    }

    let mut groups: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in records {
        let acc = groups.entry(record.region.as_str()).or_default();
        acc.total += 1;
        if record.decision == Decision::Reclassificar {
            acc.reclassificar += 1;
        }
        if let Some(s) = record.similarity_pct {
            acc.similarity.push(s);
        }
    }

    let mut rollup: Vec<RegionRollup> = groups
        .into_iter()
        .map(|(region, acc)| RegionRollup {
            region: region.to_string(),
            itens_reclassificar: acc.reclassificar,
            similaridade_media: mean(acc.similarity),
            total_itens: acc.total,
            eficiencia: percent(acc.reclassificar, acc.total).unwrap_or(0.0),
        })
        .collect();

    rollup.sort_by(|a, b| {
        b.eficiencia
            .total_cmp(&a.eficiencia)
            .then_with(|| a.region.cmp(&b.region))
    });
    rollup
}

// =============================================================================
// Detail views
// =============================================================================

/// Items per decade of incorporation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeCount {
    pub decade: i16,
    pub count: usize,
}

/// Bucket incorporation years by `(year / 10) * 10`. Records without a year are skipped.
pub fn decade_rollup(records: &[AssetRecord]) -> Vec<DecadeCount> {
    let mut counts: BTreeMap<i16, usize> = BTreeMap::new();
    for year in records.iter().filter_map(|r| r.incorporation_year) {
        if let Some(decade) = year.div_euclid(10).checked_mul(10) {
            *counts.entry(decade).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .map(|(decade, count)| DecadeCount { decade, count })
        .collect()
}

/// Incorporations of one year, split by decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub year: i16,
    pub counts: BTreeMap<Decision, usize>,
}

/// Year × decision counts, ordered by year.
pub fn timeline(records: &[AssetRecord]) -> Vec<TimelinePoint> {
    let mut years: BTreeMap<i16, BTreeMap<Decision, usize>> = BTreeMap::new();
    for record in records {
        if let Some(year) = record.incorporation_year {
            *years.entry(year).or_default().entry(record.decision).or_default() += 1;
        }
    }
    years
        .into_iter()
        .map(|(year, counts)| TimelinePoint { year, counts })
        .collect()
}

/// Mean age of the items of one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionAge {
    pub decision: Decision,
    pub count: usize,
    pub idade_media: Option<f64>,
}

/// Mean age per decision present in the view.
pub fn age_by_decision(records: &[AssetRecord]) -> Vec<DecisionAge> {
    Decision::ALL
        .into_iter()
        .filter_map(|decision| {
            let group: Vec<&AssetRecord> =
                records.iter().filter(|r| r.decision == decision).collect();
            if group.is_empty() {
                return None;
            }
            Some(DecisionAge {
                decision,
                count: group.len(),
                idade_media: mean(group.iter().filter_map(|r| r.age_years).map(f64::from)),
            })
        })
        .collect()
}

/// High-priority items summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighPriority {
    /// Items with similarity ≥ 70
    pub alta_similaridade: usize,
    /// Regions with most high-similarity items (top 5)
    pub top_regioes: Vec<(String, usize)>,
    /// Items marked RECLASSIFICAR
    pub reclassificar: usize,
    pub similaridade_media_reclassificar: Option<f64>,
    pub idade_media_reclassificar: Option<f64>,
}

pub fn high_priority(records: &[AssetRecord]) -> HighPriority {
    let mut by_region: HashMap<&str, usize> = HashMap::new();
    let mut alta = 0;
    for record in records {
        if record.similarity_pct.is_some_and(|s| s >= HIGH_SIMILARITY) {
            alta += 1;
            *by_region.entry(record.region.as_str()).or_default() += 1;
        }
    }
    let mut top: Vec<(String, usize)> = by_region
        .into_iter()
        .map(|(region, count)| (region.to_string(), count))
        .collect();
    top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top.truncate(TOP_REGIONS);

    let reclass: Vec<&AssetRecord> = records
        .iter()
        .filter(|r| r.decision == Decision::Reclassificar)
        .collect();

    HighPriority {
        alta_similaridade: alta,
        top_regioes: top,
        reclassificar: reclass.len(),
        similaridade_media_reclassificar: mean(reclass.iter().filter_map(|r| r.similarity_pct)),
        idade_media_reclassificar: mean(reclass.iter().filter_map(|r| r.age_years).map(f64::from)),
    }
}

/// Incorporation year and age diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgeDiagnostics {
    pub ano_medio: Option<f64>,
    pub ano_min: Option<i16>,
    pub ano_max: Option<i16>,
    pub idade_media: Option<f64>,
    pub idade_min: Option<i16>,
    pub idade_max: Option<i16>,
    pub total_registros: usize,
    pub com_data: usize,
    pub sem_data: usize,
    /// Share of records without a date; `None` for an empty view
    pub percentual_sem_data: Option<f64>,
}

pub fn age_diagnostics(records: &[AssetRecord]) -> AgeDiagnostics {
    let years: Vec<i16> = records.iter().filter_map(|r| r.incorporation_year).collect();
    let ages: Vec<i16> = records.iter().filter_map(|r| r.age_years).collect();
    let total = records.len();
    let sem_data = total - years.len();

    AgeDiagnostics {
        ano_medio: mean(years.iter().copied().map(f64::from)),
        ano_min: years.iter().copied().min(),
        ano_max: years.iter().copied().max(),
        idade_media: mean(ages.iter().copied().map(f64::from)),
        idade_min: ages.iter().copied().min(),
        idade_max: ages.iter().copied().max(),
        total_registros: total,
        com_data: years.len(),
        sem_data,
        percentual_sem_data: percent(sem_data, total),
    }
}

/// One histogram bucket, `[start, end)` except the last which is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Equal-width histogram of non-null similarity over the observed range.
pub fn similarity_histogram(records: &[AssetRecord], bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = records.iter().filter_map(|r| r.similarity_pct).collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count,
        })
        .collect()
}

/// Every detail view of a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Details {
    pub decades: Vec<DecadeCount>,
    pub timeline: Vec<TimelinePoint>,
    pub age_by_decision: Vec<DecisionAge>,
    pub high_priority: HighPriority,
    pub age_diagnostics: AgeDiagnostics,
    pub similarity_histogram: Vec<HistogramBin>,
}

pub fn details(records: &[AssetRecord]) -> Details {
    Details {
        decades: decade_rollup(records),
        timeline: timeline(records),
        age_by_decision: age_by_decision(records),
        high_priority: high_priority(records),
        age_diagnostics: age_diagnostics(records),
        similarity_histogram: similarity_histogram(records, HISTOGRAM_BINS),
    }
}

// =============================================================================
// Export summaries
// =============================================================================

/// Similarity and year statistics of one decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionSummary {
    pub decision: Decision,
    pub similarity_count: usize,
    pub similarity_mean: Option<f64>,
    pub similarity_min: Option<f64>,
    pub similarity_max: Option<f64>,
    pub year_min: Option<i16>,
    pub year_max: Option<i16>,
}

/// Group by decision (decisions absent from the view are omitted).
pub fn decision_summary(records: &[AssetRecord]) -> Vec<DecisionSummary> {
    let mut groups: BTreeMap<Decision, Vec<&AssetRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.decision).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(decision, group)| {
            let sims: Vec<f64> = group.iter().filter_map(|r| r.similarity_pct).collect();
            let years = group.iter().filter_map(|r| r.incorporation_year);
            DecisionSummary {
                decision,
                similarity_count: sims.len(),
                similarity_mean: mean(sims.iter().copied()),
                similarity_min: sims.iter().copied().reduce(f64::min),
                similarity_max: sims.iter().copied().reduce(f64::max),
                year_min: years.clone().min(),
                year_max: years.max(),
            }
        })
        .collect()
}

/// Decision value counts and similarity statistics of one region.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionSummary {
    pub region: String,
    pub decision_counts: BTreeMap<Decision, usize>,
    pub similarity_count: usize,
    pub similarity_mean: Option<f64>,
}

/// Group by region, sorted by region name.
pub fn region_summary(records: &[AssetRecord]) -> Vec<RegionSummary> {
    let mut groups: BTreeMap<&str, Vec<&AssetRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.region.as_str()).or_default().push(record);
    }

    groups
        .into_iter()
        .map(|(region, group)| {
            let mut decision_counts = BTreeMap::new();
            for r in &group {
                *decision_counts.entry(r.decision).or_insert(0) += 1;
            }
            let sims: Vec<f64> = group.iter().filter_map(|r| r.similarity_pct).collect();
            RegionSummary {
                region: region.to_string(),
                decision_counts,
                similarity_count: sims.len(),
                similarity_mean: mean(sims),
            }
        })
        .collect()
}
