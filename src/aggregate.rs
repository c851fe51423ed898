//! Journal-level aggregation and ranking.
//!
//! Per-paper scores for one metric are grouped by journal and reduced to a
//! raw mean, a Top-K mean and a volume-weighted score:
//!
//! ```text
//! volume_weighted = (1 - w) * top_k_mean + w * top_k_mean / ln(1 + n)
//! ```
//!
//! NaN scores are dropped before grouping; a journal left with no valid
//! score does not appear in the ranking at all.

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Bibliometric dimensions scored by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "disruption")]
    Disruption,
    #[serde(rename = "novelty")]
    Novelty,
    #[serde(rename = "td")]
    Interdisciplinarity,
}

impl Metric {
    pub const ALL: [Metric; 3] = [
        Metric::Disruption,
        Metric::Novelty,
        Metric::Interdisciplinarity,
    ];

    /// Short machine name used in file names and tables
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Disruption => "disruption",
            Metric::Novelty => "novelty",
            Metric::Interdisciplinarity => "td",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Metric {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "disruption" | "d" | "dindex" => Ok(Metric::Disruption),
            "novelty" => Ok(Metric::Novelty),
            "td" | "interdisciplinarity" => Ok(Metric::Interdisciplinarity),
            other => Err(AnalysisError::Validation(format!(
                "Unknown metric '{}' (expected disruption, novelty or td)",
                other
            ))),
        }
    }
}

/// One paper's value for one metric. `value` is NaN when undefined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperScore {
    pub id: String,
    pub journal: String,
    pub metric: Metric,
    pub value: f64,
}

impl PaperScore {
    pub fn new(id: impl Into<String>, journal: impl Into<String>, metric: Metric, value: f64) -> Self {
        Self {
            id: id.into(),
            journal: journal.into(),
            metric,
            value,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// Which journal statistic drives the ranking and percent score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingBasis {
    VolumeWeighted,
    RawMean,
}

/// Aggregation parameters for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateParams {
    /// Number of best papers averaged per journal
    pub top_k: usize,
    /// Weight `w` of the ln(1 + n) volume penalty
    pub volume_weight: f64,
    /// Presentation-only multiplier applied to the basis value
    pub percent_scale: f64,
    pub basis: RankingBasis,
}

impl Default for AggregateParams {
    fn default() -> Self {
        Self::new(100.0, RankingBasis::VolumeWeighted)
    }
}

impl AggregateParams {
    pub fn new(percent_scale: f64, basis: RankingBasis) -> Self {
        Self {
            top_k: 10,
            volume_weight: 0.4,
            percent_scale,
            basis,
        }
    }

    pub fn validate(&self, metric: &str) -> Result<()> {
        if self.top_k == 0 {
            return Err(AnalysisError::Config(format!("{}: top_k must be >= 1", metric)));
        }
        if !(0.0..=1.0).contains(&self.volume_weight) {
            return Err(AnalysisError::Config(format!(
                "{}: volume_weight must be within [0, 1], got {}",
                metric, self.volume_weight
            )));
        }
        if !self.percent_scale.is_finite() {
            return Err(AnalysisError::Config(format!(
                "{}: percent_scale must be finite",
                metric
            )));
        }
        Ok(())
    }
}

/// Ranked journal-level summary of one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalAggregate {
    pub rank: usize,
    pub journal: String,
    /// Papers with a valid score
    pub paper_count: usize,
    pub raw_mean: f64,
    pub top_k_mean: f64,
    pub volume_weighted_score: f64,
    pub percent_score: f64,
    /// Population standard deviation of the valid scores
    pub std_dev: f64,
}

/// Mean of the best `min(k, n)` values. Empty input gives NaN.
pub fn top_k_mean(values: &[f64], k: usize) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let take = k.min(sorted.len());
    mean(&sorted[..take])
}

/// Blend the Top-K mean with a ln(1 + n) volume penalty.
pub fn volume_weighted(top_k_mean: f64, paper_count: usize, weight: f64) -> f64 {
    let log_n = (paper_count as f64).ln_1p();
    if log_n <= 0.0 {
        return top_k_mean;
    }
    (1.0 - weight) * top_k_mean + weight * (top_k_mean / log_n)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn population_std(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Group scores by journal and produce the ranked journal table.
///
/// Ties on the ranking basis are broken by journal name, ascending.
pub fn aggregate_journals(scores: &[PaperScore], params: &AggregateParams) -> Vec<JournalAggregate> {
    let mut by_journal: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut dropped = 0usize;

    for score in scores {
        if score.is_valid() {
            by_journal.entry(score.journal.as_str()).or_default().push(score.value);
        } else {
            dropped += 1;
        }
    }

    let mut journals: Vec<JournalAggregate> = by_journal
        .into_iter()
        .map(|(journal, mut values)| {
            // Fixed summation order keeps results independent of input order.
            values.sort_by(|a, b| b.total_cmp(a));
            let n = values.len();
            let raw_mean = mean(&values);
            let top_mean = top_k_mean(&values, params.top_k);
            let weighted = volume_weighted(top_mean, n, params.volume_weight);
            let basis_value = match params.basis {
                RankingBasis::VolumeWeighted => weighted,
                RankingBasis::RawMean => raw_mean,
            };
            JournalAggregate {
                rank: 0,
                journal: journal.to_string(),
                paper_count: n,
                raw_mean,
                top_k_mean: top_mean,
                volume_weighted_score: weighted,
                percent_score: basis_value * params.percent_scale,
                std_dev: population_std(&values, raw_mean),
            }
        })
        .collect();

    let basis = params.basis;
    let key = move |j: &JournalAggregate| match basis {
        RankingBasis::VolumeWeighted => j.volume_weighted_score,
        RankingBasis::RawMean => j.raw_mean,
    };
    journals.sort_by(|a, b| key(b).total_cmp(&key(a)).then_with(|| a.journal.cmp(&b.journal)));

    for (idx, journal) in journals.iter_mut().enumerate() {
        journal.rank = idx + 1;
    }

    debug!(
        journals = journals.len(),
        dropped_scores = dropped,
        "Aggregated journal scores"
    );

    journals
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(journal: &str, value: f64) -> PaperScore {
        PaperScore::new(format!("{}-{}", journal, value), journal, Metric::Disruption, value)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_metric_from_str() {
        assert_eq!("TD".parse::<Metric>().ok(), Some(Metric::Interdisciplinarity));
        assert_eq!("novelty".parse::<Metric>().ok(), Some(Metric::Novelty));
        assert!("impact".parse::<Metric>().is_err());
    }

    #[test]
    fn test_top_k_mean_takes_best() {
        assert!(close(top_k_mean(&[0.1, 0.9, 0.5], 2), 0.7));
        assert!(close(top_k_mean(&[0.1, 0.9, 0.5], 10), 0.5));
        assert!(top_k_mean(&[], 3).is_nan());
    }

    #[test]
    fn test_volume_weighted_formula() {
        let expected = 0.6 * 0.8 + 0.4 * (0.8 / 5.0_f64.ln());
        assert!(close(volume_weighted(0.8, 4, 0.4), expected));
        assert!(close(volume_weighted(0.8, 4, 0.0), 0.8));
    }

    #[test]
    fn test_nan_scores_ignored_and_empty_journal_excluded() {
        let scores = vec![
            score("A", 0.9),
            score("A", 0.1),
            score("A", f64::NAN),
            score("B", f64::NAN),
        ];
        let params = AggregateParams::default();
        let journals = aggregate_journals(&scores, &params);

        assert_eq!(journals.len(), 1);
        let a = &journals[0];
        assert_eq!(a.journal, "A");
        assert_eq!(a.paper_count, 2);
        assert!(close(a.raw_mean, 0.5));
        assert!(close(a.top_k_mean, 0.5));
        assert!(close(a.std_dev, 0.4));
        assert_eq!(a.rank, 1);
    }

    #[test]
    fn test_ties_break_by_journal_name() {
        let scores = vec![score("Zeta", 0.5), score("Alpha", 0.5), score("Mid", 0.7)];
        let journals = aggregate_journals(&scores, &AggregateParams::default());
        let names: Vec<&str> = journals.iter().map(|j| j.journal.as_str()).collect();
        assert_eq!(names, vec!["Mid", "Alpha", "Zeta"]);
        assert_eq!(journals.iter().map(|j| j.rank).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[test]
    fn test_raw_mean_basis_and_percent_scale() {
        let scores = vec![score("A", 0.2), score("A", 0.4), score("B", 0.35)];
        let params = AggregateParams::new(600.0, RankingBasis::RawMean);
        let journals = aggregate_journals(&scores, &params);

        assert_eq!(journals[0].journal, "B");
        assert!(close(journals[0].percent_score, 0.35 * 600.0));
        assert!(close(journals[1].percent_score, 0.3 * 600.0));
    }

    #[test]
    fn test_small_journal_penalized_but_not_erased() {
        // One perfect paper versus ten strong papers.
        let mut scores = vec![score("Tiny", 1.0)];
        scores.extend((0..10).map(|i| score("Large", 0.8 + i as f64 * 0.001)));
        let journals = aggregate_journals(&scores, &AggregateParams::default());

        let tiny = journals.iter().find(|j| j.journal == "Tiny");
        assert!(tiny.is_some_and(|t| t.volume_weighted_score > 0.0));
        assert!(tiny.is_some_and(|t| t.volume_weighted_score > t.top_k_mean * 0.6));
    }

    #[test]
    fn test_params_validation() {
        let mut params = AggregateParams::default();
        assert!(params.validate("x").is_ok());
        params.top_k = 0;
        assert!(params.validate("x").is_err());
    }
}
