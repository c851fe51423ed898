//! Combinatorial novelty: the share of a paper's keyword pairs that were never
//! seen in the background corpus, or first seen recently.

use crate::aggregate::{Metric, PaperScore};
use crate::config::NoveltyConfig;
use crate::corpus::{Corpus, Paper};
use crate::progress::ProgressTracker;
use crate::timeline::{keyword_pairs, KeywordPairTimeline};
use chrono::Datelike;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyParams {
    pub threshold_years: i32,
    pub reference_year: i32,
}

impl NoveltyParams {
    /// Resolve the reference year: configured value, else the latest target
    /// year, else the current calendar year.
    pub fn resolve(config: &NoveltyConfig, target: &Corpus) -> Self {
        let reference_year = config
            .reference_year
            .or_else(|| target.max_year())
            .unwrap_or_else(|| chrono::Local::now().year());
        Self {
            threshold_years: config.threshold_years,
            reference_year,
        }
    }
}

/// Pair counts behind one novelty ratio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoveltyBreakdown {
    pub keyword_count: usize,
    pub novel_pairs: usize,
    pub total_pairs: usize,
}

impl NoveltyBreakdown {
    /// `None` when the paper has fewer than two keywords
    pub fn ratio(&self) -> Option<f64> {
        if self.total_pairs == 0 {
            return None;
        }
        Some(self.novel_pairs as f64 / self.total_pairs as f64)
    }
}

pub fn novelty_breakdown(paper: &Paper, timeline: &KeywordPairTimeline, params: &NoveltyParams) -> NoveltyBreakdown {
    let pairs = keyword_pairs(&paper.keywords);
    let novel_pairs = pairs
        .iter()
        .filter(|pair| match timeline.first_year(pair) {
            None => true,
            Some(first) => params.reference_year.saturating_sub(first) <= params.threshold_years,
        })
        .count();

    NoveltyBreakdown {
        keyword_count: paper.keywords.len(),
        novel_pairs,
        total_pairs: pairs.len(),
    }
}

pub fn novelty(paper: &Paper, timeline: &KeywordPairTimeline, params: &NoveltyParams) -> Option<f64> {
    novelty_breakdown(paper, timeline, params).ratio()
}

#[derive(Debug, Clone, Default)]
pub struct NoveltyBatch {
    pub scores: Vec<PaperScore>,
    /// Pair counts behind each score, aligned with `scores`
    pub breakdowns: Vec<NoveltyBreakdown>,
    /// Papers with fewer than two keywords (scored NaN)
    pub insufficient_keywords: usize,
}

pub fn score_novelty(timeline: &KeywordPairTimeline, target: &Corpus, params: &NoveltyParams) -> NoveltyBatch {
    info!(
        papers = target.len(),
        reference_year = params.reference_year,
        threshold_years = params.threshold_years,
        "Computing novelty scores"
    );
    let progress = ProgressTracker::new("novelty", target.len());

    let (scores, breakdowns): (Vec<PaperScore>, Vec<NoveltyBreakdown>) = target
        .papers()
        .par_iter()
        .map(|paper| {
            let breakdown = novelty_breakdown(paper, timeline, params);
            let value = breakdown.ratio().unwrap_or(f64::NAN);
            progress.tick();
            (PaperScore::new(&paper.id, &paper.journal, Metric::Novelty, value), breakdown)
        })
        .unzip();

    let insufficient_keywords = scores.iter().filter(|s| !s.is_valid()).count();
    info!(
        scored = scores.len() - insufficient_keywords,
        insufficient_keywords,
        "Novelty scoring complete"
    );

    NoveltyBatch {
        scores,
        breakdowns,
        insufficient_keywords,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Dataset;

    fn timeline() -> KeywordPairTimeline {
        let papers = vec![
            Paper::new("b1", "J").with_year(2018).with_keywords(&["nlp", "transformer"]),
            Paper::new("b2", "J").with_year(2010).with_keywords(&["nlp", "parsing"]),
        ];
        KeywordPairTimeline::build(&papers)
    }

    fn params(reference_year: i32) -> NoveltyParams {
        NoveltyParams {
            threshold_years: 1,
            reference_year,
        }
    }

    #[test]
    fn test_recent_pair_is_novel() {
        let paper = Paper::new("t", "J").with_year(2019).with_keywords(&["NLP", "Transformer"]);
        assert_eq!(novelty(&paper, &timeline(), &params(2019)), Some(1.0));
        assert_eq!(novelty(&paper, &timeline(), &params(2020)), Some(0.0));
    }

    #[test]
    fn test_breakdown() {
        let paper = Paper::new("t", "J").with_keywords(&["nlp", "parsing", "transformer"]);
        let breakdown = novelty_breakdown(&paper, &timeline(), &params(2019));
        // nlp/parsing is old, nlp/transformer recent, parsing/transformer unseen.
        assert_eq!(
            breakdown,
            NoveltyBreakdown {
                keyword_count: 3,
                novel_pairs: 2,
                total_pairs: 3
            }
        );
        assert_eq!(breakdown.ratio(), Some(2.0 / 3.0));
    }

    #[test]
    fn test_extreme_years_do_not_overflow() {
        let background = vec![Paper::new("b", "J").with_year(i32::MIN).with_keywords(&["nlp", "transformer"])];
        let timeline = KeywordPairTimeline::build(&background);
        let paper = Paper::new("t", "J").with_keywords(&["nlp", "transformer"]);

        assert_eq!(novelty(&paper, &timeline, &params(2019)), Some(0.0));
        assert_eq!(novelty(&paper, &timeline, &params(i32::MAX)), Some(0.0));
    }

    #[test]
    fn test_single_keyword_is_undefined() {
        let paper = Paper::new("t", "J").with_keywords(&["nlp"]);
        assert_eq!(novelty(&paper, &timeline(), &params(2019)), None);
    }

    #[test]
    fn test_reference_year_resolution() {
        let target = Corpus::from_papers(
            Dataset::Target,
            vec![Paper::new("a", "J").with_year(2017), Paper::new("b", "J").with_year(2021)],
        );
        let config = NoveltyConfig::default();
        assert_eq!(NoveltyParams::resolve(&config, &target).reference_year, 2021);

        let config = NoveltyConfig {
            reference_year: Some(2000),
            ..NoveltyConfig::default()
        };
        assert_eq!(NoveltyParams::resolve(&config, &target).reference_year, 2000);

        let undated = Corpus::from_papers(Dataset::Target, vec![Paper::new("a", "J")]);
        let resolved = NoveltyParams::resolve(&NoveltyConfig::default(), &undated);
        assert_eq!(resolved.reference_year, chrono::Local::now().year());
    }

    #[test]
    fn test_batch_marks_insufficient_as_nan() {
        let target = Corpus::from_papers(
            Dataset::Target,
            vec![
                Paper::new("a", "J").with_keywords(&["x", "y"]),
                Paper::new("b", "J").with_keywords(&["x"]),
            ],
        );
        let batch = score_novelty(&timeline(), &target, &params(2019));
        assert_eq!(batch.scores[0].value, 1.0);
        assert!(batch.scores[1].value.is_nan());
        assert_eq!(batch.insufficient_keywords, 1);
        assert_eq!(batch.breakdowns[0].total_pairs, 1);
        assert_eq!(batch.breakdowns[1].keyword_count, 1);
        assert_eq!(batch.breakdowns[1].total_pairs, 0);
        assert!(batch
            .scores
            .iter()
            .filter(|s| s.is_valid())
            .all(|s| (0.0..=1.0).contains(&s.value)));
    }
}
