//! End-to-end analysis across the selected metrics.
//!
//! Each metric builds only the structures it needs and either yields a
//! [`MetricReport`] or a [`ComponentFailure`]. A failing metric never discards
//! the results of the others.

use crate::aggregate::{aggregate_journals, AggregateParams, JournalAggregate, Metric, PaperScore};
use crate::config::AnalysisConfig;
use crate::corpus::{Corpus, LoadStats};
use crate::disruption::{score_disruption, DisruptionCounts};
use crate::error::{AnalysisError, Result};
use crate::graph::{CitationGraph, GraphSnapshot};
use crate::interdisciplinarity::score_interdisciplinarity;
use crate::novelty::{score_novelty, NoveltyBreakdown, NoveltyParams};
use crate::similarity::{CategoryIndex, CategorySimilarityMatrix};
use crate::timeline::KeywordPairTimeline;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Count of papers a component excluded or treated with a sentinel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub component: String,
    pub affected: usize,
    pub message: String,
}

impl Diagnostic {
    fn new(component: &str, affected: usize, message: impl Into<String>) -> Self {
        Self {
            component: component.to_string(),
            affected,
            message: message.into(),
        }
    }
}

/// A metric that produced no usable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentFailure {
    pub component: String,
    pub affected: usize,
    pub message: String,
}

impl From<ComponentFailure> for AnalysisError {
    fn from(f: ComponentFailure) -> Self {
        AnalysisError::Component {
            component: f.component,
            affected: f.affected,
            message: f.message,
        }
    }
}

/// Per-paper counts a score was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreDetail {
    /// `None` for target rows without an identifier
    Disruption(Option<DisruptionCounts>),
    Novelty(NoveltyBreakdown),
}

impl ScoreDetail {
    pub fn disruption(&self) -> Option<DisruptionCounts> {
        match self {
            ScoreDetail::Disruption(counts) => *counts,
            ScoreDetail::Novelty(_) => None,
        }
    }

    pub fn novelty(&self) -> Option<NoveltyBreakdown> {
        match self {
            ScoreDetail::Novelty(breakdown) => Some(*breakdown),
            ScoreDetail::Disruption(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricReport {
    pub metric: Metric,
    pub paper_scores: Vec<PaperScore>,
    /// Aligned with `paper_scores`; empty for metrics without a breakdown
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ScoreDetail>,
    pub journals: Vec<JournalAggregate>,
    pub diagnostics: Vec<Diagnostic>,
}

impl MetricReport {
    pub fn valid_scores(&self) -> usize {
        self.paper_scores.iter().filter(|s| s.is_valid()).count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub metrics: Vec<MetricReport>,
    pub failures: Vec<ComponentFailure>,
    /// Loader-level diagnostics for both corpora
    pub diagnostics: Vec<Diagnostic>,
    /// Present when disruption was requested
    pub graph: Option<GraphSnapshot>,
    /// Present when TD was requested
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<CategorySimilarityMatrix>,
    pub background_papers: usize,
    pub target_papers: usize,
    pub elapsed_ms: u64,
}

impl AnalysisReport {
    pub fn metric(&self, metric: Metric) -> Option<&MetricReport> {
        self.metrics.iter().find(|m| m.metric == metric)
    }

    pub fn failure(&self, metric: Metric) -> Option<&ComponentFailure> {
        self.failures.iter().find(|f| f.component == metric.name())
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Run every requested metric over `target`, using `background` for the
/// derived structures.
///
/// Only an invalid configuration is returned as an error.
pub fn run_analysis(
    background: &Corpus,
    target: &Corpus,
    config: &AnalysisConfig,
    metrics: &[Metric],
) -> Result<AnalysisReport> {
    config.validate()?;
    let started = Instant::now();

    let mut metrics_sorted: Vec<Metric> = metrics.to_vec();
    metrics_sorted.sort();
    metrics_sorted.dedup();

    info!(
        background = background.len(),
        target = target.len(),
        metrics = ?metrics_sorted,
        "Starting analysis"
    );

    let mut diagnostics = loader_diagnostics("background", &background.stats);
    diagnostics.extend(loader_diagnostics("target", &target.stats));

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    let mut graph_snapshot = None;
    let mut similarity = None;

    for metric in metrics_sorted {
        let outcome = match metric {
            Metric::Disruption => {
                let graph = CitationGraph::build(background);
                let batch = score_disruption(&graph, target);
                graph_snapshot = Some(graph.snapshot(&batch.scores));
                let mut notes = Vec::new();
                if batch.unresolved > 0 {
                    notes.push(Diagnostic::new(
                        metric.name(),
                        batch.unresolved,
                        "target papers without an identifier scored NaN",
                    ));
                }
                if batch.uncited > 0 {
                    notes.push(Diagnostic::new(
                        metric.name(),
                        batch.uncited,
                        "target papers with no citers in the background corpus scored 0",
                    ));
                }
                let details = batch.counts.into_iter().map(ScoreDetail::Disruption).collect();
                finish(metric, batch.scores, details, notes, &config.disruption.aggregate)
            }
            Metric::Novelty => {
                let timeline = KeywordPairTimeline::build(background);
                let params = NoveltyParams::resolve(&config.novelty, target);
                let batch = score_novelty(&timeline, target, &params);
                let stats = timeline.stats();
                let mut notes = Vec::new();
                if stats.excluded_no_year > 0 {
                    notes.push(Diagnostic::new(
                        "timeline",
                        stats.excluded_no_year,
                        "background papers without a year excluded from the keyword timeline",
                    ));
                }
                if batch.insufficient_keywords > 0 {
                    notes.push(Diagnostic::new(
                        metric.name(),
                        batch.insufficient_keywords,
                        "target papers with fewer than two keywords left unscored",
                    ));
                }
                let details = batch.breakdowns.into_iter().map(ScoreDetail::Novelty).collect();
                finish(metric, batch.scores, details, notes, &config.novelty.aggregate)
            }
            Metric::Interdisciplinarity => {
                let index = CategoryIndex::build(background);
                let matrix = CategorySimilarityMatrix::build(background, &index);
                let batch = score_interdisciplinarity(&matrix, &index, target);
                let mut notes = Vec::new();
                if batch.unresolved_references > 0 {
                    notes.push(Diagnostic::new(
                        metric.name(),
                        batch.unresolved_references,
                        "target papers with no categorised references scored 1.0",
                    ));
                }
                similarity = Some(matrix);
                finish(metric, batch.scores, Vec::new(), notes, &config.interdisciplinarity.aggregate)
            }
        };

        match outcome {
            Ok(report) => reports.push(report),
            Err(failure) => {
                warn!(
                    component = %failure.component,
                    affected = failure.affected,
                    "{}",
                    failure.message
                );
                failures.push(failure);
            }
        }
    }

    let elapsed_ms = started.elapsed().as_millis() as u64;
    info!(
        succeeded = reports.len(),
        failed = failures.len(),
        elapsed_ms,
        "Analysis finished"
    );

    Ok(AnalysisReport {
        metrics: reports,
        failures,
        diagnostics,
        graph: graph_snapshot,
        similarity,
        background_papers: background.len(),
        target_papers: target.len(),
        elapsed_ms,
    })
}

fn finish(
    metric: Metric,
    scores: Vec<PaperScore>,
    details: Vec<ScoreDetail>,
    diagnostics: Vec<Diagnostic>,
    params: &AggregateParams,
) -> std::result::Result<MetricReport, ComponentFailure> {
    if !scores.iter().any(PaperScore::is_valid) {
        return Err(ComponentFailure {
            component: metric.name().to_string(),
            affected: scores.len(),
            message: "no valid scores".to_string(),
        });
    }
    let journals = aggregate_journals(&scores, params);
    Ok(MetricReport {
        metric,
        paper_scores: scores,
        details,
        journals,
        diagnostics,
    })
}

fn loader_diagnostics(dataset: &str, stats: &LoadStats) -> Vec<Diagnostic> {
    let component = format!("loader:{}", dataset);
    let checks = [
        (stats.skipped_missing_id, "rows without an identifier skipped"),
        (stats.missing_year, "rows without a parseable year"),
        (stats.malformed_keywords, "unparsable keyword fields treated as empty"),
        (stats.malformed_categories, "unparsable category fields treated as empty"),
        (stats.malformed_references, "unparsable reference fields treated as empty"),
        (stats.invalid_utf8, "rows with invalid UTF-8 decoded lossily"),
    ];
    checks
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, message)| Diagnostic::new(&component, count, message))
        .collect()
}
