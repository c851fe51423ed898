//! Writers for score tables, rankings, the graph snapshot, the category
//! similarity matrix and the run summary.

use crate::aggregate::{JournalAggregate, Metric, PaperScore};
use crate::error::Result;
use crate::graph::GraphSnapshot;
use crate::pipeline::{AnalysisReport, Diagnostic, MetricReport, ScoreDetail};
use crate::similarity::CategorySimilarityMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::info;

/// Per-paper CSV row. Undefined scores are written as empty cells.
#[derive(Debug, Serialize)]
struct PaperScoreRow<'a> {
    id: &'a str,
    journal: &'a str,
    metric: &'a str,
    value: Option<f64>,
}

impl<'a> From<&'a PaperScore> for PaperScoreRow<'a> {
    fn from(s: &'a PaperScore) -> Self {
        Self {
            id: &s.id,
            journal: &s.journal,
            metric: s.metric.name(),
            value: s.is_valid().then_some(s.value),
        }
    }
}

/// Per-paper disruption row with the `ni`, `nj`, `nk` counts
#[derive(Debug, Serialize)]
struct DisruptionRow<'a> {
    id: &'a str,
    journal: &'a str,
    metric: &'a str,
    value: Option<f64>,
    ni: Option<usize>,
    nj: Option<usize>,
    nk: Option<usize>,
}

impl<'a> DisruptionRow<'a> {
    fn new(score: &'a PaperScore, detail: &ScoreDetail) -> Self {
        let counts = detail.disruption();
        let base = PaperScoreRow::from(score);
        Self {
            id: base.id,
            journal: base.journal,
            metric: base.metric,
            value: base.value,
            ni: counts.map(|c| c.ni),
            nj: counts.map(|c| c.nj),
            nk: counts.map(|c| c.nk),
        }
    }
}

/// Per-paper novelty row with the keyword-pair counts
#[derive(Debug, Serialize)]
struct NoveltyRow<'a> {
    id: &'a str,
    journal: &'a str,
    metric: &'a str,
    value: Option<f64>,
    keyword_count: Option<usize>,
    novel_pairs: Option<usize>,
    total_pairs: Option<usize>,
}

impl<'a> NoveltyRow<'a> {
    fn new(score: &'a PaperScore, detail: &ScoreDetail) -> Self {
        let breakdown = detail.novelty();
        let base = PaperScoreRow::from(score);
        Self {
            id: base.id,
            journal: base.journal,
            metric: base.metric,
            value: base.value,
            keyword_count: breakdown.map(|b| b.keyword_count),
            novel_pairs: breakdown.map(|b| b.novel_pairs),
            total_pairs: breakdown.map(|b| b.total_pairs),
        }
    }
}

/// Serialize rows to a CSV file with a header line
fn save_csv<T: Serialize>(path: &Path, data: impl IntoIterator<Item = T>) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_path(path)?;
    let mut written = 0usize;
    for item in data {
        wtr.serialize(item)?;
        written += 1;
    }
    wtr.flush()?;
    info!(path = %path.display(), rows = written, "Saved CSV");
    Ok(written)
}

/// `id,journal,metric,value`
pub fn write_paper_scores(path: &Path, scores: &[PaperScore]) -> Result<usize> {
    save_csv(path, scores.iter().map(PaperScoreRow::from))
}

/// Per-paper table for one metric, with breakdown columns when the report
/// carries them:
///
/// - disruption: `id,journal,metric,value,ni,nj,nk`
/// - novelty: `id,journal,metric,value,keyword_count,novel_pairs,total_pairs`
pub fn write_metric_papers(path: &Path, report: &MetricReport) -> Result<usize> {
    if report.details.len() != report.paper_scores.len() {
        return write_paper_scores(path, &report.paper_scores);
    }
    let rows = report.paper_scores.iter().zip(&report.details);
    match report.metric {
        Metric::Disruption => save_csv(path, rows.map(|(s, d)| DisruptionRow::new(s, d))),
        Metric::Novelty => save_csv(path, rows.map(|(s, d)| NoveltyRow::new(s, d))),
        Metric::Interdisciplinarity => write_paper_scores(path, &report.paper_scores),
    }
}

/// `rank,journal,paper_count,raw_mean,top_k_mean,volume_weighted_score,percent_score,std_dev`
pub fn write_journal_rankings(path: &Path, journals: &[JournalAggregate]) -> Result<usize> {
    save_csv(path, journals)
}

pub fn write_graph_snapshot(path: &Path, snapshot: &GraphSnapshot) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, snapshot)?;
    info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "Saved citation network"
    );
    Ok(())
}

/// Labelled square matrix: a `category` column, then one column per category
pub fn write_similarity_matrix(path: &Path, matrix: &CategorySimilarityMatrix) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    let labels = matrix.categories();

    let mut header = Vec::with_capacity(labels.len() + 1);
    header.push("category");
    header.extend(labels.iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (label, row) in labels.iter().zip(matrix.matrix().rows()) {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(label.clone());
        record.extend(row.iter().map(|v| v.to_string()));
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), categories = labels.len(), "Saved similarity matrix");
    Ok(())
}

#[derive(Debug, Serialize)]
struct CategoryRow<'a> {
    category: &'a str,
}

/// One `category` per line, in matrix order
pub fn write_categories(path: &Path, matrix: &CategorySimilarityMatrix) -> Result<usize> {
    save_csv(path, matrix.categories().iter().map(|c| CategoryRow { category: c }))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricState {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricStatus {
    pub metric: Metric,
    pub status: MetricState,
    pub papers: usize,
    pub valid_scores: usize,
    pub journals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Machine-readable record of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub timestamp: String,
    pub background: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub background_papers: usize,
    pub target_papers: usize,
    pub elapsed_ms: u64,
    pub metrics: Vec<MetricStatus>,
    pub diagnostics: Vec<Diagnostic>,
    pub outputs: Vec<String>,
}

impl RunSummary {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let mut metrics: Vec<MetricStatus> = report
            .metrics
            .iter()
            .map(|m| MetricStatus {
                metric: m.metric,
                status: MetricState::Ok,
                papers: m.paper_scores.len(),
                valid_scores: m.valid_scores(),
                journals: m.journals.len(),
                message: None,
            })
            .collect();

        for failure in &report.failures {
            if let Ok(metric) = failure.component.parse::<Metric>() {
                metrics.push(MetricStatus {
                    metric,
                    status: MetricState::Failed,
                    papers: failure.affected,
                    valid_scores: 0,
                    journals: 0,
                    message: Some(failure.message.clone()),
                });
            }
        }
        metrics.sort_by_key(|m| m.metric);

        let mut diagnostics = report.diagnostics.clone();
        for m in &report.metrics {
            diagnostics.extend(m.diagnostics.iter().cloned());
        }

        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            background: None,
            target: None,
            background_papers: report.background_papers,
            target_papers: report.target_papers,
            elapsed_ms: report.elapsed_ms,
            metrics,
            diagnostics,
            outputs: Vec::new(),
        }
    }

    pub fn with_inputs(mut self, background: &Path, target: &Path) -> Self {
        self.background = Some(background.to_path_buf());
        self.target = Some(target.to_path_buf());
        self
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, summary)?;
    info!(path = %path.display(), "Saved analysis summary");
    Ok(())
}

/// Write every table for `report` into `dir` and return the summary.
///
/// Failed metrics produce no tables; they appear only in the summary.
pub fn write_report(dir: &Path, report: &AnalysisReport, summary: RunSummary) -> Result<RunSummary> {
    std::fs::create_dir_all(dir)?;
    let mut summary = summary;

    for m in &report.metrics {
        let papers = format!("{}_papers.csv", m.metric.name());
        write_metric_papers(&dir.join(&papers), m)?;
        summary.outputs.push(papers);

        let journals = format!("{}_journals.csv", m.metric.name());
        write_journal_rankings(&dir.join(&journals), &m.journals)?;
        summary.outputs.push(journals);
    }

    if let Some(graph) = &report.graph {
        write_graph_snapshot(&dir.join("citation_network.json"), graph)?;
        summary.outputs.push("citation_network.json".to_string());
    }

    if let Some(matrix) = &report.similarity {
        write_similarity_matrix(&dir.join("similarity_matrix.csv"), matrix)?;
        summary.outputs.push("similarity_matrix.csv".to_string());
        write_categories(&dir.join("categories_list.csv"), matrix)?;
        summary.outputs.push("categories_list.csv".to_string());
    }

    summary.outputs.push("analysis_summary.json".to_string());
    write_summary(&dir.join("analysis_summary.json"), &summary)?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate_journals, AggregateParams};
    use crate::corpus::Paper;
    use crate::disruption::DisruptionCounts;
    use crate::pipeline::ComponentFailure;
    use crate::similarity::CategoryIndex;
    use tempfile::tempdir;

    fn scores() -> Vec<PaperScore> {
        vec![
            PaperScore::new("10.1/a", "Journal A", Metric::Disruption, 0.5),
            PaperScore::new("", "Journal B", Metric::Disruption, f64::NAN),
        ]
    }

    fn similarity() -> CategorySimilarityMatrix {
        let papers = vec![
            Paper::new("r1", "J").with_categories(&["Physics"]),
            Paper::new("r2", "J").with_categories(&["Chemistry"]),
            Paper::new("a", "J").with_references(&["r1", "r2"]),
        ];
        CategorySimilarityMatrix::build(&papers, &CategoryIndex::build(&papers))
    }

    fn report() -> AnalysisReport {
        let scores = scores();
        let journals = aggregate_journals(&scores, &AggregateParams::default());
        AnalysisReport {
            metrics: vec![MetricReport {
                metric: Metric::Disruption,
                paper_scores: scores,
                details: vec![
                    ScoreDetail::Disruption(Some(DisruptionCounts { ni: 2, nj: 1, nk: 3 })),
                    ScoreDetail::Disruption(None),
                ],
                journals,
                diagnostics: vec![],
            }],
            failures: vec![ComponentFailure {
                component: "novelty".to_string(),
                affected: 2,
                message: "no valid scores".to_string(),
            }],
            diagnostics: vec![],
            graph: Some(GraphSnapshot::default()),
            similarity: Some(similarity()),
            background_papers: 5,
            target_papers: 2,
            elapsed_ms: 1,
        }
    }

    #[test]
    fn test_paper_scores_csv() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("papers.csv");
        assert_eq!(write_paper_scores(&path, &scores())?, 2);

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,journal,metric,value");
        assert_eq!(lines[1], "10.1/a,Journal A,disruption,0.5");
        assert_eq!(lines[2], ",Journal B,disruption,");
        Ok(())
    }

    #[test]
    fn test_novelty_papers_columns() -> Result<()> {
        use crate::novelty::NoveltyBreakdown;

        let dir = tempdir()?;
        let path = dir.path().join("novelty.csv");
        let report = MetricReport {
            metric: Metric::Novelty,
            paper_scores: vec![
                PaperScore::new("10.1/a", "Journal A", Metric::Novelty, 0.5),
                PaperScore::new("10.1/b", "Journal A", Metric::Novelty, f64::NAN),
            ],
            details: vec![
                ScoreDetail::Novelty(NoveltyBreakdown { keyword_count: 4, novel_pairs: 3, total_pairs: 6 }),
                ScoreDetail::Novelty(NoveltyBreakdown { keyword_count: 1, novel_pairs: 0, total_pairs: 0 }),
            ],
            journals: vec![],
            diagnostics: vec![],
        };
        assert_eq!(write_metric_papers(&path, &report)?, 2);

        let content = std::fs::read_to_string(&path)?;
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "id,journal,metric,value,keyword_count,novel_pairs,total_pairs");
        assert_eq!(lines[1], "10.1/a,Journal A,novelty,0.5,4,3,6");
        assert_eq!(lines[2], "10.1/b,Journal A,novelty,,1,0,0");
        Ok(())
    }

    #[test]
    fn test_journal_rankings_header() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("journals.csv");
        let journals = aggregate_journals(&scores(), &AggregateParams::default());
        write_journal_rankings(&path, &journals)?;

        let content = std::fs::read_to_string(&path)?;
        assert!(content.starts_with(
            "rank,journal,paper_count,raw_mean,top_k_mean,volume_weighted_score,percent_score,std_dev\n1,Journal A,1,0.5,"
        ));
        Ok(())
    }

    #[test]
    fn test_write_report_layout() -> Result<()> {
        let dir = tempdir()?;
        let out = dir.path().join("run");
        let summary = write_report(&out, &report(), RunSummary::from_report(&report()))?;

        for name in [
            "disruption_papers.csv",
            "disruption_journals.csv",
            "citation_network.json",
            "similarity_matrix.csv",
            "categories_list.csv",
            "analysis_summary.json",
        ] {
            assert!(out.join(name).exists(), "missing {}", name);
        }
        assert!(!out.join("novelty_papers.csv").exists());

        let papers = std::fs::read_to_string(out.join("disruption_papers.csv"))?;
        let lines: Vec<&str> = papers.lines().collect();
        assert_eq!(lines[0], "id,journal,metric,value,ni,nj,nk");
        assert_eq!(lines[1], "10.1/a,Journal A,disruption,0.5,2,1,3");
        assert_eq!(lines[2], ",Journal B,disruption,,,,");

        let matrix = std::fs::read_to_string(out.join("similarity_matrix.csv"))?;
        let lines: Vec<&str> = matrix.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "category,Chemistry,Physics");
        assert!(lines[1].starts_with("Chemistry,1,"));
        assert!(lines[2].starts_with("Physics,") && lines[2].ends_with(",1"));

        let categories = std::fs::read_to_string(out.join("categories_list.csv"))?;
        assert_eq!(categories, "category\nChemistry\nPhysics\n");

        let saved: RunSummary = serde_json::from_str(&std::fs::read_to_string(out.join("analysis_summary.json"))?)?;
        assert_eq!(saved, summary);
        assert!(saved.outputs.contains(&"similarity_matrix.csv".to_string()));
        assert_eq!(saved.metrics.len(), 2);
        assert_eq!(saved.metrics[1].status, MetricState::Failed);
        assert_eq!(saved.metrics[0].valid_scores, 1);
        Ok(())
    }
}
