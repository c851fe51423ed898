use rustjournalrank::config::AnalysisConfig;
use rustjournalrank::corpus::{required_fields, Corpus, Dataset};
use rustjournalrank::export::{write_report, MetricState, RunSummary};
use rustjournalrank::graph::GraphSnapshot;
use rustjournalrank::pipeline::run_analysis;
use rustjournalrank::{AnalysisError, Metric, Result};
use std::path::Path;
use tempfile::tempdir;

const BACKGROUND: &str = "DOI,Source Title,Publication Year,Author Keywords,WoS Categories,citing
10.1/w,Journal W,2010,optics; lasers,Physics,[]
10.1/v,Journal V,2012,catalysis,Chemistry,[]
10.1/x,Journal A,2018,NLP; Transformer,Computer Science,\"['10.1/w', '10.1/v']\"
10.1/y,Journal B,2019,nlp; parsing,Physics,\"['10.1/x', '10.1/w']\"
10.1/z,Journal B,2019,vision,Chemistry,\"['10.1/x']\"
10.1/q,Journal A,2020,,Physics,\"['10.1/w', '10.1/v'\"
,Journal C,2020,a;b,Physics,[]
";

const TARGET: &str = "DOI,Source Title,Publication Year,Author Keywords,WoS Categories,citing
https://doi.org/10.1/X,Journal A,2019,nlp; transformer,Computer Science,\"['10.1/w', '10.1/v']\"
10.1/y,Journal B,2019,nlp; parsing,Physics,\"['10.1/x', '10.1/w']\"
10.1/z,Journal B,2019,vision,Chemistry,\"['10.1/x']\"
,,2019,graph; learning,,[]
";

fn write(dir: &Path, name: &str, content: &str) -> Result<std::path::PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, content)?;
    Ok(path)
}

fn load(path: &Path, dataset: Dataset, metrics: &[Metric]) -> Result<Corpus> {
    let config = AnalysisConfig::default();
    let mapping = match dataset {
        Dataset::Background => &config.columns,
        Dataset::Target => config.target_columns(),
    };
    Corpus::from_csv_path(path, mapping, &required_fields(metrics, dataset), dataset)
}

#[test]
fn test_csv_pipeline_writes_all_outputs() -> Result<()> {
    let dir = tempdir()?;
    let bg_path = write(dir.path(), "all.csv", BACKGROUND)?;
    let tg_path = write(dir.path(), "target.csv", TARGET)?;

    let background = load(&bg_path, Dataset::Background, &Metric::ALL)?;
    let target = load(&tg_path, Dataset::Target, &Metric::ALL)?;
    assert_eq!(background.len(), 6);
    assert_eq!(background.stats.skipped_missing_id, 1);
    assert_eq!(background.stats.malformed_references, 1);
    assert_eq!(target.len(), 4);

    let report = run_analysis(&background, &target, &AnalysisConfig::default(), &Metric::ALL)?;
    assert!(report.is_complete());

    let out = dir.path().join("run");
    let summary = RunSummary::from_report(&report).with_inputs(&bg_path, &tg_path);
    let summary = write_report(&out, &report, summary)?;
    assert!(summary.metrics.iter().all(|m| m.status == MetricState::Ok));

    for metric in Metric::ALL {
        assert!(out.join(format!("{}_papers.csv", metric.name())).exists());
        assert!(out.join(format!("{}_journals.csv", metric.name())).exists());
    }

    // X: C = {y, z}; y also cites w → nj = 1, z → ni = 1; w/v cited by x itself only → nk = 1.
    let disruption = std::fs::read_to_string(out.join("disruption_papers.csv"))?;
    assert!(disruption.starts_with("id,journal,metric,value,ni,nj,nk\n"));
    assert!(disruption.contains("10.1/x,Journal A,disruption,0.0,1,1,1\n"));
    // The row without an identifier stays, with empty value and counts.
    assert!(disruption.contains(",Unknown,disruption,,,,\n"));

    let novelty = std::fs::read_to_string(out.join("novelty_papers.csv"))?;
    assert!(novelty.starts_with("id,journal,metric,value,keyword_count,novel_pairs,total_pairs\n"));

    let categories = std::fs::read_to_string(out.join("categories_list.csv"))?;
    assert_eq!(categories, "category\nChemistry\nComputer Science\nPhysics\n");
    assert!(out.join("similarity_matrix.csv").exists());

    let snapshot: GraphSnapshot =
        serde_json::from_str(&std::fs::read_to_string(out.join("citation_network.json"))?)?;
    assert_eq!(snapshot.nodes.len(), 6);
    let x = snapshot.nodes.iter().find(|n| n.id == "10.1/x");
    assert_eq!(x.and_then(|n| n.disruption_index), Some(0.0));
    assert!(snapshot.edges.iter().any(|e| e.source == "10.1/x" && e.target == "10.1/z"));
    Ok(())
}

#[test]
fn test_missing_column_aborts_load() -> Result<()> {
    let dir = tempdir()?;
    let csv = "DOI,Source Title,Publication Year\n10.1/a,J,2020\n";
    let path = write(dir.path(), "bad.csv", csv)?;

    match load(&path, Dataset::Background, &[Metric::Disruption]) {
        Err(AnalysisError::MissingColumn { field, dataset, .. }) => {
            assert_eq!(field, "references");
            assert_eq!(dataset, "background");
        }
        other => panic!("expected MissingColumn, got {:?}", other.map(|c| c.len())),
    }

    // Novelty needs keywords, which are absent too.
    let corpus = load(&path, Dataset::Background, &[Metric::Novelty]);
    assert!(matches!(corpus, Err(AnalysisError::MissingColumn { .. })));
    Ok(())
}
