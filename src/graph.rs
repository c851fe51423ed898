//! Citation graph over the background corpus.
//!
//! Two mappings are kept in lock-step: `references(p)` (what `p` cites) and
//! `cited_by(r)` (who cites `r`). For every recorded pair,
//! `p ∈ cited_by(r) ⟺ r ∈ references(p)`. Reference targets outside the
//! corpus are kept as `cited_by` keys even though they never resolve to a paper.

use crate::aggregate::{Metric, PaperScore};
use crate::corpus::Paper;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::info;

static EMPTY: BTreeSet<String> = BTreeSet::new();

/// Immutable bidirectional reference graph
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CitationGraph {
    references: BTreeMap<String, BTreeSet<String>>,
    cited_by: BTreeMap<String, BTreeSet<String>>,
}

impl CitationGraph {
    /// Build the graph in one pass over the papers.
    ///
    /// Papers without an identifier are skipped. A paper id that appears more
    /// than once has its reference lists merged.
    pub fn build<'a, I>(papers: I) -> Self
    where
        I: IntoIterator<Item = &'a Paper>,
    {
        let mut references: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut cited_by: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut skipped = 0usize;

        for paper in papers {
            if !paper.has_id() {
                skipped += 1;
                continue;
            }
            let refs = references.entry(paper.id.clone()).or_default();
            for r in &paper.references {
                refs.insert(r.clone());
                cited_by.entry(r.clone()).or_default().insert(paper.id.clone());
            }
        }

        let graph = Self { references, cited_by };
        info!(
            papers = graph.paper_count(),
            cited = graph.cited_by.len(),
            edges = graph.edge_count(),
            skipped,
            "Citation graph built"
        );
        graph
    }

    /// What `id` cites (empty if unknown)
    pub fn references(&self, id: &str) -> &BTreeSet<String> {
        self.references.get(id).unwrap_or(&EMPTY)
    }

    /// Who cites `id` (empty if unknown)
    pub fn cited_by(&self, id: &str) -> &BTreeSet<String> {
        self.cited_by.get(id).unwrap_or(&EMPTY)
    }

    /// Whether `id` appears on either side of any edge, or as a corpus paper
    pub fn contains(&self, id: &str) -> bool {
        self.references.contains_key(id) || self.cited_by.contains_key(id)
    }

    /// Papers with a recorded reference set
    pub fn paper_count(&self) -> usize {
        self.references.len()
    }

    pub fn edge_count(&self) -> usize {
        self.references.values().map(BTreeSet::len).sum()
    }

    /// Node/edge view for downstream visualization.
    ///
    /// Edges run from the cited paper (`source`) to the citing paper (`target`).
    pub fn snapshot(&self, scores: &[PaperScore]) -> GraphSnapshot {
        let disruption: HashMap<&str, f64> = scores
            .iter()
            .filter(|s| s.metric == Metric::Disruption && s.is_valid())
            .map(|s| (s.id.as_str(), s.value))
            .collect();

        let nodes = self
            .references
            .iter()
            .map(|(id, refs)| GraphNode {
                id: id.clone(),
                reference_count: refs.len(),
                disruption_index: disruption.get(id.as_str()).copied(),
            })
            .collect();

        let edges = self
            .cited_by
            .iter()
            .flat_map(|(cited, citers)| {
                citers.iter().map(move |citer| GraphEdge {
                    source: cited.clone(),
                    target: citer.clone(),
                })
            })
            .collect();

        GraphSnapshot { nodes, edges }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub reference_count: usize,
    pub disruption_index: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}
