//! Disruption index (D-index) scoring.
//!
//! For a focal paper `p` with references `R` and citers `C`:
//!
//! - `nj`: citers of `p` that also cite something in `R`
//! - `ni`: citers of `p` that cite nothing in `R`
//! - `nk`: papers citing something in `R` that are not in `C`
//!
//! `D(p) = (ni - nj) / (ni + nj + nk)`, or `0.0` when the denominator is zero.

use crate::aggregate::{Metric, PaperScore};
use crate::corpus::Corpus;
use crate::graph::CitationGraph;
use crate::progress::ProgressTracker;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Citation-neighbourhood counts behind one D-index
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisruptionCounts {
    pub ni: usize,
    pub nj: usize,
    pub nk: usize,
}

impl DisruptionCounts {
    /// The D-index, always within `[-1, 1]`
    pub fn index(&self) -> f64 {
        let denom = self.ni + self.nj + self.nk;
        if denom == 0 {
            return 0.0;
        }
        (self.ni as f64 - self.nj as f64) / denom as f64
    }
}

/// Count `ni`, `nj`, `nk` for `id` using only the graph.
///
/// A paper unknown to the graph yields all-zero counts.
pub fn disruption_counts(graph: &CitationGraph, id: &str) -> DisruptionCounts {
    let refs = graph.references(id);
    let citers = graph.cited_by(id);

    let mut counts = DisruptionCounts::default();
    for citer in citers {
        if graph.references(citer).iter().any(|r| refs.contains(r)) {
            counts.nj += 1;
        } else {
            counts.ni += 1;
        }
    }

    let citing_prior: BTreeSet<&String> = refs.iter().flat_map(|r| graph.cited_by(r)).collect();
    counts.nk = citing_prior.iter().filter(|p| !citers.contains(p.as_str())).count();

    counts
}

pub fn disruption_index(graph: &CitationGraph, id: &str) -> f64 {
    disruption_counts(graph, id).index()
}

/// Output of scoring a target corpus
#[derive(Debug, Clone, Default)]
pub struct DisruptionBatch {
    /// One score per target row, in input order
    pub scores: Vec<PaperScore>,
    /// Counts behind each score, aligned with `scores`; `None` for rows without an identifier
    pub counts: Vec<Option<DisruptionCounts>>,
    /// Rows without an identifier (scored NaN)
    pub unresolved: usize,
    /// Papers with no citers in the background graph (scored 0.0)
    pub uncited: usize,
}

/// Score every paper in `target` against the background graph.
pub fn score_disruption(graph: &CitationGraph, target: &Corpus) -> DisruptionBatch {
    info!(papers = target.len(), "Computing disruption indices");
    let progress = ProgressTracker::new("disruption", target.len());

    let scored: Vec<(PaperScore, Option<DisruptionCounts>)> = target
        .papers()
        .par_iter()
        .map(|paper| {
            let result = if paper.has_id() {
                let counts = disruption_counts(graph, &paper.id);
                (
                    PaperScore::new(&paper.id, &paper.journal, Metric::Disruption, counts.index()),
                    Some(counts),
                )
            } else {
                (PaperScore::new("", &paper.journal, Metric::Disruption, f64::NAN), None)
            };
            progress.tick();
            result
        })
        .collect();

    let unresolved = scored.iter().filter(|(_, counts)| counts.is_none()).count();
    let uncited = scored
        .iter()
        .filter_map(|(_, counts)| counts.as_ref())
        .filter(|c| c.ni + c.nj == 0)
        .count();
    let (scores, counts): (Vec<PaperScore>, Vec<Option<DisruptionCounts>>) = scored.into_iter().unzip();

    info!(
        scored = scores.len() - unresolved,
        unresolved,
        uncited,
        "Disruption scoring complete"
    );

    DisruptionBatch {
        scores,
        counts,
        unresolved,
        uncited,
    }
}
