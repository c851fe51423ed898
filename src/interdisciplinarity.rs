//! Rao-Stirling diversity of a paper's reference categories and the TD index.
//!
//! ```text
//! Δ  = Σi Σj (1 - S[i][j]) · p_i · p_j
//! TD = 1 / Δ   (1.0 when Δ = 0)
//! ```

use crate::aggregate::{Metric, PaperScore};
use crate::corpus::Corpus;
use crate::progress::ProgressTracker;
use crate::similarity::{CategoryIndex, CategorySimilarityMatrix};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

/// Rao-Stirling diversity over a multiset of category labels.
///
/// Empty or single-category input gives 0.0.
pub fn rao_stirling_diversity<S: AsRef<str>>(categories: &[S], matrix: &CategorySimilarityMatrix) -> f64 {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for category in categories {
        *counts.entry(category.as_ref()).or_default() += 1;
    }
    if counts.len() < 2 {
        return 0.0;
    }

    let total = categories.len() as f64;
    let probs: Vec<(&str, f64)> = counts
        .into_iter()
        .map(|(c, n)| (c, n as f64 / total))
        .collect();

    let mut diversity = 0.0;
    for &(ci, pi) in &probs {
        for &(cj, pj) in &probs {
            diversity += (1.0 - matrix.similarity(ci, cj)) * pi * pj;
        }
    }
    diversity
}

/// Reciprocal of the diversity, with 1.0 for homogeneous or empty input
pub fn td_index<S: AsRef<str>>(categories: &[S], matrix: &CategorySimilarityMatrix) -> f64 {
    let diversity = rao_stirling_diversity(categories, matrix);
    if diversity > 0.0 {
        1.0 / diversity
    } else {
        1.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct TdBatch {
    pub scores: Vec<PaperScore>,
    /// Papers none of whose references resolved to a category (scored 1.0)
    pub unresolved_references: usize,
}

pub fn score_interdisciplinarity(
    matrix: &CategorySimilarityMatrix,
    categories: &CategoryIndex,
    target: &Corpus,
) -> TdBatch {
    info!(
        papers = target.len(),
        categories = matrix.len(),
        "Computing TD indices"
    );
    let progress = ProgressTracker::new("td", target.len());

    let scored: Vec<(PaperScore, bool)> = target
        .papers()
        .par_iter()
        .map(|paper| {
            let ref_categories = categories.reference_categories(paper);
            let value = td_index(&ref_categories, matrix);
            progress.tick();
            (
                PaperScore::new(&paper.id, &paper.journal, Metric::Interdisciplinarity, value),
                ref_categories.is_empty(),
            )
        })
        .collect();

    let unresolved_references = scored.iter().filter(|(_, unresolved)| *unresolved).count();
    let scores: Vec<PaperScore> = scored.into_iter().map(|(s, _)| s).collect();

    info!(
        scored = scores.len(),
        unresolved_references,
        "TD scoring complete"
    );

    TdBatch {
        scores,
        unresolved_references,
    }
}
