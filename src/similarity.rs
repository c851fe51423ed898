//! Subject-category co-occurrence and Salton cosine similarity.
//!
//! Each background paper's references are resolved to categories through the
//! background id → categories map. A paper whose references span at least two
//! distinct categories adds one to `M[i][i]` for each category and one to
//! `M[i][j]`/`M[j][i]` for each pair. Similarity is the cosine of the rows of
//! `M`, with the diagonal fixed at 1.0.
//!
//! The matrix is indexed by the sorted set of categories reached through some
//! background paper's references. Categories that are never cited get no row.

use crate::corpus::Paper;
use ndarray::Array2;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tracing::info;

/// Background paper id → its subject categories
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_paper: HashMap<String, Vec<String>>,
}

impl CategoryIndex {
    pub fn build<'a, I>(papers: I) -> Self
    where
        I: IntoIterator<Item = &'a Paper>,
    {
        let mut by_paper: HashMap<String, Vec<String>> = HashMap::new();
        for paper in papers {
            if !paper.has_id() || paper.categories.is_empty() {
                continue;
            }
            let entry = by_paper.entry(paper.id.clone()).or_default();
            for category in &paper.categories {
                if !entry.contains(category) {
                    entry.push(category.clone());
                }
            }
        }
        Self { by_paper }
    }

    pub fn categories_of(&self, id: &str) -> &[String] {
        self.by_paper.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Categories of every resolvable reference, with multiplicity
    pub fn reference_categories(&self, paper: &Paper) -> Vec<String> {
        paper
            .references
            .iter()
            .flat_map(|r| self.categories_of(r).iter().cloned())
            .collect()
    }

    /// Sorted set of every category known to the index
    pub fn all_categories(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self.by_paper.values().flatten().collect();
        set.into_iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.by_paper.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_paper.is_empty()
    }
}

/// Symmetric category similarity matrix with a unit diagonal
#[derive(Debug, Clone, Serialize)]
pub struct CategorySimilarityMatrix {
    categories: Vec<String>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    cooccurrence: Array2<f64>,
    similarity: Array2<f64>,
}

impl CategorySimilarityMatrix {
    pub fn build<'a, I>(papers: I, categories: &CategoryIndex) -> Self
    where
        I: IntoIterator<Item = &'a Paper>,
    {
        let cited: Vec<BTreeSet<String>> = papers
            .into_iter()
            .map(|paper| categories.reference_categories(paper).into_iter().collect())
            .collect();
        let labels: Vec<String> = cited
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = index_of(&labels);
        let n = labels.len();
        let mut cooccurrence = Array2::<f64>::zeros((n, n));
        let mut contributing = 0usize;

        for present in &cited {
            if present.len() < 2 {
                continue;
            }
            contributing += 1;

            let present: Vec<usize> = present.iter().filter_map(|c| index.get(c).copied()).collect();
            for (pos, &i) in present.iter().enumerate() {
                cooccurrence[[i, i]] += 1.0;
                for &j in &present[pos + 1..] {
                    cooccurrence[[i, j]] += 1.0;
                    cooccurrence[[j, i]] += 1.0;
                }
            }
        }

        let similarity = salton_cosine(&cooccurrence);
        info!(
            categories = n,
            contributing_papers = contributing,
            "Category similarity matrix built"
        );

        Self {
            categories: labels,
            index,
            cooccurrence,
            similarity,
        }
    }

    /// Matrix with explicitly given off-diagonal similarities.
    ///
    /// Pairs not listed get 0.0.
    pub fn from_pairs(pairs: &[(&str, &str, f64)]) -> Self {
        let labels: Vec<String> = pairs
            .iter()
            .flat_map(|(a, b, _)| [a.to_string(), b.to_string()])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index = index_of(&labels);
        let n = labels.len();
        let mut similarity = Array2::<f64>::eye(n);
        for (a, b, s) in pairs {
            if let (Some(&i), Some(&j)) = (index.get(*a), index.get(*b)) {
                if i != j {
                    similarity[[i, j]] = *s;
                    similarity[[j, i]] = *s;
                }
            }
        }
        Self {
            categories: labels,
            index,
            cooccurrence: Array2::zeros((n, n)),
            similarity,
        }
    }

    /// `S[a][b]`. A category outside the matrix is identical only to itself.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        match (self.index.get(a), self.index.get(b)) {
            (Some(&i), Some(&j)) => self.similarity[[i, j]],
            _ if a == b => 1.0,
            _ => 0.0,
        }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn cooccurrence(&self) -> &Array2<f64> {
        &self.cooccurrence
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.similarity
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

fn index_of(labels: &[String]) -> HashMap<String, usize> {
    labels.iter().enumerate().map(|(i, c)| (c.clone(), i)).collect()
}

/// Row-wise cosine similarity of `m`, computed once over the upper triangle
/// and mirrored so the result is exactly symmetric.
fn salton_cosine(m: &Array2<f64>) -> Array2<f64> {
    let n = m.nrows();
    let gram = m.dot(&m.t());
    let norms: Vec<f64> = gram.diag().iter().map(|v| v.sqrt()).collect();
    let mut sim = Array2::<f64>::eye(n);

    for i in 0..n {
        for j in (i + 1)..n {
            let denom = norms[i] * norms[j];
            let value = if denom > 0.0 {
                (gram[[i, j]] / denom).min(1.0)
            } else {
                0.0
            };
            sim[[i, j]] = value;
            sim[[j, i]] = value;
        }
    }

    sim
}
