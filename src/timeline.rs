//! Keyword-pair timeline: the first year each unordered keyword pair was seen
//! together in a single background paper.

use crate::corpus::Paper;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Unordered keyword pair, stored with its members sorted
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeywordPair(String, String);

impl KeywordPair {
    /// `None` when both keywords are identical
    pub fn new(a: &str, b: &str) -> Option<Self> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Some(Self(a.to_string(), b.to_string())),
            std::cmp::Ordering::Greater => Some(Self(b.to_string(), a.to_string())),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn first(&self) -> &str {
        &self.0
    }

    pub fn second(&self) -> &str {
        &self.1
    }
}

/// Every 2-combination of `keywords`, each sorted
pub fn keyword_pairs(keywords: &[String]) -> Vec<KeywordPair> {
    let mut pairs = Vec::with_capacity(keywords.len() * keywords.len().saturating_sub(1) / 2);
    for (i, a) in keywords.iter().enumerate() {
        for b in &keywords[i + 1..] {
            if let Some(pair) = KeywordPair::new(a, b) {
                pairs.push(pair);
            }
        }
    }
    pairs
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineStats {
    pub papers_used: usize,
    /// Papers with keywords but no parseable year
    pub excluded_no_year: usize,
    /// Papers with fewer than two keywords
    pub excluded_few_keywords: usize,
}

/// Immutable map from keyword pair to first-observed year
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordPairTimeline {
    first_seen: BTreeMap<KeywordPair, i32>,
    stats: TimelineStats,
}

impl KeywordPairTimeline {
    pub fn build<'a, I>(papers: I) -> Self
    where
        I: IntoIterator<Item = &'a Paper>,
    {
        let mut first_seen: BTreeMap<KeywordPair, i32> = BTreeMap::new();
        let mut stats = TimelineStats::default();

        for paper in papers {
            if paper.keywords.len() < 2 {
                stats.excluded_few_keywords += 1;
                continue;
            }
            let Some(year) = paper.year else {
                stats.excluded_no_year += 1;
                debug!(id = %paper.id, "Paper has no year, excluded from keyword timeline");
                continue;
            };
            stats.papers_used += 1;
            for pair in keyword_pairs(&paper.keywords) {
                first_seen
                    .entry(pair)
                    .and_modify(|y| *y = (*y).min(year))
                    .or_insert(year);
            }
        }

        info!(
            pairs = first_seen.len(),
            papers_used = stats.papers_used,
            excluded_no_year = stats.excluded_no_year,
            excluded_few_keywords = stats.excluded_few_keywords,
            "Keyword pair timeline built"
        );

        Self { first_seen, stats }
    }

    /// First year the pair was observed; `None` means never observed
    pub fn first_year(&self, pair: &KeywordPair) -> Option<i32> {
        self.first_seen.get(pair).copied()
    }

    pub fn len(&self) -> usize {
        self.first_seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.first_seen.is_empty()
    }

    pub fn stats(&self) -> &TimelineStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(a: &str, b: &str) -> Option<KeywordPair> {
        KeywordPair::new(a, b)
    }

    #[test]
    fn test_pair_is_unordered() {
        assert_eq!(pair("transformer", "nlp"), pair("nlp", "transformer"));
        assert_eq!(pair("nlp", "nlp"), None);
        let p = pair("b", "a");
        assert_eq!(p.as_ref().map(KeywordPair::first), Some("a"));
        assert_eq!(p.as_ref().map(KeywordPair::second), Some("b"));
    }

    #[test]
    fn test_keyword_pairs_count() {
        let kws: Vec<String> = ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert_eq!(keyword_pairs(&kws).len(), 6);
        assert!(keyword_pairs(&kws[..1]).is_empty());
    }

    #[test]
    fn test_minimum_year_kept() {
        let papers = vec![
            Paper::new("a", "J").with_year(2020).with_keywords(&["NLP", "Transformer"]),
            Paper::new("b", "J").with_year(2018).with_keywords(&["transformer", "nlp", "bert"]),
            Paper::new("c", "J").with_year(2021).with_keywords(&["nlp", "transformer"]),
        ];
        let timeline = KeywordPairTimeline::build(&papers);

        assert_eq!(timeline.len(), 3);
        assert_eq!(pair("nlp", "transformer").and_then(|p| timeline.first_year(&p)), Some(2018));
        assert_eq!(pair("bert", "nlp").and_then(|p| timeline.first_year(&p)), Some(2018));
        assert_eq!(pair("nlp", "vision").and_then(|p| timeline.first_year(&p)), None);
    }

    #[test]
    fn test_exclusions() {
        let papers = vec![
            Paper::new("a", "J").with_keywords(&["x", "y"]),
            Paper::new("b", "J").with_year(2020).with_keywords(&["x"]),
            Paper::new("c", "J").with_year(2020),
        ];
        let timeline = KeywordPairTimeline::build(&papers);

        assert!(timeline.is_empty());
        assert_eq!(timeline.stats().excluded_no_year, 1);
        assert_eq!(timeline.stats().excluded_few_keywords, 2);
        assert_eq!(timeline.stats().papers_used, 0);
    }

    #[test]
    fn test_rebuild_is_identical() {
        let papers = vec![
            Paper::new("a", "J").with_year(2019).with_keywords(&["c", "a", "b"]),
            Paper::new("b", "J").with_year(2017).with_keywords(&["b", "d"]),
        ];
        let a = KeywordPairTimeline::build(&papers);
        let b = KeywordPairTimeline::build(&papers);
        assert_eq!(a, b);
        assert_eq!(format!("{:?}", a), format!("{:?}", b));
    }
}
