//! Paper records and corpus loading.
//!
//! The column mapping is resolved against the CSV header row exactly once;
//! every data row is then read through typed column indices. Only a missing
//! required column is fatal. Malformed list cells become empty lists and
//! cells that are not valid UTF-8 are decoded lossily; both are counted in
//! [`LoadStats`].

use crate::aggregate::Metric;
use crate::config::{ColumnMapping, Field};
use crate::error::{AnalysisError, Result};
use crate::fields::{
    normalize_identifier, normalize_keyword, parse_list_field, parse_year, plausible_year, FieldKind,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Journal name used when the journal cell is blank
pub const UNKNOWN_JOURNAL: &str = "Unknown";

/// Which of the two input tables a corpus came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dataset {
    Background,
    Target,
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Background => f.write_str("background"),
            Dataset::Target => f.write_str("target"),
        }
    }
}

/// One paper as loaded from a corpus. Immutable after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    /// Normalized identifier (usually a lower-cased DOI); empty if the row had none
    pub id: String,
    pub journal: String,
    pub year: Option<i32>,
    /// Case-folded, de-duplicated keywords
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    /// Normalized identifiers of cited papers
    pub references: Vec<String>,
}

impl Paper {
    pub fn new(id: &str, journal: &str) -> Self {
        let journal = journal.trim();
        Self {
            id: normalize_identifier(id),
            journal: if journal.is_empty() {
                UNKNOWN_JOURNAL.to_string()
            } else {
                journal.to_string()
            },
            year: None,
            keywords: Vec::new(),
            categories: Vec::new(),
            references: Vec::new(),
        }
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_keywords<S: AsRef<str>>(mut self, keywords: &[S]) -> Self {
        self.keywords = dedup(keywords.iter().map(|k| normalize_keyword(k.as_ref())));
        self
    }

    pub fn with_categories<S: AsRef<str>>(mut self, categories: &[S]) -> Self {
        self.categories = dedup(categories.iter().map(|c| c.as_ref().trim().to_string()));
        self
    }

    pub fn with_references<S: AsRef<str>>(mut self, references: &[S]) -> Self {
        self.references = dedup(references.iter().map(|r| normalize_identifier(r.as_ref())));
        self
    }

    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }
}

fn dedup(values: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect()
}

/// Structured input row, as received by the HTTP host.
///
/// Years outside the range accepted by [`parse_year`] are dropped on conversion.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperRecord {
    pub id: String,
    pub journal: String,
    pub year: Option<i32>,
    pub keywords: Vec<String>,
    pub categories: Vec<String>,
    pub references: Vec<String>,
}

impl From<PaperRecord> for Paper {
    fn from(r: PaperRecord) -> Self {
        let mut paper = Paper::new(&r.id, &r.journal)
            .with_keywords(&r.keywords)
            .with_categories(&r.categories)
            .with_references(&r.references);
        paper.year = r.year.and_then(|y| plausible_year(i64::from(y)));
        paper
    }
}

/// Counters collected while loading one corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadStats {
    pub rows: usize,
    pub skipped_missing_id: usize,
    pub missing_year: usize,
    pub malformed_keywords: usize,
    pub malformed_categories: usize,
    pub malformed_references: usize,
    /// Rows with at least one cell that was not valid UTF-8
    pub invalid_utf8: usize,
}

impl LoadStats {
    pub fn malformed_total(&self) -> usize {
        self.malformed_keywords + self.malformed_categories + self.malformed_references
    }
}

/// Fields a corpus must provide for the selected metrics.
///
/// `id` is always required; the target corpus also needs `journal`.
pub fn required_fields(metrics: &[Metric], dataset: Dataset) -> Vec<Field> {
    let mut fields = vec![Field::Id];
    if dataset == Dataset::Target {
        fields.push(Field::Journal);
    }
    for metric in metrics {
        let needed: &[Field] = match (metric, dataset) {
            (Metric::Disruption, Dataset::Background) => &[Field::References],
            (Metric::Disruption, Dataset::Target) => &[],
            (Metric::Novelty, Dataset::Background) => &[Field::Keywords, Field::Year],
            (Metric::Novelty, Dataset::Target) => &[Field::Keywords],
            (Metric::Interdisciplinarity, Dataset::Background) => &[Field::Categories, Field::References],
            (Metric::Interdisciplinarity, Dataset::Target) => &[Field::References],
        };
        for field in needed {
            if !fields.contains(field) {
                fields.push(*field);
            }
        }
    }
    fields
}

/// Column indices resolved once from the header row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    id: usize,
    journal: Option<usize>,
    year: Option<usize>,
    keywords: Option<usize>,
    categories: Option<usize>,
    references: Option<usize>,
}

impl ResolvedColumns {
    /// Map every logical field onto a header position.
    ///
    /// Missing optional columns resolve to `None`; a missing required column
    /// aborts with [`AnalysisError::MissingColumn`].
    pub fn resolve(
        headers: &csv::StringRecord,
        mapping: &ColumnMapping,
        required: &[Field],
        dataset: Dataset,
    ) -> Result<Self> {
        let names: Vec<String> = headers
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let find = |field: Field| -> Result<Option<usize>> {
            let header = mapping.header(field);
            let position = names.iter().position(|n| n == header.trim());
            match position {
                Some(idx) => Ok(Some(idx)),
                None if required.contains(&field) => Err(AnalysisError::MissingColumn {
                    dataset: dataset.to_string(),
                    field: field.as_str().to_string(),
                    header: header.to_string(),
                }),
                None => {
                    debug!(dataset = %dataset, field = field.as_str(), header, "Optional column absent");
                    Ok(None)
                }
            }
        };

        let id = find(Field::Id)?.ok_or_else(|| AnalysisError::MissingColumn {
            dataset: dataset.to_string(),
            field: Field::Id.as_str().to_string(),
            header: mapping.id.clone(),
        })?;

        Ok(Self {
            id,
            journal: find(Field::Journal)?,
            year: find(Field::Year)?,
            keywords: find(Field::Keywords)?,
            categories: find(Field::Categories)?,
            references: find(Field::References)?,
        })
    }
}

/// An in-memory collection of papers from one input table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Corpus {
    pub dataset: Dataset,
    papers: Vec<Paper>,
    pub stats: LoadStats,
}

impl Corpus {
    /// Wrap already-normalized papers
    pub fn from_papers(dataset: Dataset, papers: Vec<Paper>) -> Self {
        let mut kept = Vec::with_capacity(papers.len());
        let mut stats = LoadStats {
            rows: papers.len(),
            ..LoadStats::default()
        };
        for paper in papers {
            if dataset == Dataset::Background && !paper.has_id() {
                stats.skipped_missing_id += 1;
                continue;
            }
            if paper.year.is_none() {
                stats.missing_year += 1;
            }
            kept.push(paper);
        }
        Self {
            dataset,
            papers: kept,
            stats,
        }
    }

    /// Build from structured records (HTTP input)
    pub fn from_records(dataset: Dataset, records: Vec<PaperRecord>) -> Self {
        Self::from_papers(dataset, records.into_iter().map(Paper::from).collect())
    }

    /// Load a CSV file
    pub fn from_csv_path(
        path: &Path,
        mapping: &ColumnMapping,
        required: &[Field],
        dataset: Dataset,
    ) -> Result<Self> {
        info!(dataset = %dataset, path = %path.display(), "Loading corpus");
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, mapping, required, dataset)
    }

    /// Load CSV data from any reader
    pub fn from_reader<R: Read>(
        reader: R,
        mapping: &ColumnMapping,
        required: &[Field],
        dataset: Dataset,
    ) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let headers = csv::StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());
        let columns = ResolvedColumns::resolve(&headers, mapping, required, dataset)?;

        let mut papers = Vec::new();
        let mut stats = LoadStats::default();

        for raw in rdr.byte_records() {
            let raw = raw?;
            stats.rows += 1;
            if raw.iter().any(|field| std::str::from_utf8(field).is_err()) {
                stats.invalid_utf8 += 1;
                debug!(row = stats.rows, "Row holds invalid UTF-8, decoding lossily");
            }
            let record = csv::StringRecord::from_byte_record_lossy(raw);

            let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

            let id = normalize_identifier(cell(Some(columns.id)));
            if id.is_empty() && dataset == Dataset::Background {
                stats.skipped_missing_id += 1;
                continue;
            }

            let year = parse_year(cell(columns.year));
            if year.is_none() {
                stats.missing_year += 1;
            }

            let keywords = parse_list_field(cell(columns.keywords), FieldKind::Keywords);
            let categories = parse_list_field(cell(columns.categories), FieldKind::Categories);
            let references = parse_list_field(cell(columns.references), FieldKind::References);

            if keywords.is_malformed() {
                stats.malformed_keywords += 1;
            }
            if categories.is_malformed() {
                stats.malformed_categories += 1;
            }
            if references.is_malformed() {
                stats.malformed_references += 1;
                debug!(id = %id, "Unparsable reference list, treating as empty");
            }

            let journal = cell(columns.journal).trim();
            papers.push(Paper {
                id,
                journal: if journal.is_empty() {
                    UNKNOWN_JOURNAL.to_string()
                } else {
                    journal.to_string()
                },
                year,
                keywords: keywords.into_vec(),
                categories: categories.into_vec(),
                references: references.into_vec(),
            });
        }

        if stats.invalid_utf8 > 0 {
            warn!(
                dataset = %dataset,
                rows = stats.invalid_utf8,
                "Some rows were not valid UTF-8; bad bytes replaced with U+FFFD"
            );
        }
        if stats.malformed_total() > 0 {
            warn!(
                dataset = %dataset,
                malformed_keywords = stats.malformed_keywords,
                malformed_categories = stats.malformed_categories,
                malformed_references = stats.malformed_references,
                "Some list fields could not be parsed and were treated as empty"
            );
        }
        info!(
            dataset = %dataset,
            rows = stats.rows,
            papers = papers.len(),
            skipped_missing_id = stats.skipped_missing_id,
            missing_year = stats.missing_year,
            "Corpus loaded"
        );

        Ok(Self {
            dataset,
            papers,
            stats,
        })
    }

    pub fn papers(&self) -> &[Paper] {
        &self.papers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Paper> {
        self.papers.iter()
    }

    pub fn len(&self) -> usize {
        self.papers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.papers.is_empty()
    }

    /// Latest publication year present, if any paper has one
    pub fn max_year(&self) -> Option<i32> {
        self.papers.iter().filter_map(|p| p.year).max()
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Paper;
    type IntoIter = std::slice::Iter<'a, Paper>;

    fn into_iter(self) -> Self::IntoIter {
        self.papers.iter()
    }
}
