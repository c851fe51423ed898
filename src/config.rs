//! Analysis configuration.
//!
//! Column mapping and per-metric parameters, persisted as JSON at
//! `~/.rustjournalrank.json` by default. A missing file means "use defaults".

use crate::aggregate::{AggregateParams, RankingBasis};
use crate::error::{AnalysisError, OptionExt, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

/// Default config file path: `~/.rustjournalrank.json`
fn default_config_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".rustjournalrank.json"))
        .ok_or_config("Cannot determine home directory")
}

/// Logical input fields of the tabular corpus schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Journal,
    Year,
    Keywords,
    Categories,
    References,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Journal => "journal",
            Field::Year => "year",
            Field::Keywords => "keywords",
            Field::Categories => "categories",
            Field::References => "references",
        }
    }
}

/// Header names for each logical field.
///
/// Defaults follow the Web of Science export format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMapping {
    pub id: String,
    pub journal: String,
    pub year: String,
    pub keywords: String,
    pub categories: String,
    pub references: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            id: "DOI".to_string(),
            journal: "Source Title".to_string(),
            year: "Publication Year".to_string(),
            keywords: "Author Keywords".to_string(),
            categories: "WoS Categories".to_string(),
            references: "citing".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Header string mapped to `field`
    pub fn header(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Journal => &self.journal,
            Field::Year => &self.year,
            Field::Keywords => &self.keywords,
            Field::Categories => &self.categories,
            Field::References => &self.references,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisruptionConfig {
    pub aggregate: AggregateParams,
}

impl Default for DisruptionConfig {
    fn default() -> Self {
        Self {
            aggregate: AggregateParams::new(100.0, RankingBasis::VolumeWeighted),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoveltyConfig {
    /// A pair first seen at most this many years before the reference year is novel
    pub threshold_years: i32,
    /// Baseline year; defaults to the latest year in the target corpus
    pub reference_year: Option<i32>,
    pub aggregate: AggregateParams,
}

impl Default for NoveltyConfig {
    fn default() -> Self {
        Self {
            threshold_years: 1,
            reference_year: None,
            aggregate: AggregateParams::new(600.0, RankingBasis::RawMean),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterdisciplinarityConfig {
    pub aggregate: AggregateParams,
}

impl Default for InterdisciplinarityConfig {
    fn default() -> Self {
        Self {
            aggregate: AggregateParams::new(5.0, RankingBasis::RawMean),
        }
    }
}

/// Complete configuration for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Column mapping for the background corpus (and the target, unless overridden)
    pub columns: ColumnMapping,
    /// Column mapping override for the target corpus
    pub target_columns: Option<ColumnMapping>,
    pub disruption: DisruptionConfig,
    pub novelty: NoveltyConfig,
    pub interdisciplinarity: InterdisciplinarityConfig,
    /// Wall-clock limit for the whole batch, enforced by the host
    pub deadline_secs: Option<u64>,
}

impl AnalysisConfig {
    /// Column mapping to use for the target corpus
    pub fn target_columns(&self) -> &ColumnMapping {
        self.target_columns.as_ref().unwrap_or(&self.columns)
    }

    /// Reject parameter combinations the aggregator cannot honour
    pub fn validate(&self) -> Result<()> {
        self.disruption.aggregate.validate("disruption")?;
        self.novelty.aggregate.validate("novelty")?;
        self.interdisciplinarity.aggregate.validate("td")?;
        if self.novelty.threshold_years < 0 {
            return Err(AnalysisError::Config(format!(
                "novelty.threshold_years must be >= 0, got {}",
                self.novelty.threshold_years
            )));
        }
        if self.deadline_secs == Some(0) {
            return Err(AnalysisError::Config(
                "deadline_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Config file location and persistence
pub struct ConfigFile {
    path: PathBuf,
}

impl ConfigFile {
    /// Create a ConfigFile pointing at the default path
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_config_path()?,
        })
    }

    /// Create a ConfigFile with custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the config file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Load config from file
    ///
    /// Returns defaults if the file doesn't exist; a file that exists but
    /// does not parse is an error.
    pub fn load(&self) -> Result<AnalysisConfig> {
        if !self.path.exists() {
            debug!("Config file not found: {:?}", self.path);
            return Ok(AnalysisConfig::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        info!("Loaded config from {:?}", self.path);
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self, config: &AnalysisConfig) -> Result<()> {
        let content = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        info!("Saved config to {:?}", self.path);
        Ok(())
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(".rustjournalrank.json"),
        })
    }
}
