//! # rustjournalrank
//!
//! Journal Bibliometric Scoring - Disruption, Novelty & Interdisciplinarity Engine
//!
//! A large *background* corpus is turned into three read-only structures
//! (citation graph, keyword-pair timeline, category similarity matrix). Papers
//! of a smaller *target* corpus are scored against them and the scores are
//! ranked per journal.
//!
//! ## Modules
//!
//! - [`corpus`] - Paper records and CSV loading
//! - [`fields`] - List-field parsing and identifier normalization
//! - [`graph`] / [`disruption`] - Citation graph and D-index
//! - [`timeline`] / [`novelty`] - Keyword-pair timeline and combinatorial novelty
//! - [`similarity`] / [`interdisciplinarity`] - Category similarity and TD index
//! - [`aggregate`] - Top-K / volume-weighted journal ranking
//! - [`pipeline`] - End-to-end run with partial results
//! - [`export`] - CSV and JSON writers
//! - [`host`] - Blocking batch runner with a deadline, CLI overrides
//! - [`config`] - Analysis configuration
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rustjournalrank::{config::AnalysisConfig, corpus::{Corpus, Dataset}, pipeline, Metric};
//! use rustjournalrank::corpus::required_fields;
//! use std::path::Path;
//!
//! fn main() -> rustjournalrank::Result<()> {
//!     let config = AnalysisConfig::default();
//!     let metrics = Metric::ALL;
//!     let background = Corpus::from_csv_path(
//!         Path::new("all.csv"),
//!         &config.columns,
//!         &required_fields(&metrics, Dataset::Background),
//!         Dataset::Background,
//!     )?;
//!     let target = Corpus::from_csv_path(
//!         Path::new("target.csv"),
//!         config.target_columns(),
//!         &required_fields(&metrics, Dataset::Target),
//!         Dataset::Target,
//!     )?;
//!     let report = pipeline::run_analysis(&background, &target, &config, &metrics)?;
//!     println!("{} metrics scored", report.metrics.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod config;
pub mod corpus;
pub mod disruption;
pub mod error;
pub mod export;
pub mod fields;
pub mod graph;
pub mod host;
pub mod interdisciplinarity;
pub mod novelty;
pub mod pipeline;
pub mod progress;
pub mod similarity;
pub mod timeline;

pub use aggregate::{Metric, PaperScore};
pub use error::{AnalysisError, Result};
