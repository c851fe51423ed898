//! Host-side wrapper around the synchronous pipeline.
//!
//! The CLI and the HTTP server both run a batch through [`run_batch`], which
//! moves the work onto a blocking thread and bounds it by the configured
//! deadline. The scoring core itself has no notion of time.

use crate::aggregate::Metric;
use crate::config::AnalysisConfig;
use crate::corpus::Corpus;
use crate::error::AnalysisError;
use crate::pipeline::{run_analysis, AnalysisReport};
use axum::http::StatusCode;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("analysis exceeded the {}s deadline", .0.as_secs_f64())]
    DeadlineExceeded(Duration),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error("analysis task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl HostError {
    /// HTTP status reported for this failure
    pub fn status_code(&self) -> StatusCode {
        match self {
            HostError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            HostError::Analysis(AnalysisError::Config(_) | AnalysisError::Validation(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Command-line values that take precedence over the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub top_k: Option<usize>,
    pub volume_weight: Option<f64>,
    pub threshold_years: Option<i32>,
    pub reference_year: Option<i32>,
    pub deadline_secs: Option<u64>,
}

/// `top_k` and `volume_weight` apply to all three metrics.
pub fn apply_overrides(config: &mut AnalysisConfig, o: Overrides) {
    for params in [
        &mut config.disruption.aggregate,
        &mut config.novelty.aggregate,
        &mut config.interdisciplinarity.aggregate,
    ] {
        if let Some(k) = o.top_k {
            params.top_k = k;
        }
        if let Some(w) = o.volume_weight {
            params.volume_weight = w;
        }
    }
    if let Some(t) = o.threshold_years {
        config.novelty.threshold_years = t;
    }
    if o.reference_year.is_some() {
        config.novelty.reference_year = o.reference_year;
    }
    if o.deadline_secs.is_some() {
        config.deadline_secs = o.deadline_secs;
    }
}

/// Run `job` on a blocking thread, giving up after `deadline`.
///
/// On timeout the thread is left to finish on its own; its result is dropped.
pub async fn run_with_deadline<T, F>(deadline: Option<Duration>, job: F) -> Result<T, HostError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AnalysisError> + Send + 'static,
{
    let task = tokio::task::spawn_blocking(job);

    let joined = match deadline {
        Some(limit) => match tokio::time::timeout(limit, task).await {
            Ok(joined) => joined,
            Err(_) => {
                warn!(deadline_secs = limit.as_secs_f64(), "Analysis deadline exceeded");
                return Err(HostError::DeadlineExceeded(limit));
            }
        },
        None => task.await,
    };
    Ok(joined??)
}

/// Run the full pipeline under `config.deadline_secs`.
pub async fn run_batch(
    background: Corpus,
    target: Corpus,
    config: AnalysisConfig,
    metrics: Vec<Metric>,
) -> Result<AnalysisReport, HostError> {
    let deadline = config.deadline_secs.map(Duration::from_secs);
    run_with_deadline(deadline, move || run_analysis(&background, &target, &config, &metrics)).await
}
