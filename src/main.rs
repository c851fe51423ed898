//! rustjournalrank - Journal Bibliometric Scoring
//!
//! Scores a target corpus for disruption, combinatorial novelty and
//! interdisciplinarity against a background corpus, then ranks journals.
//!
//! ## Usage
//!
//! ### CLI Mode
//! ```bash
//! rustjournalrank analyze --background all.csv --target target.csv --metrics disruption,td
//! ```
//!
//! ### HTTP Server Mode
//! ```bash
//! rustjournalrank serve --port 3000
//! ```

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use clap::{Parser, Subcommand};
use rustjournalrank::aggregate::JournalAggregate;
use rustjournalrank::config::{AnalysisConfig, ConfigFile};
use rustjournalrank::corpus::{required_fields, Corpus, Dataset, PaperRecord};
use rustjournalrank::export::{write_report, RunSummary};
use rustjournalrank::host::{apply_overrides, run_batch, Overrides};
use rustjournalrank::pipeline::AnalysisReport;
use rustjournalrank::{AnalysisError, Metric};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Journal Bibliometric Scoring - Disruption, Novelty & Interdisciplinarity
#[derive(Parser)]
#[command(name = "rustjournalrank")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a target corpus against a background corpus
    Analyze {
        /// Background corpus CSV (builds graph, timeline and similarity matrix)
        #[arg(long)]
        background: PathBuf,

        /// Target corpus CSV (papers to score and rank)
        #[arg(long)]
        target: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "./output")]
        output: PathBuf,

        /// Config file (defaults to ~/.rustjournalrank.json)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Metrics to compute (comma separated)
        #[arg(long, value_delimiter = ',', default_value = "disruption,novelty,td")]
        metrics: Vec<Metric>,

        /// Papers averaged per journal (all metrics)
        #[arg(long)]
        top_k: Option<usize>,

        /// Weight of the ln(1 + n) volume penalty (all metrics)
        #[arg(long)]
        volume_weight: Option<f64>,

        /// Novelty: max years since first observation for a pair to count as novel
        #[arg(long)]
        threshold_years: Option<i32>,

        /// Novelty: reference year (default: latest target year)
        #[arg(long)]
        reference_year: Option<i32>,

        /// Abort the batch after this many seconds
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Run as HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Config file used when a request carries none
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Manage the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show config file path
    Path,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the effective config
    Show,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    if cli.json_logs {
        fmt().json().with_env_filter(filter).with_target(true).init();
    } else {
        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(false)
            .init();
    }

    match cli.command {
        Commands::Analyze {
            background,
            target,
            output,
            config,
            metrics,
            top_k,
            volume_weight,
            threshold_years,
            reference_year,
            deadline_secs,
        } => {
            let mut analysis_config = load_config(config)?;
            apply_overrides(
                &mut analysis_config,
                Overrides {
                    top_k,
                    volume_weight,
                    threshold_years,
                    reference_year,
                    deadline_secs,
                },
            );
            run_analyze(background, target, output, analysis_config, metrics).await
        }
        Commands::Serve { port, host, config } => {
            let analysis_config = load_config(config)?;
            run_server(host, port, analysis_config).await
        }
        Commands::Config { action } => handle_config(action),
    }
}

fn config_file(path: Option<PathBuf>) -> Result<ConfigFile> {
    match path {
        Some(p) => Ok(ConfigFile::with_path(p)),
        None => ConfigFile::new().context("Failed to resolve config path"),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<AnalysisConfig> {
    let file = config_file(path)?;
    let config = file
        .load()
        .with_context(|| format!("Failed to load config from {:?}", file.path()))?;
    Ok(config)
}

// ============================================================================
// Analyze Command
// ============================================================================

async fn load_corpus(
    path: PathBuf,
    config: &AnalysisConfig,
    metrics: &[Metric],
    dataset: Dataset,
) -> Result<Corpus> {
    let mapping = match dataset {
        Dataset::Background => config.columns.clone(),
        Dataset::Target => config.target_columns().clone(),
    };
    let required = required_fields(metrics, dataset);
    let display = path.display().to_string();

    tokio::task::spawn_blocking(move || Corpus::from_csv_path(&path, &mapping, &required, dataset))
        .await
        .context("Loader task failed")?
        .with_context(|| format!("Failed to load {} corpus from {}", dataset, display))
}

async fn run_analyze(
    background_path: PathBuf,
    target_path: PathBuf,
    output_dir: PathBuf,
    config: AnalysisConfig,
    metrics: Vec<Metric>,
) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    if metrics.is_empty() {
        anyhow::bail!("No metrics selected");
    }

    // Create output folder
    let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let output_folder = output_dir.join(format!("{}_analysis", timestamp));
    std::fs::create_dir_all(&output_folder).context("Failed to create output directory")?;

    println!("Output folder: {}", output_folder.display());

    println!("\n--- Loading corpora ---");
    let (background, target) = futures::future::try_join(
        load_corpus(background_path.clone(), &config, &metrics, Dataset::Background),
        load_corpus(target_path.clone(), &config, &metrics, Dataset::Target),
    )
    .await?;
    println!(
        "Background: {} papers, target: {} papers",
        background.len(),
        target.len()
    );

    println!("\n--- Scoring ({}) ---", join_metrics(&metrics));
    let report = run_batch(background, target, config, metrics)
        .await
        .context("Analysis failed")?;

    let summary = RunSummary::from_report(&report).with_inputs(&background_path, &target_path);
    let summary = write_report(&output_folder, &report, summary).context("Failed to write results")?;

    for m in &report.metrics {
        print_top_journals(m.metric, &m.journals);
    }
    for failure in &report.failures {
        println!(
            "\n[{}] failed for {} papers: {}",
            failure.component, failure.affected, failure.message
        );
    }
    for diagnostic in &summary.diagnostics {
        info!(
            component = %diagnostic.component,
            affected = diagnostic.affected,
            "{}",
            diagnostic.message
        );
    }

    if report.metrics.is_empty() {
        if let Some(first) = report.failures.first().cloned() {
            return Err(AnalysisError::from(first)).context("No metric produced results");
        }
    }

    println!("\n✓ Analysis complete. Results in: {}", output_folder.display());
    Ok(())
}

fn join_metrics(metrics: &[Metric]) -> String {
    metrics.iter().map(Metric::name).collect::<Vec<_>>().join(", ")
}

fn print_top_journals(metric: Metric, journals: &[JournalAggregate]) {
    println!("\n[{}] top journals:", metric);
    println!("{:>4}  {:<40} {:>6} {:>10}", "rank", "journal", "papers", "score");
    for j in journals.iter().take(10) {
        println!(
            "{:>4}  {:<40} {:>6} {:>10.2}",
            j.rank,
            truncate(&j.journal, 40),
            j.paper_count,
            j.percent_score
        );
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{}…", cut)
    }
}

// ============================================================================
// HTTP Server
// ============================================================================

async fn run_server(host: String, port: u16, config: AnalysisConfig) -> Result<()> {
    config.validate().context("Invalid configuration")?;
    info!(host = %host, port = port, "Starting HTTP server");
    println!("Starting server at http://{}:{}", host, port);

    let app_state = Arc::new(AppState { config });
    let app = router(app_state);

    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .context("Invalid host:port")?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/analyze", post(analyze_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

struct AppState {
    /// Defaults for requests that carry no config
    config: AnalysisConfig,
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Analyze request body
#[derive(Debug, Deserialize)]
struct AnalyzeRequest {
    background: Vec<PaperRecord>,
    target: Vec<PaperRecord>,
    config: Option<AnalysisConfig>,
    #[serde(default = "default_metrics")]
    metrics: Vec<Metric>,
}

fn default_metrics() -> Vec<Metric> {
    Metric::ALL.to_vec()
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: String,
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(code: StatusCode, message: impl Into<String>) -> ApiError {
    (
        code,
        Json(ErrorResponse {
            status: "error".to_string(),
            error: message.into(),
        }),
    )
}

/// Analyze endpoint handler
async fn analyze_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> std::result::Result<Json<AnalysisReport>, ApiError> {
    info!(
        background = req.background.len(),
        target = req.target.len(),
        metrics = ?req.metrics,
        "Analyze request"
    );

    let config = req.config.unwrap_or_else(|| state.config.clone());
    if req.metrics.is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "no metrics selected"));
    }

    let background = Corpus::from_records(Dataset::Background, req.background);
    let target = Corpus::from_records(Dataset::Target, req.target);

    match run_batch(background, target, config, req.metrics).await {
        Ok(report) => {
            if !report.is_complete() {
                warn!(failed = report.failures.len(), "Analysis returned partial results");
            }
            Ok(Json(report))
        }
        Err(e) => {
            error!(error = %e, "Analysis failed");
            Err(api_error(e.status_code(), e.to_string()))
        }
    }
}

// ============================================================================
// Config Management
// ============================================================================

fn handle_config(action: ConfigAction) -> Result<()> {
    let file = config_file(None)?;

    match action {
        ConfigAction::Path => {
            println!("Config file: {:?}", file.path());
        }
        ConfigAction::Init { force } => {
            if file.path().exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {:?} (use --force to overwrite)",
                    file.path()
                );
            }
            file.save(&AnalysisConfig::default())
                .context("Failed to write config file")?;
            println!("Wrote default config to {:?}", file.path());
        }
        ConfigAction::Show => {
            let config = load_config(None)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}
