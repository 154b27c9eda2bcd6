use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use review_sentiment_pipeline::config::{AppConfig, SheetBackend};
use review_sentiment_pipeline::logging::init_logging;
use review_sentiment_pipeline::repository::{open_csv_workbook, GoogleSheetsRepository, SheetRepository};
use review_sentiment_pipeline::{GroqClient, Pipeline, PipelineSettings, ReviewClassifier};

/// Clean, classify and report on product reviews
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Additional configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let level = cli.log_level.clone().unwrap_or_else(|| config.get_log_level());
    let _guard = init_logging(
        Some(&level),
        config.logging.file_path.as_deref().map(Path::new),
        config.logging.format == "json",
    )?;

    info!("Starting review-sentiment-pipeline");

    match run(&config).await {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Pipeline failed: {e:#}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(config: &AppConfig) -> Result<()> {
    // Missing credentials end the run before any sheet is touched
    config.require_credentials()?;

    let client = GroqClient::new(&config.llm)?;
    let classifier = ReviewClassifier::new(client, &config.llm)?;
    let settings = PipelineSettings::from_config(config);

    match config.sheet_backend()? {
        SheetBackend::Csv => {
            let dir = PathBuf::from(&config.sheets.workbook_dir);
            info!("Using CSV workbook at: {}", dir.display());
            let repo = open_csv_workbook(&dir).await?;
            execute(repo, classifier, settings, config).await
        }
        SheetBackend::Google => {
            info!("Using Google spreadsheet: {}", config.sheets.spreadsheet_id);
            let repo = GoogleSheetsRepository::new(&config.sheets)?;
            execute(repo, classifier, settings, config).await
        }
    }
}

async fn execute<R: SheetRepository>(
    repo: R,
    classifier: ReviewClassifier<GroqClient>,
    settings: PipelineSettings,
    config: &AppConfig,
) -> Result<()> {
    let pipeline = Pipeline::new(repo, classifier, settings);
    pipeline.run_from(config.start_stage()?).await?;
    Ok(())
}
