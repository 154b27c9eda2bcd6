use std::path::{Path, PathBuf};
use std::str::FromStr;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Workbook backend and credentials
    pub sheets: SheetsConfig,
    /// Completion service settings
    pub llm: LlmConfig,
    /// Report and chart locations
    pub output: OutputConfig,
    /// Log level, format and optional file
    pub logging: LoggingConfig,
    /// Resume point and progress cadence
    pub pipeline: PipelineConfig,
}

/// Where the three sheets live
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetsConfig {
    /// Backend name
    pub backend: String, // "csv" or "google"
    /// Directory holding one CSV file per sheet
    pub workbook_dir: String,
    /// Spreadsheet identifier (`GOOGLE_SHEET_ID`)
    pub spreadsheet_id: String,
    /// OAuth bearer token (`GOOGLE_ACCESS_TOKEN`)
    pub access_token: String,
    /// Sheets REST API root
    pub api_base: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

/// Completion service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// OpenAI-compatible API root
    pub api_base: String,
    /// Secret key (`GROQ_API_KEY`)
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Sampling temperature, 0.0 to 2.0
    pub temperature: f32,
    /// Reply length cap
    pub max_tokens: u32,
    /// Sleep after each successful call
    pub pacing_delay_ms: u64,
    /// Per-request timeout
    pub request_timeout_secs: u64,
}

/// Output locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Insights report file
    pub report_path: String,
    /// Chart directory
    pub chart_dir: String,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level
    pub level: String,
    /// Optional rolling log file
    pub file_path: Option<String>,
    /// Console format
    pub format: String, // "json" or "text"
}

/// Run control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// `extract`, `classify` or `analyze`
    pub start_stage: String,
    /// Log progress every this many rows
    pub progress_interval: usize,
}

/// Stage the pipeline starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StartStage {
    /// Read `raw_data` and run everything
    Extract,
    /// Read the cleaned rows from `staging`
    Classify,
    /// Read the classified rows from `processed`
    Analyze,
}

impl FromStr for StartStage {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "extract" => Ok(Self::Extract),
            "classify" => Ok(Self::Classify),
            "analyze" => Ok(Self::Analyze),
            other => Err(PipelineError::Config(format!(
                "Invalid start stage: {other}. Must be one of: extract, classify, analyze"
            ))),
        }
    }
}

/// Tabular backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetBackend {
    /// Directory of CSV files
    Csv,
    /// Google Sheets values API
    Google,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sheets: SheetsConfig {
                backend: "csv".to_string(),
                workbook_dir: "./data".to_string(),
                spreadsheet_id: String::new(),
                access_token: String::new(),
                api_base: "https://sheets.googleapis.com/v4".to_string(),
                request_timeout_secs: 30,
            },
            llm: LlmConfig {
                api_base: "https://api.groq.com/openai/v1".to_string(),
                api_key: String::new(),
                model: "openai/gpt-oss-20b".to_string(),
                temperature: 0.1,
                max_tokens: 150,
                pacing_delay_ms: 500,
                request_timeout_secs: 30,
            },
            output: OutputConfig {
                report_path: "insights_report.txt".to_string(),
                chart_dir: "charts".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                file_path: None,
                format: "text".to_string(),
            },
            pipeline: PipelineConfig {
                start_stage: "extract".to_string(),
                progress_interval: 10,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load(extra_file: Option<&Path>) -> Result<Self> {
        // Credentials usually live in .env next to the binary
        dotenv::dotenv().ok();

        let mut builder = Config::builder()
            // Start with default values
            .add_source(Config::try_from(&Self::default())?)
            // Add config files if they exist
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = extra_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            // Add environment variables with prefix
            .add_source(Environment::with_prefix("REVIEW_PIPELINE").separator("__"))
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to load configuration: {e}")))?;

        let mut app_config: Self = config
            .try_deserialize()
            .map_err(|e| PipelineError::Config(format!("Failed to deserialize configuration: {e}")))?;

        app_config.apply_well_known_env();

        // Validate configuration
        app_config.validate()?;

        Ok(app_config)
    }

    /// Credentials under their conventional names win over config files
    fn apply_well_known_env(&mut self) {
        if let Ok(key) = std::env::var("GROQ_API_KEY") {
            self.llm.api_key = key;
        }
        if let Ok(id) = std::env::var("GOOGLE_SHEET_ID") {
            self.sheets.spreadsheet_id = id;
        }
        if let Ok(token) = std::env::var("GOOGLE_ACCESS_TOKEN") {
            self.sheets.access_token = token;
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        self.sheet_backend()?;
        self.start_stage()?;

        if self.sheets.request_timeout_secs == 0 || self.llm.request_timeout_secs == 0 {
            return Err(PipelineError::Config("request_timeout_secs must be greater than 0".to_string()));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(PipelineError::Config(format!(
                "temperature must be between 0 and 2, got {}",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(PipelineError::Config("max_tokens must be greater than 0".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(PipelineError::Config("model cannot be empty".to_string()));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(PipelineError::Config(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                self.logging.level
            )));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(PipelineError::Config(format!(
                "Invalid log format: {}. Must be one of: {valid_formats:?}",
                self.logging.format
            )));
        }

        if self.output.report_path.trim().is_empty() || self.output.chart_dir.trim().is_empty() {
            return Err(PipelineError::Config("output paths cannot be empty".to_string()));
        }

        if self.pipeline.progress_interval == 0 {
            return Err(PipelineError::Config("progress_interval must be greater than 0".to_string()));
        }

        Ok(())
    }

    /// Fail before any work when the selected backends lack credentials
    pub fn require_credentials(&self) -> Result<()> {
        if self.llm.api_key.trim().is_empty() {
            return Err(PipelineError::Config("GROQ_API_KEY not set".to_string()));
        }
        if self.sheet_backend()? == SheetBackend::Google {
            if self.sheets.spreadsheet_id.trim().is_empty() {
                return Err(PipelineError::Config("GOOGLE_SHEET_ID not set".to_string()));
            }
            if self.sheets.access_token.trim().is_empty() {
                return Err(PipelineError::Config("GOOGLE_ACCESS_TOKEN not set".to_string()));
            }
        }
        Ok(())
    }

    /// Selected tabular backend
    pub fn sheet_backend(&self) -> Result<SheetBackend> {
        match self.sheets.backend.to_lowercase().as_str() {
            "csv" => Ok(SheetBackend::Csv),
            "google" => Ok(SheetBackend::Google),
            other => Err(PipelineError::Config(format!(
                "Invalid sheet backend: {other}. Must be one of: csv, google"
            ))),
        }
    }

    /// Stage to start from
    pub fn start_stage(&self) -> Result<StartStage> {
        self.pipeline.start_stage.parse()
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Report file location
    pub fn report_path(&self) -> PathBuf {
        PathBuf::from(&self.output.report_path)
    }

    /// Chart output directory
    pub fn chart_dir(&self) -> PathBuf {
        PathBuf::from(&self.output.chart_dir)
    }
}
