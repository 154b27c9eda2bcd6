//! Tests for configuration defaults, validation and file loading

use std::path::PathBuf;

use review_sentiment_pipeline::config::{AppConfig, SheetBackend, StartStage};
use review_sentiment_pipeline::error::PipelineError;
use tempfile::tempdir;

#[test]
fn test_default_sheets_config() {
    let config = AppConfig::default();

    assert_eq!(config.sheets.backend, "csv");
    assert_eq!(config.sheets.workbook_dir, "./data");
    assert_eq!(config.sheets.api_base, "https://sheets.googleapis.com/v4");
    assert!(config.sheets.spreadsheet_id.is_empty());
}

#[test]
fn test_default_llm_config() {
    let config = AppConfig::default();

    assert_eq!(config.llm.api_base, "https://api.groq.com/openai/v1");
    assert_eq!(config.llm.model, "openai/gpt-oss-20b");
    assert!((config.llm.temperature - 0.1).abs() < f32::EPSILON);
    assert_eq!(config.llm.max_tokens, 150);
    assert_eq!(config.llm.pacing_delay_ms, 500);
}

#[test]
fn test_default_output_and_pipeline_config() {
    let config = AppConfig::default();

    assert_eq!(config.report_path(), PathBuf::from("insights_report.txt"));
    assert_eq!(config.chart_dir(), PathBuf::from("charts"));
    assert_eq!(config.start_stage().ok(), Some(StartStage::Extract));
    assert_eq!(config.pipeline.progress_interval, 10);
    assert_eq!(config.logging.format, "text");
}

#[test]
fn test_config_validation_success() {
    let config = AppConfig::default();
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_invalid_backend() {
    let mut config = AppConfig::default();
    config.sheets.backend = "excel".to_string();
    assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
}

#[test]
fn test_config_validation_backend_is_case_insensitive() {
    let mut config = AppConfig::default();
    config.sheets.backend = "Google".to_string();
    assert_eq!(config.sheet_backend().ok(), Some(SheetBackend::Google));
}

#[test]
fn test_config_validation_temperature_range() {
    let mut config = AppConfig::default();
    config.llm.temperature = 2.5;
    assert!(config.validate().is_err());

    config.llm.temperature = 0.0;
    assert!(config.validate().is_ok());
}

#[test]
fn test_config_validation_zero_max_tokens() {
    let mut config = AppConfig::default();
    config.llm.max_tokens = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_zero_timeout() {
    let mut config = AppConfig::default();
    config.llm.request_timeout_secs = 0;
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_log_level() {
    let mut config = AppConfig::default();
    config.logging.level = "invalid".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_valid_log_levels() {
    for level in ["trace", "debug", "info", "warn", "error"] {
        let mut config = AppConfig::default();
        config.logging.level = level.to_string();
        assert!(config.validate().is_ok(), "Failed for level: {level}");
    }
}

#[test]
fn test_config_validation_invalid_log_format() {
    let mut config = AppConfig::default();
    config.logging.format = "xml".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_invalid_start_stage() {
    let mut config = AppConfig::default();
    config.pipeline.start_stage = "report".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_empty_output_paths() {
    let mut config = AppConfig::default();
    config.output.chart_dir = "  ".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_require_credentials_needs_api_key() {
    let config = AppConfig::default();
    let err = config.require_credentials().expect_err("Missing key must be rejected");
    assert!(err.to_string().contains("GROQ_API_KEY"));
}

#[test]
fn test_require_credentials_google_backend() {
    let mut config = AppConfig::default();
    config.llm.api_key = "key".to_string();
    assert!(config.require_credentials().is_ok(), "csv backend needs no sheet credentials");

    config.sheets.backend = "google".to_string();
    let err = config.require_credentials().expect_err("Missing sheet id must be rejected");
    assert!(err.to_string().contains("GOOGLE_SHEET_ID"));

    config.sheets.spreadsheet_id = "sheet".to_string();
    assert!(config.require_credentials().is_err());

    config.sheets.access_token = "token".to_string();
    assert!(config.require_credentials().is_ok());
}

#[test]
fn test_load_with_extra_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("pipeline.toml");
    std::fs::write(
        &path,
        "[llm]\nmodel = \"llama-3.1-8b-instant\"\npacing_delay_ms = 0\n\n[pipeline]\nstart_stage = \"analyze\"\n",
    )
    .expect("Failed to write config file");

    let config = AppConfig::load(Some(&path)).expect("Failed to load config");
    assert_eq!(config.llm.model, "llama-3.1-8b-instant");
    assert_eq!(config.llm.pacing_delay_ms, 0);
    assert_eq!(config.start_stage().ok(), Some(StartStage::Analyze));
    // Untouched keys keep their defaults
    assert_eq!(config.llm.max_tokens, 150);
    assert_eq!(config.output.report_path, "insights_report.txt");
}

#[test]
fn test_load_rejects_invalid_file_values() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("pipeline.toml");
    std::fs::write(&path, "[sheets]\nbackend = \"excel\"\n").expect("Failed to write config file");

    assert!(matches!(AppConfig::load(Some(&path)), Err(PipelineError::Config(_))));
}

#[test]
fn test_load_missing_extra_file() {
    let dir = tempdir().expect("Failed to create temp directory");
    let path = dir.path().join("absent.toml");
    assert!(AppConfig::load(Some(&path)).is_err());
}
