use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SheetsConfig;
use crate::error::{PipelineError, Result};
use crate::metrics;
use crate::models::Dataset;

/// Sheet holding the untouched source rows
pub const RAW_SHEET: &str = "raw_data";
/// Sheet holding the cleaned rows
pub const STAGING_SHEET: &str = "staging";
/// Sheet holding the classified rows
pub const PROCESSED_SHEET: &str = "processed";

/// Rows of string values, header first
pub type SheetValues = Vec<Vec<String>>;

/// Named-sheet tabular storage.
///
/// Callers must not run two pipelines against the same destination sheet at
/// once; no locking is done here.
#[async_trait]
pub trait SheetRepository: Send + Sync {
    /// Read every row of a sheet, header included
    async fn read_all_rows(&self, sheet: &str) -> Result<SheetValues>;
    /// Remove every row of a sheet
    async fn clear(&self, sheet: &str) -> Result<()>;
    /// Write rows starting at the first cell
    async fn write_all_rows(&self, sheet: &str, rows: &SheetValues) -> Result<()>;
}

/// Read a sheet into a dataset
pub async fn extract<R: SheetRepository + ?Sized>(repo: &R, sheet: &str) -> Result<Dataset> {
    let values = repo.read_all_rows(sheet).await?;
    let dataset = Dataset::from_values(values)?;
    info!(sheet, rows = dataset.len(), columns = dataset.headers().len(), "Extracted sheet");
    Ok(dataset)
}

/// Replace a sheet's contents with the dataset (clear, then write)
pub async fn load<R: SheetRepository + ?Sized>(repo: &R, sheet: &str, dataset: &Dataset) -> Result<()> {
    repo.clear(sheet).await?;
    let values = dataset.to_values();
    repo.write_all_rows(sheet, &values).await?;
    metrics::record_rows_written(sheet, dataset.len());
    info!(sheet, rows = dataset.len(), "Loaded sheet");
    Ok(())
}

/// Workbook stored as one CSV file per sheet in a directory
pub struct CsvWorkbook {
    dir: PathBuf,
}

impl CsvWorkbook {
    /// Workbook rooted at `dir`; nothing is touched on disk yet
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create an empty sheet file if it does not exist yet
    pub async fn ensure_sheet(&self, sheet: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.sheet_path(sheet);
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, b"").await?;
        }
        Ok(())
    }

    fn sheet_path(&self, sheet: &str) -> PathBuf {
        self.dir.join(format!("{sheet}.csv"))
    }

    async fn existing_sheet(&self, sheet: &str) -> Result<PathBuf> {
        let path = self.sheet_path(sheet);
        if tokio::fs::try_exists(&path).await? {
            Ok(path)
        } else {
            Err(PipelineError::SheetNotFound(sheet.to_string()))
        }
    }
}

#[async_trait]
impl SheetRepository for CsvWorkbook {
    async fn read_all_rows(&self, sheet: &str) -> Result<SheetValues> {
        let path = self.existing_sheet(sheet).await?;
        let bytes = tokio::fs::read(&path).await?;
        parse_csv(&bytes)
    }

    async fn clear(&self, sheet: &str) -> Result<()> {
        let path = self.existing_sheet(sheet).await?;
        tokio::fs::write(&path, b"").await?;
        Ok(())
    }

    async fn write_all_rows(&self, sheet: &str, rows: &SheetValues) -> Result<()> {
        let path = self.existing_sheet(sheet).await?;
        let bytes = render_csv(rows)?;
        tokio::fs::write(&path, bytes).await?;
        debug!(path = %path.display(), rows = rows.len(), "Wrote CSV sheet");
        Ok(())
    }
}

fn parse_csv(bytes: &[u8]) -> Result<SheetValues> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(ToString::to_string).collect());
    }
    Ok(rows)
}

fn render_csv(rows: &SheetValues) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(Vec::new());
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| PipelineError::Sheet(format!("Failed to flush CSV buffer: {e}")))
}

#[derive(Debug, Default, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: SheetValues,
}

#[derive(Serialize)]
struct ValueUpdate<'a> {
    values: &'a SheetValues,
}

/// Google Sheets values API backend
pub struct GoogleSheetsRepository {
    client: reqwest::Client,
    api_base: Url,
    spreadsheet_id: String,
    access_token: String,
}

impl GoogleSheetsRepository {
    /// Build a repository from the sheet settings
    pub fn new(config: &SheetsConfig) -> Result<Self> {
        if config.spreadsheet_id.trim().is_empty() {
            return Err(PipelineError::Config("GOOGLE_SHEET_ID not set".to_string()));
        }
        if config.access_token.trim().is_empty() {
            return Err(PipelineError::Config("GOOGLE_ACCESS_TOKEN not set".to_string()));
        }

        let api_base = Url::parse(&config.api_base)
            .map_err(|e| PipelineError::Config(format!("Invalid sheets api_base: {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_base,
            spreadsheet_id: config.spreadsheet_id.clone(),
            access_token: config.access_token.clone(),
        })
    }

    fn values_url(&self, range: &str) -> Result<Url> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|()| PipelineError::Config("sheets api_base cannot be a base URL".to_string()))?
            .pop_if_empty()
            .extend(["spreadsheets", self.spreadsheet_id.as_str(), "values", range]);
        Ok(url)
    }

    async fn check(sheet: &str, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND
            || (status == StatusCode::BAD_REQUEST && body.contains("Unable to parse range"))
        {
            return Err(PipelineError::SheetNotFound(sheet.to_string()));
        }
        Err(PipelineError::Sheet(format!("{sheet}: {status}: {body}")))
    }
}

#[async_trait]
impl SheetRepository for GoogleSheetsRepository {
    async fn read_all_rows(&self, sheet: &str) -> Result<SheetValues> {
        let response = self
            .client
            .get(self.values_url(sheet)?)
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        let range: ValueRange = Self::check(sheet, response).await?.json().await?;
        Ok(range.values)
    }

    async fn clear(&self, sheet: &str) -> Result<()> {
        let response = self
            .client
            .post(self.values_url(&format!("{sheet}:clear"))?)
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        Self::check(sheet, response).await?;
        Ok(())
    }

    async fn write_all_rows(&self, sheet: &str, rows: &SheetValues) -> Result<()> {
        let mut url = self.values_url(&format!("{sheet}!A1"))?;
        url.query_pairs_mut().append_pair("valueInputOption", "RAW");
        let response = self
            .client
            .put(url)
            .bearer_auth(&self.access_token)
            .json(&ValueUpdate { values: rows })
            .send()
            .await?;
        Self::check(sheet, response).await?;
        Ok(())
    }
}

/// Open the workbook directory, creating the staging and processed sheets
/// that a fresh CSV workbook lacks. The raw sheet must already exist.
pub async fn open_csv_workbook(dir: &Path) -> Result<CsvWorkbook> {
    let workbook = CsvWorkbook::new(dir);
    workbook.ensure_sheet(STAGING_SHEET).await?;
    workbook.ensure_sheet(PROCESSED_SHEET).await?;
    Ok(workbook)
}
