//! Shared fakes for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use review_sentiment_pipeline::config::AppConfig;
use review_sentiment_pipeline::error::{PipelineError, Result};
use review_sentiment_pipeline::llm::{CompletionClient, CompletionRequest};
use review_sentiment_pipeline::nlp::ReviewClassifier;
use review_sentiment_pipeline::repository::{SheetRepository, SheetValues};

/// Workbook kept in memory; sheets must be created before use
#[derive(Default)]
pub struct InMemoryWorkbook {
    sheets: Mutex<HashMap<String, SheetValues>>,
    pub writes: AtomicUsize,
}

impl InMemoryWorkbook {
    pub fn with_sheets(names: &[&str]) -> Self {
        let workbook = Self::default();
        for name in names {
            workbook.put(name, Vec::new());
        }
        workbook
    }

    pub fn put(&self, sheet: &str, rows: SheetValues) {
        self.sheets.lock().expect("Failed to lock sheets").insert(sheet.to_string(), rows);
    }

    pub fn get(&self, sheet: &str) -> Option<SheetValues> {
        self.sheets.lock().expect("Failed to lock sheets").get(sheet).cloned()
    }
}

#[async_trait]
impl SheetRepository for InMemoryWorkbook {
    async fn read_all_rows(&self, sheet: &str) -> Result<SheetValues> {
        self.get(sheet).ok_or_else(|| PipelineError::SheetNotFound(sheet.to_string()))
    }

    async fn clear(&self, sheet: &str) -> Result<()> {
        let mut sheets = self.sheets.lock().expect("Failed to lock sheets");
        let rows = sheets.get_mut(sheet).ok_or_else(|| PipelineError::SheetNotFound(sheet.to_string()))?;
        rows.clear();
        Ok(())
    }

    async fn write_all_rows(&self, sheet: &str, rows: &SheetValues) -> Result<()> {
        let mut sheets = self.sheets.lock().expect("Failed to lock sheets");
        let existing = sheets.get_mut(sheet).ok_or_else(|| PipelineError::SheetNotFound(sheet.to_string()))?;
        // Writes start at A1 and overwrite, they do not clear what lies below
        for (i, row) in rows.iter().enumerate() {
            if i < existing.len() {
                existing[i] = row.clone();
            } else {
                existing.push(row.clone());
            }
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Replies by keyword found in the prompt and counts calls
#[derive(Default)]
pub struct KeywordClient {
    calls: Arc<AtomicUsize>,
}

impl KeywordClient {
    /// Shared call counter, readable after the client moves into a classifier
    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CompletionClient for KeywordClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let prompt = request.prompt.to_lowercase();
        let review = prompt
            .split("review to analyze:")
            .nth(1)
            .and_then(|rest| rest.split("remember:").next())
            .unwrap_or_default();
        let reply = if review.contains("love") {
            "SENTIMENT: Positive\nSUMMARY: Customer loves it."
        } else if review.contains("awful") {
            "SENTIMENT: Negative\nSUMMARY: Customer is unhappy."
        } else {
            "SENTIMENT: Neutral\nSUMMARY: Mixed feelings."
        };
        Ok(reply.to_string())
    }
}

/// Returns scripted replies in order, then errors
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self { replies: Mutex::new(replies.into()), calls: Arc::default() }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .expect("Failed to lock replies")
            .pop_front()
            .unwrap_or_else(|| Err(PipelineError::Completion("script exhausted".to_string())))
    }
}

/// Always fails like an unreachable service
pub struct FailingClient;

#[async_trait]
impl CompletionClient for FailingClient {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
        Err(PipelineError::Other("API Error".to_string()))
    }
}

pub fn classifier<C: CompletionClient>(client: C) -> ReviewClassifier<C> {
    ReviewClassifier::new(client, &AppConfig::default().llm).expect("Failed to create classifier")
}

pub fn values(rows: &[&[&str]]) -> SheetValues {
    rows.iter().map(|r| r.iter().map(ToString::to_string).collect()).collect()
}
