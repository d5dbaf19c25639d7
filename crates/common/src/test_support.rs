//! Test doubles shared by the unit tests

use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::feed::{LiteratureFeed, RawResult, SearchQuery};
use crate::generation::{GenerationParams, TextGenerator};
use crate::history::{ChatHistorySink, SessionTitle};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

pub fn raw(external_id: Option<&str>, title: &str, abstract_text: &str) -> RawResult {
    RawResult {
        external_id: external_id.map(str::to_string),
        title: title.to_string(),
        abstract_text: abstract_text.to_string(),
        authors: vec!["Test Author".to_string()],
        published_at: None,
        pdf_url: None,
        source_url: None,
    }
}

/// An unsaved paper with no summary
pub fn paper(title: &str, abstract_text: &str) -> Paper {
    let now = Utc::now();
    Paper {
        id: Uuid::new_v4(),
        topic: "test".to_string(),
        external_id: None,
        title: title.to_string(),
        authors: vec![],
        abstract_raw: abstract_text.to_string(),
        abstract_display: abstract_text.to_string(),
        pdf_url: None,
        source_url: None,
        published_at: None,
        ai_summary: None,
        ai_summary_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Generator that answers `generated #N` for call N, failing the listed calls
#[derive(Default)]
pub struct ScriptedGenerator {
    fail_on: Vec<usize>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Calls are numbered from 1
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: calls.to_vec(),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, _params: GenerationParams) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prompts.lock().unwrap().push(prompt.to_string());

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.fail_on.contains(&call) {
            return Err(AppError::GenerationFailed {
                message: format!("scripted failure on call {}", call),
            });
        }
        Ok(format!("generated #{}", call))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Feed returning a fixed result list and remembering the last query
pub struct StaticFeed {
    results: Vec<RawResult>,
    last_query: Mutex<Option<SearchQuery>>,
}

impl StaticFeed {
    pub fn new(results: Vec<RawResult>) -> Self {
        Self {
            results,
            last_query: Mutex::new(None),
        }
    }

    pub fn last_query(&self) -> Option<SearchQuery> {
        self.last_query.lock().unwrap().clone()
    }
}

#[async_trait]
impl LiteratureFeed for StaticFeed {
    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(self.results.iter().take(query.limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

pub struct FailingFeed;

#[async_trait]
impl LiteratureFeed for FailingFeed {
    async fn fetch_raw(&self, _query: &SearchQuery) -> Result<Vec<RawResult>> {
        Err(AppError::FeedUnavailable {
            message: "connection refused".to_string(),
        })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Feed that answers only after `delay`
pub struct SlowFeed {
    pub delay: Duration,
}

#[async_trait]
impl LiteratureFeed for SlowFeed {
    async fn fetch_raw(&self, _query: &SearchQuery) -> Result<Vec<RawResult>> {
        tokio::time::sleep(self.delay).await;
        Ok(vec![raw(Some("2401.00001"), "Late Result", "arrives after the timeout")])
    }

    fn name(&self) -> &str {
        "slow"
    }
}

pub struct FailingHistory;

#[async_trait]
impl ChatHistorySink for FailingHistory {
    async fn append_exchange(
        &self,
        _user_id: &str,
        _user_text: &str,
        _bot_text: &str,
        _title: SessionTitle,
    ) -> Result<()> {
        Err(AppError::Internal {
            message: "history unavailable".to_string(),
        })
    }
}
