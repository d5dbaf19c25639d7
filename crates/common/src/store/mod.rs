//! Paper store
//!
//! Narrow persistence contract used by the pipeline. Rows are keyed by
//! external id when the feed supplies one, else by exact title, so
//! re-discovering a paper never creates a second row.

use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::feed::RawResult;
use crate::metrics;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for paper persistence
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Insert or refresh the row for a candidate and return the stored record
    async fn upsert(&self, candidate: &RawResult, topic: &str) -> Result<Paper>;

    /// Existing papers for `ids`, in request order; unknown ids are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Paper>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>>;

    /// Set both summary fields together
    async fn save_summary(&self, id: Uuid, summary: &str, at: DateTime<Utc>) -> Result<()>;
}

/// Build a fresh row for a first discovery
pub(crate) fn new_paper(candidate: &RawResult, topic: &str, now: DateTime<Utc>) -> Paper {
    Paper {
        id: Uuid::now_v7(),
        topic: topic.to_string(),
        external_id: candidate.external_id.clone(),
        title: candidate.title.clone(),
        authors: candidate.authors.clone(),
        abstract_raw: candidate.abstract_text.clone(),
        abstract_display: candidate.abstract_text.clone(),
        pdf_url: candidate.pdf_url.clone(),
        source_url: candidate.source_url.clone(),
        published_at: candidate.published_at.map(Into::into),
        ai_summary: None,
        ai_summary_at: None,
        created_at: now.into(),
        updated_at: now.into(),
    }
}

/// Apply a re-discovery to an existing row.
///
/// Summary fields, `created_at` and a non-empty `abstract_raw` are kept.
pub(crate) fn refresh_paper(paper: &mut Paper, candidate: &RawResult, topic: &str, now: DateTime<Utc>) {
    paper.topic = topic.to_string();
    paper.title = candidate.title.clone();
    paper.authors = candidate.authors.clone();
    paper.abstract_display = candidate.abstract_text.clone();
    paper.pdf_url = candidate.pdf_url.clone();
    paper.source_url = candidate.source_url.clone();
    paper.published_at = candidate.published_at.map(Into::into);
    if paper.abstract_raw.trim().is_empty() {
        paper.abstract_raw = candidate.abstract_text.clone();
    }
    if paper.external_id.is_none() {
        paper.external_id = candidate.external_id.clone();
    }
    paper.updated_at = now.into();
}

/// Process-local store for tests and development
#[derive(Default)]
pub struct InMemoryPaperStore {
    papers: RwLock<HashMap<Uuid, Paper>>,
}

impl InMemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.papers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.papers.read().await.is_empty()
    }
}

#[async_trait]
impl PaperStore for InMemoryPaperStore {
    async fn upsert(&self, candidate: &RawResult, topic: &str) -> Result<Paper> {
        let now = Utc::now();
        let mut papers = self.papers.write().await;

        let existing = papers.values_mut().find(|paper| match &candidate.external_id {
            Some(external_id) => paper.external_id.as_deref() == Some(external_id.as_str()),
            None => paper.title == candidate.title,
        });

        if let Some(paper) = existing {
            refresh_paper(paper, candidate, topic, now);
            metrics::record_upsert(false);
            return Ok(paper.clone());
        }

        let paper = new_paper(candidate, topic, now);
        papers.insert(paper.id, paper.clone());
        metrics::record_upsert(true);
        Ok(paper)
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Paper>> {
        let papers = self.papers.read().await;
        Ok(ids.iter().filter_map(|id| papers.get(id).cloned()).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        Ok(self.papers.read().await.get(&id).cloned())
    }

    async fn save_summary(&self, id: Uuid, summary: &str, at: DateTime<Utc>) -> Result<()> {
        let mut papers = self.papers.write().await;
        let paper = papers
            .get_mut(&id)
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;

        paper.ai_summary = Some(summary.to_string());
        paper.ai_summary_at = Some(at.into());
        paper.updated_at = Utc::now().into();
        Ok(())
    }
}
