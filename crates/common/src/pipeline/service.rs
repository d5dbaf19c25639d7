//! Research service
//!
//! Wires the feed, scorer, store, cache and orchestrators into the three
//! user-facing operations: topic search, comparison and question answering.

use super::{
    ensure_landmark, ComparisonOrchestrator, QaOrchestrator, QueryBuilder, RelevanceScorer,
    SummarizationOrchestrator, SummaryCache,
};
use crate::config::AppConfig;
use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::feed::{LiteratureFeed, RawResult, SearchQuery};
use crate::generation::TextGenerator;
use crate::history::{ChatHistorySink, SessionTitle};
use crate::metrics;
use crate::store::PaperStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use uuid::Uuid;

/// A topic search as requested by a user
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub user_id: String,
    pub topic: String,
    /// Falls back to the configured default when absent
    pub max_results: Option<usize>,
    pub summarize: bool,
}

impl SearchRequest {
    pub fn new(user_id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            topic: topic.into(),
            max_results: None,
            summarize: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub topic: String,
    /// Persisted papers in ranked order
    pub papers: Vec<Paper>,
    /// Chat reply recorded in the user's history
    pub reply: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comparison {
    pub narrative: String,
    pub papers: Vec<Paper>,
}

pub struct ResearchService {
    feed: Arc<dyn LiteratureFeed>,
    store: Arc<dyn PaperStore>,
    history: Arc<dyn ChatHistorySink>,
    summarizer: SummarizationOrchestrator,
    comparer: ComparisonOrchestrator,
    qa: QaOrchestrator,
    feed_timeout: Duration,
    default_max_results: usize,
    max_results_cap: usize,
}

impl ResearchService {
    pub fn new(
        feed: Arc<dyn LiteratureFeed>,
        store: Arc<dyn PaperStore>,
        generator: Arc<dyn TextGenerator>,
        history: Arc<dyn ChatHistorySink>,
        config: &AppConfig,
    ) -> Self {
        let generation_timeout = config.generation.timeout();

        Self {
            summarizer: SummarizationOrchestrator::new(generator.clone(), store.clone(), generation_timeout)
                .with_budget(config.summary_budget()),
            comparer: ComparisonOrchestrator::new(generator.clone(), generation_timeout),
            qa: QaOrchestrator::new(generator, generation_timeout),
            feed,
            store,
            history,
            feed_timeout: config.feed.timeout(),
            default_max_results: config.feed.default_max_results,
            max_results_cap: config.feed.max_results_cap,
        }
    }

    fn validate_topic(topic: &str) -> Result<&str> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(AppError::validation("topic", "topic is required"));
        }
        Ok(topic)
    }

    fn resolve_max_results(&self, requested: Option<usize>) -> Result<usize> {
        let n = requested.unwrap_or(self.default_max_results);
        if n == 0 || n > self.max_results_cap {
            return Err(AppError::validation(
                "maxResults",
                format!("maxResults must be between 1 and {}", self.max_results_cap),
            ));
        }
        Ok(n)
    }

    async fn fetch_feed(&self, query: &SearchQuery) -> Result<Vec<RawResult>> {
        let start = Instant::now();

        let result = match tokio::time::timeout(self.feed_timeout, self.feed.fetch_raw(query)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::FeedTimeout {
                timeout_ms: self.feed_timeout.as_millis() as u64,
            }),
        };

        metrics::record_feed_fetch(start.elapsed().as_secs_f64(), result.is_ok());
        result
    }

    /// Query, score and seed; `topic` is already validated
    async fn ranked_candidates(&self, topic: &str, n: usize) -> Result<Vec<RawResult>> {
        let plan = QueryBuilder::build(topic, n);
        let raw = self.fetch_feed(&plan.query).await?;
        let fetched = raw.len();

        let ranked: Vec<RawResult> = RelevanceScorer::rank(topic, raw, n)
            .into_iter()
            .map(|scored| scored.candidate)
            .collect();

        let ranked = if plan.seed_fallback { ensure_landmark(ranked, n) } else { ranked };

        info!(
            topic = %topic,
            feed = self.feed.name(),
            fetched,
            kept = ranked.len(),
            seed_fallback = plan.seed_fallback,
            "Candidates ranked"
        );

        Ok(ranked)
    }

    /// Ranked feed results without persistence or summaries
    pub async fn fetch(&self, topic: &str, max_results: Option<usize>) -> Result<Vec<RawResult>> {
        let topic = Self::validate_topic(topic)?;
        let n = self.resolve_max_results(max_results)?;
        self.ranked_candidates(topic, n).await
    }

    /// Full search: rank, persist, summarize what is stale, record the exchange
    pub async fn search(&self, request: SearchRequest) -> Result<SearchOutcome> {
        let start = Instant::now();
        let topic = Self::validate_topic(&request.topic)?.to_string();
        let n = self.resolve_max_results(request.max_results)?;

        let candidates = self.ranked_candidates(&topic, n).await?;

        // Candidates that resolve to one row keep their first rank position
        let mut papers = Vec::with_capacity(candidates.len());
        let mut seen = HashSet::new();
        for candidate in &candidates {
            let paper = self.store.upsert(candidate, &topic).await?;
            if seen.insert(paper.id) {
                papers.push(paper);
            }
        }

        if request.summarize {
            papers = self.refresh_summaries(papers).await;
        }

        let reply = Self::compose_reply(&topic, &papers, request.summarize);

        if let Err(e) = self
            .history
            .append_exchange(
                &request.user_id,
                &format!("Find papers on {}", topic),
                &reply,
                SessionTitle::FromMessage,
            )
            .await
        {
            warn!(user_id = %request.user_id, error = %e, "Failed to record search in chat history");
        }

        let elapsed = start.elapsed();
        metrics::record_search(elapsed.as_secs_f64(), papers.len(), request.summarize);
        info!(
            topic = %topic,
            results = papers.len(),
            latency_ms = elapsed.as_millis() as u64,
            "Search complete"
        );

        Ok(SearchOutcome { topic, papers, reply })
    }

    /// Send stale and missing summaries through the orchestrator, keep order
    async fn refresh_summaries(&self, papers: Vec<Paper>) -> Vec<Paper> {
        let now = Utc::now();

        let pending: Vec<Paper> = papers
            .iter()
            .filter(|paper| {
                let state = SummaryCache::classify(paper, now);
                metrics::record_summary_cache(state.as_str());
                state.needs_generation()
            })
            .cloned()
            .collect();

        if pending.is_empty() {
            return papers;
        }

        let run = self.summarizer.summarize_all(pending).await;
        if run.skipped > 0 {
            warn!(
                generated = run.generated,
                failed = run.failed,
                skipped = run.skipped,
                "Summary budget ran out before every paper was summarized"
            );
        }
        let mut updated: HashMap<Uuid, Paper> =
            run.papers.into_iter().map(|paper| (paper.id, paper)).collect();

        papers
            .into_iter()
            .map(|paper| updated.remove(&paper.id).unwrap_or(paper))
            .collect()
    }

    fn compose_reply(topic: &str, papers: &[Paper], summarized: bool) -> String {
        if !summarized {
            return format!("Found {} papers on \"{}\".", papers.len(), topic);
        }

        let findings = papers
            .iter()
            .map(|paper| format!("**{}**\n{}", paper.title, paper.best_text()))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "I found {} research papers on \"{}\". Here are the key findings:\n\n{}",
            papers.len(),
            topic,
            findings
        )
    }

    pub async fn get_paper(&self, id: Uuid) -> Result<Paper> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })
    }

    pub async fn compare(&self, ids: &[Uuid]) -> Result<Comparison> {
        let min = ComparisonOrchestrator::MIN_PAPERS;

        let mut seen = HashSet::new();
        let unique: Vec<Uuid> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if unique.len() < min {
            return Err(AppError::validation(
                "ids",
                format!("Provide at least {} distinct paper ids", min),
            ));
        }

        let papers = self.store.find_by_ids(&unique).await?;
        if papers.len() < min {
            return Err(AppError::InsufficientPapers {
                found: papers.len(),
                required: min,
            });
        }

        let narrative = self.comparer.compare(&papers).await?;
        info!(papers = papers.len(), "Comparison generated");

        Ok(Comparison { narrative, papers })
    }

    pub async fn ask(&self, user_id: &str, paper_id: Uuid, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::validation("question", "question is required"));
        }

        let paper = self.get_paper(paper_id).await?;
        let answer = self.qa.answer(&paper, question).await?;

        if let Err(e) = self
            .history
            .append_exchange(user_id, question, &answer, SessionTitle::NewChat)
            .await
        {
            warn!(user_id = %user_id, error = %e, "Failed to record answer in chat history");
        }

        Ok(answer)
    }
}
