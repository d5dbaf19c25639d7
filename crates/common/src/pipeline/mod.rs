//! Retrieval and summarization pipeline
//!
//! Control flow for a topic search:
//! topic -> QueryBuilder -> feed -> RelevanceScorer -> landmark seed ->
//! PaperStore upsert -> SummaryCache -> SummarizationOrchestrator.
//!
//! Comparison and question answering read from the PaperStore and make a
//! single generative call each.

mod comparison;
mod landmark;
mod qa;
mod query_builder;
mod relevance;
mod service;
mod summarizer;
mod summary_cache;

pub use comparison::ComparisonOrchestrator;
pub use landmark::{landmark_record, LANDMARK_EXTERNAL_ID, LANDMARK_TITLE};
pub use qa::QaOrchestrator;
pub use query_builder::{QueryBuilder, QueryPlan};
pub use relevance::{ensure_landmark, RelevanceScorer, ScoredCandidate};
pub use service::{Comparison, ResearchService, SearchOutcome, SearchRequest};
pub use summarizer::{SummarizationOrchestrator, SummaryRun};
pub use summary_cache::{SummaryCache, SummaryState, FRESHNESS_WINDOW_SECS};

use crate::errors::{AppError, Result};
use crate::generation::{GenerationParams, TextGenerator};
use crate::metrics;
use std::time::{Duration, Instant};

/// One generative call bounded by `timeout`, recorded under `kind`
pub(crate) async fn generate_bounded(
    generator: &dyn TextGenerator,
    prompt: &str,
    params: GenerationParams,
    kind: &'static str,
    timeout: Duration,
) -> Result<String> {
    let start = Instant::now();

    let result = match tokio::time::timeout(timeout, generator.generate(prompt, params)).await {
        Ok(result) => result,
        Err(_) => Err(AppError::GenerationTimeout {
            timeout_ms: timeout.as_millis() as u64,
        }),
    };

    let result = result.and_then(|text| {
        if text.trim().is_empty() {
            Err(AppError::GenerationFailed {
                message: "Generator returned no text".to_string(),
            })
        } else {
            Ok(text)
        }
    });

    metrics::record_generation(kind, start.elapsed().as_secs_f64(), result.is_ok());
    result
}
