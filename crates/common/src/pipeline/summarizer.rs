//! Sequential per-paper summarization
//!
//! Generative calls are issued one at a time through a single-slot
//! semaphore, so the service never sees concurrent summary requests from
//! one orchestrator even when callers share it across tasks. A failed
//! paper keeps its previous summary and the batch moves on. With a budget
//! set, papers still waiting when it runs out are returned unsummarized.

use super::generate_bounded;
use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::generation::{GenerationParams, TextGenerator};
use crate::store::PaperStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Result of one summarization pass
#[derive(Debug, Clone)]
pub struct SummaryRun {
    /// Input papers in input order, with new summaries applied
    pub papers: Vec<Paper>,
    pub generated: usize,
    pub failed: usize,
    /// Not attempted because the budget ran out
    pub skipped: usize,
}

pub struct SummarizationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn PaperStore>,
    timeout: Duration,
    budget: Option<Duration>,
    slot: Semaphore,
}

impl SummarizationOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, store: Arc<dyn PaperStore>, timeout: Duration) -> Self {
        Self {
            generator,
            store,
            timeout,
            budget: None,
            slot: Semaphore::new(1),
        }
    }

    /// Cap the wall time of one `summarize_all` pass
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn build_prompt(text: &str) -> String {
        format!(
            r#"You are an expert research analyst. Summarize the following research paper in a clear, natural language format. Focus on the key points and make it easy to understand.

Write a concise summary that includes:
- What the research is about
- The main problem or question being addressed
- The approach or methodology used
- Key findings or results
- Any important limitations or future work

Keep it conversational and easy to read, like you're explaining it to someone who wants to understand the research quickly.

Research paper text:
"""{text}"""

Summary:"#
        )
    }

    /// Summarize each paper in order and persist the ones that changed
    pub async fn summarize_all(&self, papers: Vec<Paper>) -> SummaryRun {
        let mut run = SummaryRun {
            papers: Vec::with_capacity(papers.len()),
            generated: 0,
            failed: 0,
            skipped: 0,
        };
        let mut changed = Vec::new();
        let deadline = self.budget.map(|budget| Instant::now() + budget);

        for mut paper in papers {
            if paper.source_text().is_none() {
                debug!(paper_id = %paper.id, "No source text, skipping summary");
                run.papers.push(paper);
                continue;
            }

            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!(paper_id = %paper.id, "Summary budget spent, skipping");
                run.skipped += 1;
                run.papers.push(paper);
                continue;
            }

            match self.summarize_one(&paper, deadline).await {
                Ok(summary) => {
                    let at = Utc::now();
                    paper.ai_summary = Some(summary);
                    paper.ai_summary_at = Some(at.into());
                    changed.push(run.papers.len());
                    run.generated += 1;
                }
                Err(e) => {
                    warn!(
                        paper_id = %paper.id,
                        title = %paper.title,
                        error = %e,
                        "Summary generation failed, keeping previous summary"
                    );
                    run.failed += 1;
                }
            }
            run.papers.push(paper);
        }

        for idx in changed {
            let paper = &run.papers[idx];
            let (Some(summary), Some(at)) = (paper.ai_summary.as_deref(), paper.summary_generated_at()) else {
                continue;
            };
            if let Err(e) = self.store.save_summary(paper.id, summary, at).await {
                warn!(paper_id = %paper.id, error = %e, "Failed to persist summary");
            }
        }

        run
    }

    async fn summarize_one(&self, paper: &Paper, deadline: Option<Instant>) -> Result<String> {
        let text = paper.source_text().unwrap_or_default();
        let prompt = Self::build_prompt(text);

        let acquire = self.slot.acquire();
        let permit = match deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, acquire)
                .await
                .map_err(|_| AppError::GenerationTimeout {
                    timeout_ms: self.budget.unwrap_or_default().as_millis() as u64,
                })?,
            None => acquire.await,
        };
        let _permit = permit.map_err(|_| AppError::Internal {
            message: "Summarization slot closed".to_string(),
        })?;

        let timeout = match deadline {
            Some(deadline) => self.timeout.min(deadline.saturating_duration_since(Instant::now())),
            None => self.timeout,
        };

        generate_bounded(
            self.generator.as_ref(),
            &prompt,
            GenerationParams::SUMMARIZE,
            "summarize",
            timeout,
        )
        .await
    }
}
