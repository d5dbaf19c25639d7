//! Multi-paper comparison

use super::generate_bounded;
use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::generation::{GenerationParams, TextGenerator};
use std::sync::Arc;
use std::time::Duration;

pub struct ComparisonOrchestrator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl ComparisonOrchestrator {
    /// Fewest papers a comparison makes sense for
    pub const MIN_PAPERS: usize = 2;

    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn build_prompt(papers: &[Paper]) -> String {
        let listing = papers
            .iter()
            .enumerate()
            .map(|(i, paper)| format!("{}. Title: {}\nSummary: {}", i + 1, paper.title, paper.best_text()))
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            r#"You are an expert research analyst. Compare these research papers and provide a comprehensive analysis in a natural, conversational tone.

Structure your response as follows:

**Overview:**
Provide a 2-3 sentence overview of how these papers relate to each other and their collective contribution to the field.

**Key Differences:**

For each paper, discuss:
- **Research Focus:** What specific aspect or problem does this paper address?
- **Methodology:** How did the researchers approach their study?
- **Key Findings:** What were the main results or insights?
- **Contributions:** What does this work add to the field?

**Synthesis:**
End with 2-3 sentences that synthesize the papers and highlight their complementary or contrasting perspectives.

Write in a clear, engaging style that would be helpful for someone trying to understand these papers. Avoid technical jargon when possible, and make the comparison accessible.

Papers to compare:
{listing}"#
        )
    }

    /// One generative call over all papers; the narrative is returned verbatim
    pub async fn compare(&self, papers: &[Paper]) -> Result<String> {
        if papers.len() < Self::MIN_PAPERS {
            return Err(AppError::InsufficientPapers {
                found: papers.len(),
                required: Self::MIN_PAPERS,
            });
        }

        let prompt = Self::build_prompt(papers);
        generate_bounded(
            self.generator.as_ref(),
            &prompt,
            GenerationParams::COMPARE,
            "compare",
            self.timeout,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{paper, ScriptedGenerator};

    #[test]
    fn test_prompt_numbers_papers_in_order() {
        let mut first = paper("First", "first abstract");
        first.ai_summary = Some("first summary".into());
        let second = paper("Second", "second abstract");

        let prompt = ComparisonOrchestrator::build_prompt(&[first, second]);
        let one = prompt.find("1. Title: First\nSummary: first summary").unwrap();
        let two = prompt.find("2. Title: Second\nSummary: second abstract").unwrap();
        assert!(one < two);
    }

    #[tokio::test]
    async fn test_single_paper_makes_no_call() {
        let generator = Arc::new(ScriptedGenerator::new());
        let orchestrator = ComparisonOrchestrator::new(generator.clone(), Duration::from_secs(5));

        let err = orchestrator.compare(&[paper("Only", "abstract")]).await.unwrap_err();
        assert!(matches!(err, AppError::InsufficientPapers { found: 1, required: 2 }));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_all_or_nothing() {
        let generator = Arc::new(ScriptedGenerator::failing_on(&[1]));
        let orchestrator = ComparisonOrchestrator::new(generator.clone(), Duration::from_secs(5));

        let result = orchestrator.compare(&[paper("A", "a"), paper("B", "b")]).await;
        assert!(matches!(result, Err(AppError::GenerationFailed { .. })));
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_narrative_is_verbatim() {
        let generator = Arc::new(ScriptedGenerator::new());
        let orchestrator = ComparisonOrchestrator::new(generator, Duration::from_secs(5));

        let narrative = orchestrator.compare(&[paper("A", "a"), paper("B", "b")]).await.unwrap();
        assert_eq!(narrative, "generated #1");
    }
}
