//! Question answering over a single paper

use super::generate_bounded;
use crate::db::models::Paper;
use crate::errors::{AppError, Result};
use crate::generation::{GenerationParams, TextGenerator};
use std::sync::Arc;
use std::time::Duration;

pub struct QaOrchestrator {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl QaOrchestrator {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub fn build_prompt(paper: &Paper, question: &str) -> String {
        format!(
            "You are an expert research assistant. Based on the following research paper content, \
             answer the user's question concisely and clearly.\nPaper:\n\"\"\"{}\"\"\"\nQuestion: {}\nAnswer:",
            paper.best_text(),
            question
        )
    }

    pub async fn answer(&self, paper: &Paper, question: &str) -> Result<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::validation("question", "question is required"));
        }

        let prompt = Self::build_prompt(paper, question);
        generate_bounded(
            self.generator.as_ref(),
            &prompt,
            GenerationParams::ASK,
            "ask",
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
    fn test_prompt_prefers_summary() {
        let mut p = paper("Title", "raw abstract");
        p.ai_summary = Some("cached summary".into());

        let prompt = QaOrchestrator::build_prompt(&p, "What is new?");
        assert!(prompt.contains("\"\"\"cached summary\"\"\""));
        assert!(prompt.ends_with("Question: What is new?\nAnswer:"));
    }

    #[tokio::test]
    async fn test_blank_question_is_rejected() {
        let generator = Arc::new(ScriptedGenerator::new());
        let qa = QaOrchestrator::new(generator.clone(), Duration::from_secs(5));

        let err = qa.answer(&paper("T", "a"), "   ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_surfaces_once() {
        let generator = Arc::new(ScriptedGenerator::failing_on(&[1]));
        let qa = QaOrchestrator::new(generator.clone(), Duration::from_secs(5));

        assert!(qa.answer(&paper("T", "a"), "Why?").await.is_err());
        assert_eq!(generator.calls(), 1);
    }
}
