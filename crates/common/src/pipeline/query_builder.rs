//! Topic to arXiv query translation

use super::landmark;
use crate::feed::SearchQuery;

/// Raw candidates fetched per requested result
pub const OVERFETCH_FACTOR: usize = 3;

/// Model abbreviations that search across all fields
const MODEL_ABBREVIATIONS: [&str; 2] = ["bert", "gpt"];

const LANDMARK_EXPRESSION: &str = "ti:\"attention is all you need\" OR ti:transformer OR au:vaswani \
OR all:\"attention mechanism\" OR all:\"self attention\"";

/// A feed query plus whether the landmark seed must be guaranteed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub query: SearchQuery,
    pub seed_fallback: bool,
}

pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the feed query for `topic`, over-fetching `max_results`
    pub fn build(topic: &str, max_results: usize) -> QueryPlan {
        // Quotes would unbalance the feed expression
        let topic = topic.trim().replace('"', "");
        let lower = topic.to_lowercase();
        let limit = max_results.saturating_mul(OVERFETCH_FACTOR);

        if landmark::triggers_seed_fallback(&lower) {
            return QueryPlan {
                query: SearchQuery { expression: LANDMARK_EXPRESSION.to_string(), limit },
                seed_fallback: true,
            };
        }

        let expression = if MODEL_ABBREVIATIONS.iter().any(|name| lower.contains(name)) {
            format!("ti:{topic} OR all:{topic}")
        } else {
            format!("ti:{topic} OR abs:{topic}")
        };

        QueryPlan {
            query: SearchQuery { expression, limit },
            seed_fallback: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_topic_sets_seed_fallback() {
        let plan = QueryBuilder::build("Attention Is All You Need", 5);
        assert!(plan.seed_fallback);
        assert_eq!(plan.query.limit, 15);
        assert!(plan.query.expression.contains("au:vaswani"));
    }

    #[test]
    fn test_model_abbreviation_searches_all_fields() {
        let plan = QueryBuilder::build("BERT", 3);
        assert!(!plan.seed_fallback);
        assert_eq!(plan.query.expression, "ti:BERT OR all:BERT");
        assert_eq!(plan.query.limit, 9);
    }

    #[test]
    fn test_generic_topic_keeps_casing() {
        let plan = QueryBuilder::build("  Graph Neural Networks ", 2);
        assert_eq!(plan.query.expression, "ti:Graph Neural Networks OR abs:Graph Neural Networks");
        assert!(!plan.seed_fallback);
    }

    #[test]
    fn test_quotes_are_stripped() {
        let plan = QueryBuilder::build("\"diffusion\" models", 1);
        assert_eq!(plan.query.expression, "ti:diffusion models OR abs:diffusion models");
    }
}
