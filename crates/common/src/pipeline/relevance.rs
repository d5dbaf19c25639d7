//! Relevance scoring of raw feed results
//!
//! The feed's own ordering is unreliable for short queries, so candidates
//! are re-scored with additive keyword weights:
//!
//! | signal                                   | weight |
//! |------------------------------------------|--------|
//! | candidate is the landmark paper          | 15     |
//! | title contains the full topic            | 10     |
//! | landmark-domain topic, architecture term | 5      |
//! | topic term in title (each)               | 3      |
//! | topic term in abstract (each)            | 1      |

use super::landmark;
use crate::feed::RawResult;

const LANDMARK_BONUS: u32 = 15;
const EXACT_TITLE_MATCH: u32 = 10;
const DOMAIN_BONUS: u32 = 5;
const TITLE_TERM: u32 = 3;
const ABSTRACT_TERM: u32 = 1;

/// A raw result with its transient score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredCandidate {
    pub candidate: RawResult,
    pub relevance_score: u32,
}

pub struct RelevanceScorer;

impl RelevanceScorer {
    /// Score one candidate against a topic
    pub fn score(topic: &str, candidate: &RawResult) -> u32 {
        let topic_lower = topic.trim().to_lowercase();
        let title = candidate.title.to_lowercase();
        let abstract_text = candidate.abstract_text.to_lowercase();

        let mut score = 0;

        if !topic_lower.is_empty() && title.contains(&topic_lower) {
            score += EXACT_TITLE_MATCH;
        }

        for term in topic_lower.split_whitespace() {
            if title.contains(term) {
                score += TITLE_TERM;
            }
            if abstract_text.contains(term) {
                score += ABSTRACT_TERM;
            }
        }

        if landmark::in_landmark_domain(&topic_lower, &title, &abstract_text) {
            score += DOMAIN_BONUS;
        }

        if landmark::is_landmark(candidate) {
            score += LANDMARK_BONUS;
        }

        score
    }

    /// Drop zero-score noise, order by score (feed order on ties), keep `n`
    pub fn rank(topic: &str, candidates: Vec<RawResult>, n: usize) -> Vec<ScoredCandidate> {
        let mut scored: Vec<ScoredCandidate> = candidates
            .into_iter()
            .map(|candidate| ScoredCandidate {
                relevance_score: Self::score(topic, &candidate),
                candidate,
            })
            .filter(|scored| scored.relevance_score > 0)
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        scored.truncate(n);
        scored
    }
}

/// Prepend the landmark seed when it is missing, keeping at most `n`
pub fn ensure_landmark(mut ranked: Vec<RawResult>, n: usize) -> Vec<RawResult> {
    if !ranked.iter().any(landmark::is_landmark) {
        ranked.insert(0, landmark::landmark_record());
        ranked.truncate(n);
    }
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: &str, abstract_text: &str) -> RawResult {
        RawResult {
            external_id: None,
            title: title.to_string(),
            abstract_text: abstract_text.to_string(),
            authors: vec![],
            published_at: None,
            pdf_url: None,
            source_url: None,
        }
    }

    #[test]
    fn test_score_weights() {
        // full title match + two title terms + one abstract term
        let candidate = raw("Graph Networks at Scale", "We study graph methods");
        assert_eq!(RelevanceScorer::score("graph networks", &candidate), 10 + 3 + 3 + 1);

        assert_eq!(RelevanceScorer::score("quantum", &candidate), 0);
    }

    #[test]
    fn test_repeated_spaces_do_not_match_everything() {
        let candidate = raw("Unrelated", "Nothing here");
        assert_eq!(RelevanceScorer::score("protein  folding", &candidate), 0);
    }

    #[test]
    fn test_rank_orders_filters_and_truncates() {
        let candidates = vec![
            raw("Cooking", "recipes"),
            raw("Diffusion", "a diffusion model"),
            raw("Diffusion Models Beat GANs", "diffusion models"),
            raw("Other", "mentions diffusion once"),
            raw("Diffusion", "a diffusion model"),
        ];

        let ranked = RelevanceScorer::rank("diffusion models", candidates, 3);

        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|c| c.relevance_score > 0));
        assert!(ranked.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
        assert_eq!(ranked[0].candidate.title, "Diffusion Models Beat GANs");
    }

    #[test]
    fn test_ties_keep_feed_order() {
        let mut first = raw("Rust", "");
        first.source_url = Some("first".into());
        let mut second = raw("Rust", "");
        second.source_url = Some("second".into());

        let ranked = RelevanceScorer::rank("rust", vec![first, second], 2);
        assert_eq!(ranked[0].candidate.source_url.as_deref(), Some("first"));
        assert_eq!(ranked[1].candidate.source_url.as_deref(), Some("second"));
    }

    #[test]
    fn test_landmark_dominates() {
        let landmark = landmark::landmark_record();
        let other = raw("Attention Mechanism Survey", "attention mechanism");
        let ranked = RelevanceScorer::rank("attention mechanism", vec![other, landmark], 2);
        assert_eq!(ranked[0].candidate.title, landmark::LANDMARK_TITLE);
    }

    #[test]
    fn test_ensure_landmark_survives_truncation() {
        let ranked = vec![raw("Vision Transformers", ""), raw("Efficient Transformers", "")];
        let seeded = ensure_landmark(ranked, 1);
        assert_eq!(seeded.len(), 1);
        assert_eq!(seeded[0].title, landmark::LANDMARK_TITLE);

        let seeded = ensure_landmark(Vec::new(), 5);
        assert_eq!(seeded.len(), 1);
    }

    #[test]
    fn test_ensure_landmark_keeps_existing() {
        let ranked = vec![raw("Vision Transformers", ""), landmark::landmark_record()];
        let seeded = ensure_landmark(ranked.clone(), 2);
        assert_eq!(seeded, ranked);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const WORDS: &[&str] = &[
            "graph", "neural", "networks", "attention", "transformer",
            "diffusion", "protein", "folding", "quantum", "rust",
        ];

        fn text(max_words: usize) -> impl Strategy<Value = String> {
            prop_oneof![
                proptest::collection::vec(proptest::sample::select(WORDS), 0..max_words)
                    .prop_map(|words| words.join(" ")),
                "[a-zA-Z ]{0,24}",
            ]
        }

        fn results() -> impl Strategy<Value = Vec<RawResult>> {
            proptest::collection::vec((text(6), text(12)), 0..12).prop_map(|pairs| {
                pairs
                    .into_iter()
                    .map(|(title, abstract_text)| raw(&title, &abstract_text))
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn prop_rank_is_sorted_nonzero_and_bounded(
                topic in text(3),
                candidates in results(),
                n in 1usize..8,
            ) {
                let ranked = RelevanceScorer::rank(&topic, candidates, n);

                prop_assert!(ranked.len() <= n);
                prop_assert!(ranked.iter().all(|c| c.relevance_score > 0));
                prop_assert!(ranked.windows(2).all(|w| w[0].relevance_score >= w[1].relevance_score));
            }

            #[test]
            fn prop_landmark_holds_the_single_slot(topic in text(3), candidates in results()) {
                let ranked: Vec<RawResult> = RelevanceScorer::rank(&topic, candidates, 1)
                    .into_iter()
                    .map(|scored| scored.candidate)
                    .collect();

                let seeded = ensure_landmark(ranked, 1);

                prop_assert_eq!(seeded.len(), 1);
                prop_assert!(landmark::is_landmark(&seeded[0]));
            }
        }
    }
}
