//! Landmark paper seed
//!
//! "Attention Is All You Need" is guaranteed to surface for transformer
//! and attention queries even when the live feed omits it. The record is
//! plain data; the predicates below decide when it applies.

use crate::feed::RawResult;
use chrono::{TimeZone, Utc};

pub const LANDMARK_EXTERNAL_ID: &str = "1706.03762";
pub const LANDMARK_TITLE: &str = "Attention Is All You Need";

const LANDMARK_AUTHORS: [&str; 8] = [
    "Ashish Vaswani",
    "Noam Shazeer",
    "Niki Parmar",
    "Jakob Uszkoreit",
    "Llion Jones",
    "Aidan N. Gomez",
    "Łukasz Kaiser",
    "Illia Polosukhin",
];

const LANDMARK_ABSTRACT: &str = "The dominant sequence transduction models are based on complex \
recurrent or convolutional neural networks in an encoder-decoder configuration. The best performing \
models also connect the encoder and decoder through an attention mechanism. We propose a new simple \
network architecture, the Transformer, based solely on attention mechanisms, dispensing with \
recurrence and convolutions entirely. Experiments on two machine translation tasks show that these \
models are superior in quality while being more parallelizable and requiring significantly less time \
to train. Our model achieves 28.4 BLEU on the WMT 2014 English-to-German translation task, improving \
over the existing best results, including ensembles, by over 2 BLEU. On the WMT 2014 English-to-French \
translation task, our model establishes a new single-model state-of-the-art BLEU score of 41.8 after \
training for 3.5 days on eight GPUs, a small fraction of the training costs of the best models from \
the literature. We show that the Transformer generalizes well to other tasks by applying it \
successfully to English constituency parsing with large amounts of training data.";

const LANDMARK_AUTHOR_SURNAME: &str = "vaswani";

/// Lower-case topic fragments that put a search in seed-fallback mode
const TOPIC_TRIGGERS: [&str; 4] = [
    "attention is all you need",
    "transformer",
    LANDMARK_AUTHOR_SURNAME,
    "attention mechanism",
];

/// Domain keyword for the scoring bonus
const DOMAIN_KEYWORD: &str = "attention";

/// Architecture the landmark introduced
const ARCHITECTURE_TERM: &str = "transformer";

/// The canonical landmark record
pub fn landmark_record() -> RawResult {
    RawResult {
        external_id: Some(LANDMARK_EXTERNAL_ID.to_string()),
        title: LANDMARK_TITLE.to_string(),
        abstract_text: LANDMARK_ABSTRACT.to_string(),
        authors: LANDMARK_AUTHORS.iter().map(|a| a.to_string()).collect(),
        published_at: Utc.with_ymd_and_hms(2017, 6, 12, 0, 0, 0).single(),
        pdf_url: Some(format!("https://arxiv.org/pdf/{}.pdf", LANDMARK_EXTERNAL_ID)),
        source_url: Some(format!("https://arxiv.org/abs/{}", LANDMARK_EXTERNAL_ID)),
    }
}

/// Whether a lower-cased topic asks for the landmark domain
pub fn triggers_seed_fallback(topic_lower: &str) -> bool {
    TOPIC_TRIGGERS.iter().any(|trigger| topic_lower.contains(trigger))
}

/// Whether a candidate is the landmark paper itself
pub fn is_landmark(candidate: &RawResult) -> bool {
    candidate.external_id.as_deref() == Some(LANDMARK_EXTERNAL_ID)
        || candidate
            .title
            .to_lowercase()
            .contains(&LANDMARK_TITLE.to_lowercase())
        || candidate
            .authors
            .iter()
            .any(|author| author.to_lowercase().contains(LANDMARK_AUTHOR_SURNAME))
}

/// Domain bonus predicate, inputs already lower-cased
pub fn in_landmark_domain(topic_lower: &str, title_lower: &str, abstract_lower: &str) -> bool {
    topic_lower.contains(DOMAIN_KEYWORD)
        && (title_lower.contains(ARCHITECTURE_TERM)
            || title_lower.contains(DOMAIN_KEYWORD)
            || abstract_lower.contains(ARCHITECTURE_TERM))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_matches_itself() {
        let record = landmark_record();
        assert!(is_landmark(&record));
        assert_eq!(record.authors.len(), 8);
        assert!(record.published_at.is_some());
    }

    #[test]
    fn test_triggers() {
        assert!(triggers_seed_fallback("vision transformers"));
        assert!(triggers_seed_fallback("the attention mechanism in nlp"));
        assert!(triggers_seed_fallback("vaswani"));
        assert!(!triggers_seed_fallback("self attention"));
        assert!(!triggers_seed_fallback("graph neural networks"));
    }

    #[test]
    fn test_author_match_identifies_landmark() {
        let candidate = RawResult {
            external_id: None,
            title: "Some Other Title".into(),
            abstract_text: String::new(),
            authors: vec!["A. Vaswani".into()],
            published_at: None,
            pdf_url: None,
            source_url: None,
        };
        assert!(is_landmark(&candidate));
    }

    #[test]
    fn test_domain_bonus_needs_attention_topic() {
        assert!(in_landmark_domain("sparse attention", "efficient transformers", ""));
        assert!(in_landmark_domain("attention", "a survey", "we use a transformer"));
        assert!(!in_landmark_domain("transformers", "efficient transformers", ""));
        assert!(!in_landmark_domain("attention", "graph networks", "message passing"));
    }
}
