//! AI summary freshness policy

use crate::db::models::Paper;
use chrono::{DateTime, Duration, Utc};

/// Age after which a cached summary is regenerated
pub const FRESHNESS_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Where a paper stands with respect to its cached summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryState {
    /// Summary younger than the freshness window
    Fresh,
    /// Summary exists but has aged out
    Stale,
    /// Never summarized
    Missing,
    /// No source text to summarize; passed through untouched
    Unsummarizable,
}

impl SummaryState {
    pub fn needs_generation(self) -> bool {
        matches!(self, SummaryState::Stale | SummaryState::Missing)
    }

    /// Metric label
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryState::Fresh => "fresh",
            SummaryState::Stale => "stale",
            SummaryState::Missing => "missing",
            SummaryState::Unsummarizable => "unsummarizable",
        }
    }
}

pub struct SummaryCache;

impl SummaryCache {
    pub fn freshness_window() -> Duration {
        Duration::seconds(FRESHNESS_WINDOW_SECS)
    }

    /// Summary and timestamp both set, and younger than the window
    pub fn is_fresh(paper: &Paper, now: DateTime<Utc>) -> bool {
        match (&paper.ai_summary, paper.summary_generated_at()) {
            (Some(_), Some(at)) => now - at < Self::freshness_window(),
            _ => false,
        }
    }

    pub fn classify(paper: &Paper, now: DateTime<Utc>) -> SummaryState {
        if Self::is_fresh(paper, now) {
            SummaryState::Fresh
        } else if paper.source_text().is_none() {
            SummaryState::Unsummarizable
        } else if paper.ai_summary.is_some() {
            SummaryState::Stale
        } else {
            SummaryState::Missing
        }
    }
}
