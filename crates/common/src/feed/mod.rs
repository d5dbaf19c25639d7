//! Literature feed abstraction
//!
//! The feed turns a structured search expression into a flat list of raw
//! paper records. The only implementation talks to the arXiv Atom API.

mod arxiv;

pub use arxiv::{parse_atom_feed, ArxivClient};

use crate::errors::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A paper as delivered by the feed, before scoring or persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawResult {
    /// Stable feed identifier (arXiv id without version)
    pub external_id: Option<String>,
    pub title: String,
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub pdf_url: Option<String>,
    pub source_url: Option<String>,
}

/// Structured query handed to the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Feed-native boolean expression, e.g. `ti:bert OR all:bert`
    pub expression: String,

    /// Number of raw candidates to request
    pub limit: usize,
}

/// Trait for literature feed clients
#[async_trait]
pub trait LiteratureFeed: Send + Sync {
    /// Run a query and return raw results in feed order
    async fn fetch_raw(&self, query: &SearchQuery) -> Result<Vec<RawResult>>;

    /// Feed name for logs
    fn name(&self) -> &str;
}
