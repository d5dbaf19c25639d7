//! PaperScout Common Library
//!
//! Core of the PaperScout service:
//! - Topic to arXiv query translation and relevance ranking
//! - Paper persistence with idempotent upserts
//! - AI summary caching and generative-call orchestration
//! - Error types, configuration, auth and metrics shared with the gateway

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod feed;
pub mod generation;
pub mod history;
pub mod metrics;
pub mod pipeline;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::models::Paper;
pub use errors::{AppError, Result};
pub use feed::{LiteratureFeed, RawResult};
pub use generation::{GenerationParams, TextGenerator};
pub use history::ChatHistorySink;
pub use pipeline::ResearchService;
pub use store::PaperStore;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
