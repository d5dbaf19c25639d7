//! Metrics and observability utilities
//!
//! Prometheus-style metrics for the HTTP surface, the literature feed,
//! generative calls and the summary cache.

use metrics::{counter, describe_counter, describe_histogram, gauge, describe_gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all PaperScout metrics
pub const METRICS_PREFIX: &str = "paperscout";

/// Register all metric descriptions
pub fn register_metrics() {
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    describe_counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        Unit::Count,
        "Total topic searches"
    );

    describe_histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "End-to-end topic search latency in seconds"
    );

    describe_gauge!(
        format!("{}_search_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of papers returned by the last search"
    );

    describe_counter!(
        format!("{}_feed_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total literature feed requests"
    );

    describe_histogram!(
        format!("{}_feed_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Literature feed latency in seconds"
    );

    describe_counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total generative service calls"
    );

    describe_histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Generative call latency in seconds"
    );

    describe_counter!(
        format!("{}_summary_cache_total", METRICS_PREFIX),
        Unit::Count,
        "Summary freshness decisions by outcome"
    );

    describe_counter!(
        format!("{}_papers_upserted_total", METRICS_PREFIX),
        Unit::Count,
        "Paper upserts by action"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

pub fn record_search(duration_secs: f64, result_count: usize, summarized: bool) {
    let mode = if summarized { "summarized" } else { "plain" };

    counter!(
        format!("{}_searches_total", METRICS_PREFIX),
        "mode" => mode
    )
    .increment(1);

    histogram!(
        format!("{}_search_duration_seconds", METRICS_PREFIX),
        "mode" => mode
    )
    .record(duration_secs);

    gauge!(format!("{}_search_results_count", METRICS_PREFIX)).set(result_count as f64);
}

pub fn record_feed_fetch(duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_feed_requests_total", METRICS_PREFIX),
        "status" => status
    )
    .increment(1);

    histogram!(format!("{}_feed_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

/// `kind` is one of summarize, compare, ask
pub fn record_generation(kind: &'static str, duration_secs: f64, success: bool) {
    let status = if success { "success" } else { "error" };

    counter!(
        format!("{}_generation_requests_total", METRICS_PREFIX),
        "kind" => kind,
        "status" => status
    )
    .increment(1);

    histogram!(
        format!("{}_generation_duration_seconds", METRICS_PREFIX),
        "kind" => kind
    )
    .record(duration_secs);
}

pub fn record_summary_cache(outcome: &'static str) {
    counter!(
        format!("{}_summary_cache_total", METRICS_PREFIX),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_upsert(created: bool) {
    let action = if created { "created" } else { "updated" };

    counter!(
        format!("{}_papers_upserted_total", METRICS_PREFIX),
        "action" => action
    )
    .increment(1);
}
