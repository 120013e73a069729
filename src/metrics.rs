// src/metrics.rs
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub const RUNS_TOTAL: &str = "discovery_runs_total";
pub const PLATFORM_ERRORS_TOTAL: &str = "discovery_platform_errors_total";
pub const TOPICS_FETCHED_TOTAL: &str = "discovery_topics_fetched_total";
pub const EMBEDDING_FALLBACK_TOTAL: &str = "discovery_embedding_fallback_total";
pub const ENRICHMENT_FAILURES_TOTAL: &str = "discovery_enrichment_failures_total";
pub const SEARCH_MS: &str = "discovery_search_ms";

/// One-time metrics registration (so series show up on scrape).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(RUNS_TOTAL, "Completed discovery runs.");
        describe_counter!(
            PLATFORM_ERRORS_TOTAL,
            "Connector calls that failed, timed out or had no connector."
        );
        describe_counter!(TOPICS_FETCHED_TOTAL, "Raw topics returned by connectors.");
        describe_counter!(
            EMBEDDING_FALLBACK_TOTAL,
            "Topics that passed the similarity filter in degraded mode."
        );
        describe_counter!(
            ENRICHMENT_FAILURES_TOTAL,
            "Per-topic briefing failures mapped to empty defaults."
        );
        describe_histogram!(SEARCH_MS, "Wall-clock discovery time in milliseconds.");
    });
}

/// Install the Prometheus recorder. Call once per process.
pub fn install_prometheus() -> anyhow::Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    ensure_metrics_described();
    Ok(handle)
}
