// Prometheus metrics registry and collectors

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec_with_registry, register_gauge_vec_with_registry,
    register_gauge_with_registry, register_histogram_vec_with_registry, CounterVec, Encoder,
    Gauge, GaugeVec, HistogramVec, Opts, Registry, TextEncoder,
};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // ============================================================================
    // REQUEST METRICS
    // ============================================================================

    /// Total number of API requests
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec_with_registry!(
        Opts::new("requests_total", "Total number of API requests"),
        &["endpoint", "status_code"],
        REGISTRY
    ).unwrap();

    /// Request duration histogram
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec_with_registry!(
        prometheus::HistogramOpts::new("request_duration_seconds", "Request duration in seconds")
            .buckets(vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]),
        &["endpoint"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // CACHE METRICS
    // ============================================================================

    /// Cache operations
    pub static ref CACHE_OPERATIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("cache_operations_total", "Total cache operations"),
        &["operation"], // operation: hit, miss, expired, eviction
        REGISTRY
    ).unwrap();

    /// Current cache entries
    pub static ref CACHE_ENTRIES: Gauge = register_gauge_with_registry!(
        Opts::new("cache_entries_current", "Current number of cache entries"),
        REGISTRY
    ).unwrap();

    /// Current runtime policy of the cache
    pub static ref CACHE_POLICY_STATE: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("cache_policy_state", "Current cache policy fields"),
        &["field"], // field: enabled, ttl_seconds
        REGISTRY
    ).unwrap();

    // ============================================================================
    // POLICY METRICS
    // ============================================================================

    /// Decisions produced by the policy agent
    pub static ref POLICY_DECISIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("policy_decisions_total", "Total policy decisions"),
        &["decision"],
        REGISTRY
    ).unwrap();

    /// Decisions that actually changed the cache policy
    pub static ref POLICY_TRANSITIONS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("policy_transitions_total", "Total cache policy transitions"),
        &["decision"],
        REGISTRY
    ).unwrap();

    // ============================================================================
    // RISK METRICS
    // ============================================================================

    /// Latest risk signals fed to the agent
    pub static ref RISK_SIGNAL: GaugeVec = register_gauge_vec_with_registry!(
        Opts::new("risk_signal", "Latest risk signal values"),
        &["signal"], // signal: correctness_risk, drift_score
        REGISTRY
    ).unwrap();

    /// Embedding divergence audits
    pub static ref EMBEDDING_AUDITS: CounterVec = register_counter_vec_with_registry!(
        Opts::new("embedding_audits_total", "Total cached-vs-fresh embedding audits"),
        &["kind"], // kind: sampled, shadow
        REGISTRY
    ).unwrap();
}

/// Gather all metrics and return as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        // Vec collectors only show up once a label set has been touched
        REQUESTS_TOTAL.with_label_values(&["/predict", "200"]).inc();
        CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
        POLICY_DECISIONS.with_label_values(&["NORMAL"]).inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("requests_total"));
        assert!(metrics.contains("cache_operations_total"));
        assert!(metrics.contains("policy_decisions_total"));
        assert!(metrics.contains("cache_entries_current"));
    }
}
