// Metrics module: Prometheus collectors, latency percentiles and risk signals

pub mod latency;
mod registry;
pub mod risk;

pub use latency::{LatencySummary, LatencyTracker};
pub use registry::{
    gather_metrics,
    CACHE_ENTRIES,
    CACHE_OPERATIONS,
    CACHE_POLICY_STATE,
    EMBEDDING_AUDITS,
    POLICY_DECISIONS,
    POLICY_TRANSITIONS,
    REQUESTS_TOTAL,
    REQUEST_DURATION,
    RISK_SIGNAL,
};
pub use risk::RiskMonitor;

/// Helper to record request metrics
pub fn record_request(endpoint: &str, status_code: u16, duration_secs: f64) {
    REQUESTS_TOTAL
        .with_label_values(&[endpoint, &status_code.to_string()])
        .inc();

    REQUEST_DURATION
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

/// Helper to record cache operations
pub fn record_cache_hit() {
    CACHE_OPERATIONS.with_label_values(&["hit"]).inc();
}

pub fn record_cache_miss() {
    CACHE_OPERATIONS.with_label_values(&["miss"]).inc();
}

pub fn record_cache_expired() {
    CACHE_OPERATIONS.with_label_values(&["expired"]).inc();
}

pub fn record_cache_eviction() {
    CACHE_OPERATIONS.with_label_values(&["eviction"]).inc();
}

pub fn update_cache_entries(count: usize) {
    CACHE_ENTRIES.set(count as f64);
}

/// Helper to record policy activity
pub fn record_policy_decision(decision: &str) {
    POLICY_DECISIONS.with_label_values(&[decision]).inc();
}

pub fn record_policy_transition(decision: &str) {
    POLICY_TRANSITIONS.with_label_values(&[decision]).inc();
}

pub fn update_cache_policy(enabled: bool, ttl_secs: f64) {
    CACHE_POLICY_STATE
        .with_label_values(&["enabled"])
        .set(if enabled { 1.0 } else { 0.0 });
    CACHE_POLICY_STATE
        .with_label_values(&["ttl_seconds"])
        .set(ttl_secs);
}

/// Helper to record risk signals
pub fn update_risk_signals(correctness_risk: f64, drift_score: f64) {
    RISK_SIGNAL
        .with_label_values(&["correctness_risk"])
        .set(correctness_risk);
    RISK_SIGNAL
        .with_label_values(&["drift_score"])
        .set(drift_score);
}

pub fn record_audit(kind: &str) {
    EMBEDDING_AUDITS.with_label_values(&[kind]).inc();
}
