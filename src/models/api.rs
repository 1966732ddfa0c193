//! Prediction API type definitions.
//!
//! Request and response bodies for the HTTP surface: the mutating `/predict`
//! endpoint, the read-only `/stats` and `/health` endpoints, and the admin
//! endpoints that clear the cache or push an external risk snapshot.

use crate::agent::{PolicyDecision, RiskSnapshot};
use crate::cache::CacheStats;
use crate::metrics::LatencySummary;
use serde::{Deserialize, Serialize};

/// Prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Feature matrix, one row per position: `(seq_len, input_dim)`.
    pub features: Vec<Vec<f32>>,

    /// Whether the embedding cache may be consulted and filled.
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

fn default_use_cache() -> bool {
    true
}

/// Prediction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictResponse {
    /// Model score in `[0, 1]`.
    pub prediction: f64,

    /// Whether the embedding came from the cache.
    pub cache_hit: bool,

    /// Server-side latency of this request, rounded to 2 decimals.
    pub latency_ms: f64,
}

/// Current state of the control loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyStatus {
    /// Decision applied most recently, if any request ran yet.
    pub last_decision: Option<PolicyDecision>,

    /// Risk signals as the monitor sees them now.
    pub risk: RiskSnapshot,
}

/// Observability snapshot returned by `/stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub cache: CacheStats,

    /// `null` until a request has been recorded.
    pub latency: Option<LatencySummary>,

    pub policy: PolicyStatus,
}

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub cache_enabled: bool,
    pub timestamp: String,
}

/// Result of applying an externally supplied risk snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskUpdateResponse {
    pub decision: PolicyDecision,
    pub cache: CacheStats,
}
