//! Configuration data structures for the embedcache service.
//!
//! This module defines the schema for the application settings: the HTTP
//! server, the adaptive cache and its fingerprinting, the policy thresholds,
//! the risk monitor, latency retention and the embedding model.

use serde::{Deserialize, Serialize};

/// The root configuration object for the application.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// HTTP server settings (host, port, workers).
    #[serde(default)]
    pub server: ServerConfig,

    /// Adaptive cache capacity, TTLs and fingerprinting.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Risk thresholds used by the policy agent.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Rolling risk window, audit sampling and signal horizon.
    #[serde(default)]
    pub risk: RiskConfig,

    /// Latency sample retention.
    #[serde(default)]
    pub latency: LatencyConfig,

    /// Shape and seed of the embedding model.
    #[serde(default)]
    pub model: ModelConfig,

    /// Logging and observability settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// HTTP layer tuning.
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Settings for the built-in HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The IP address or hostname the server should bind to.
    /// Default: `127.0.0.1`
    #[serde(default = "default_host")]
    pub host: String,

    /// The port number the server should listen on.
    /// Default: `8000`
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of tokio worker threads.
    /// Default: Number of logical CPU cores.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

/// Which part of the feature matrix contributes to the cache fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintScope {
    /// The first `prefix_len` rows, every value in them.
    #[default]
    Rows,
    /// The first `prefix_len` values of every row.
    Columns,
}

/// Settings for the adaptive LRU+TTL embedding cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Master switch. When off, no request touches the cache; the runtime
    /// flag the controller flips is separate.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of entries before LRU eviction kicks in.
    /// Default: `256`
    #[serde(default = "default_max_size")]
    pub max_size: usize,

    /// TTL applied under the NORMAL policy.
    /// Default: `30`
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// TTL applied under the SHORT_TTL policy.
    /// Default: `5`
    #[serde(default = "default_short_ttl_seconds")]
    pub short_ttl_seconds: u64,

    /// How many rows (or columns) feed the fingerprint.
    /// Default: `4`
    #[serde(default = "default_prefix_len")]
    pub prefix_len: usize,

    /// Default: `rows`
    #[serde(default)]
    pub scope: FingerprintScope,
}

/// Thresholds for the policy agent. A signal strictly above its threshold fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Default: `0.8`
    #[serde(default = "default_correctness_threshold")]
    pub correctness_risk_threshold: f64,

    /// Default: `0.6`
    #[serde(default = "default_drift_threshold")]
    pub drift_score_threshold: f64,
}

/// Settings for the rolling risk monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Length of the divergence and drift ring buffers.
    /// Default: `20`
    #[serde(default = "default_risk_window")]
    pub window: usize,

    /// Re-encode every n-th cache hit to measure divergence. `0` disables sampling.
    /// Default: `10`
    #[serde(default = "default_audit_every")]
    pub audit_every: u64,

    /// Feature-mean shift that maps to a drift score of 1.0.
    /// Default: `1.0`
    #[serde(default = "default_drift_scale")]
    pub drift_scale: f64,

    /// How long an audited divergence or an externally pushed snapshot keeps
    /// counting toward the risk signals.
    /// Default: `30`
    #[serde(default = "default_risk_horizon_seconds")]
    pub horizon_seconds: u64,
}

/// Settings for latency sample retention.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatencyConfig {
    /// Maximum number of retained samples; older samples are dropped first.
    /// Default: `10000`
    #[serde(default = "default_max_samples")]
    pub max_samples: usize,
}

/// Shape of the built-in projection model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Width of each feature row.
    /// Default: `32`
    #[serde(default = "default_input_dim")]
    pub input_dim: usize,

    /// Width of the pooled embedding.
    /// Default: `64`
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,

    /// Seed for the deterministic weights.
    /// Default: `0`
    #[serde(default)]
    pub seed: u64,
}

/// Settings for application logging and output format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum log level (`trace`, `debug`, `info`, `warn`, `error`).
    /// Default: `info`
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format for logs (`pretty`, `json`, `compact`).
    /// Default: `pretty`
    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Settings for tuning the HTTP layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceConfig {
    /// Whether to gzip HTTP responses.
    /// Default: `true`
    #[serde(default = "default_true")]
    pub enable_compression: bool,

    /// Largest accepted request body in bytes.
    /// Default: `10485760` (10 MiB)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

// Default trait implementations linking to custom logic

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: default_workers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_max_size(),
            default_ttl_seconds: default_ttl_seconds(),
            short_ttl_seconds: default_short_ttl_seconds(),
            prefix_len: default_prefix_len(),
            scope: FingerprintScope::default(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            correctness_risk_threshold: default_correctness_threshold(),
            drift_score_threshold: default_drift_threshold(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            window: default_risk_window(),
            audit_every: default_audit_every(),
            drift_scale: default_drift_scale(),
            horizon_seconds: default_risk_horizon_seconds(),
        }
    }
}

impl Default for LatencyConfig {
    fn default() -> Self {
        Self {
            max_samples: default_max_samples(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            input_dim: default_input_dim(),
            embedding_dim: default_embedding_dim(),
            seed: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_compression: true,
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

// Helper functions for serde defaults and shared constants
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_true() -> bool {
    true
}

fn default_max_size() -> usize {
    256
}

fn default_ttl_seconds() -> u64 {
    30
}

fn default_short_ttl_seconds() -> u64 {
    5
}

fn default_prefix_len() -> usize {
    4
}

fn default_correctness_threshold() -> f64 {
    0.8
}

fn default_drift_threshold() -> f64 {
    0.6
}

fn default_risk_window() -> usize {
    20
}

fn default_audit_every() -> u64 {
    10
}

fn default_drift_scale() -> f64 {
    1.0
}

fn default_risk_horizon_seconds() -> u64 {
    30
}

fn default_max_samples() -> usize {
    10_000
}

fn default_input_dim() -> usize {
    32
}

fn default_embedding_dim() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
