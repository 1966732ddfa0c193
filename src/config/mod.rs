// Configuration module

mod models;

pub use models::*;

use crate::error::{Result, ServiceError};
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. CLI arguments (highest, applied by the caller)
    /// 2. Environment variables (`EMBEDCACHE__SECTION__KEY`)
    /// 3. Config file (`path`, or `~/.embedcache/config.toml` when present)
    /// 4. Defaults (lowest)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p.to_path_buf()).required(true),
            None => File::with_name(&Self::default_config_path()).required(false),
        };

        let config = Config::builder()
            .add_source(Config::try_from(&Self::default())?)
            .add_source(file)
            .add_source(
                Environment::with_prefix("EMBEDCACHE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Reject settings the service cannot start with. Values are never clamped.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("server.workers", self.server.workers as u64),
            ("cache.max_size", self.cache.max_size as u64),
            ("cache.default_ttl_seconds", self.cache.default_ttl_seconds),
            ("cache.short_ttl_seconds", self.cache.short_ttl_seconds),
            ("cache.prefix_len", self.cache.prefix_len as u64),
            ("risk.window", self.risk.window as u64),
            ("risk.horizon_seconds", self.risk.horizon_seconds),
            ("latency.max_samples", self.latency.max_samples as u64),
            ("model.input_dim", self.model.input_dim as u64),
            ("model.embedding_dim", self.model.embedding_dim as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ServiceError::Config(format!("{} must be positive", name)));
            }
        }

        let thresholds = [
            ("policy.correctness_risk_threshold", self.policy.correctness_risk_threshold),
            ("policy.drift_score_threshold", self.policy.drift_score_threshold),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(ServiceError::Config(format!(
                    "{} must be a finite, non-negative number (got {})",
                    name, value
                )));
            }
        }

        if !self.risk.drift_scale.is_finite() || self.risk.drift_scale <= 0.0 {
            return Err(ServiceError::Config(format!(
                "risk.drift_scale must be positive (got {})",
                self.risk.drift_scale
            )));
        }

        Ok(())
    }

    fn default_config_path() -> String {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".embedcache")
            .join("config.toml")
            .to_string_lossy()
            .to_string()
    }
}
