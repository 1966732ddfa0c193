//! Rule-based cache policy agent.
//!
//! [`PolicyAgent::decide`] maps a [`RiskSnapshot`] to one [`PolicyDecision`].
//! Rules are checked in a fixed order: correctness risk first, then drift,
//! then the normal policy.

use crate::config::PolicyConfig;
use serde::{Deserialize, Serialize};

/// Point-in-time health signals. A missing field means no risk was observed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskSnapshot {
    #[serde(default)]
    pub correctness_risk: Option<f64>,
    #[serde(default)]
    pub drift_score: Option<f64>,
}

impl RiskSnapshot {
    pub fn new(correctness_risk: f64, drift_score: f64) -> Self {
        Self {
            correctness_risk: Some(correctness_risk),
            drift_score: Some(drift_score),
        }
    }

    pub fn correctness_risk(&self) -> f64 {
        self.correctness_risk.unwrap_or(0.0)
    }

    pub fn drift_score(&self) -> f64 {
        self.drift_score.unwrap_or(0.0)
    }
}

/// The agent's verdict for one decision cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PolicyDecision {
    Normal,
    ShortTtl,
    DisableCache,
}

impl PolicyDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyDecision::Normal => "NORMAL",
            PolicyDecision::ShortTtl => "SHORT_TTL",
            PolicyDecision::DisableCache => "DISABLE_CACHE",
        }
    }
}

impl std::fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless mapping from risk signals to a cache policy.
#[derive(Debug, Clone)]
pub struct PolicyAgent {
    correctness_risk_threshold: f64,
    drift_score_threshold: f64,
}

impl PolicyAgent {
    pub fn new(config: &PolicyConfig) -> Self {
        Self {
            correctness_risk_threshold: config.correctness_risk_threshold,
            drift_score_threshold: config.drift_score_threshold,
        }
    }

    pub fn decide(&self, snapshot: &RiskSnapshot) -> PolicyDecision {
        if snapshot.correctness_risk() > self.correctness_risk_threshold {
            return PolicyDecision::DisableCache;
        }

        if snapshot.drift_score() > self.drift_score_threshold {
            return PolicyDecision::ShortTtl;
        }

        PolicyDecision::Normal
    }
}

impl Default for PolicyAgent {
    fn default() -> Self {
        Self::new(&PolicyConfig::default())
    }
}
