//! Rolling risk signals for the cache policy agent.
//!
//! [`RiskMonitor`] is the metrics provider behind [`RiskSnapshot`]. It keeps
//! two ring buffers of `window` observations:
//!
//! - embedding divergences (cosine distance between a cached embedding and a
//!   fresh one for the same fingerprint); their mean is the correctness risk.
//!   Each divergence carries the time it was measured and stops counting once
//!   it is older than `horizon`, so the signal decays when no audit runs.
//! - per-request feature means; the first `window` of them freeze a baseline
//!   and the drift score is the shift of the recent mean away from it,
//!   divided by `drift_scale` and clamped to `[0, 1]`.
//!
//! An external provider may push its own snapshot. It is held for `horizon`
//! and merged field by field with the internal signals, taking the larger
//! value; a field absent on both sides stays absent.
//!
//! Either signal stays absent until it has data, which the agent reads as
//! "no risk observed".

use crate::agent::RiskSnapshot;
use crate::config::RiskConfig;
use crate::error::{Result, ServiceError};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::debug;

struct RiskState {
    divergences: VecDeque<(Instant, f64)>,
    baseline_samples: Vec<f64>,
    baseline: Option<f64>,
    recent: VecDeque<f64>,
    external: Option<(Instant, RiskSnapshot)>,
}

pub struct RiskMonitor {
    window: usize,
    drift_scale: f64,
    horizon: Duration,
    state: Mutex<RiskState>,
}

impl RiskMonitor {
    pub fn new(config: &RiskConfig) -> Result<Self> {
        if config.window == 0 {
            return Err(ServiceError::Config("risk window must be positive".to_string()));
        }
        if !config.drift_scale.is_finite() || config.drift_scale <= 0.0 {
            return Err(ServiceError::Config("risk drift_scale must be positive".to_string()));
        }
        if config.horizon_seconds == 0 {
            return Err(ServiceError::Config("risk horizon_seconds must be positive".to_string()));
        }

        Ok(Self {
            window: config.window,
            drift_scale: config.drift_scale,
            horizon: Duration::from_secs(config.horizon_seconds),
            state: Mutex::new(RiskState {
                divergences: VecDeque::with_capacity(config.window),
                baseline_samples: Vec::with_capacity(config.window),
                baseline: None,
                recent: VecDeque::with_capacity(config.window),
                external: None,
            }),
        })
    }

    /// Record one cached-vs-fresh embedding distance.
    pub fn record_divergence(&self, distance: f64) {
        self.record_divergence_at(distance, Instant::now())
    }

    pub(crate) fn record_divergence_at(&self, distance: f64, now: Instant) {
        if !distance.is_finite() {
            return;
        }
        let mut state = self.state.lock();
        if state.divergences.len() == self.window {
            state.divergences.pop_front();
        }
        state.divergences.push_back((now, distance));
    }

    /// Fold one request's feature matrix into the drift estimate.
    pub fn observe_features<R: AsRef<[f32]>>(&self, features: &[R]) {
        let (sum, count) = features
            .iter()
            .flat_map(|row| row.as_ref().iter())
            .filter(|v| v.is_finite())
            .fold((0.0f64, 0usize), |(sum, count), v| (sum + *v as f64, count + 1));
        if count == 0 {
            return;
        }
        let mean = sum / count as f64;

        let mut state = self.state.lock();
        if state.baseline.is_none() {
            state.baseline_samples.push(mean);
            if state.baseline_samples.len() == self.window {
                let baseline = average(state.baseline_samples.iter().copied());
                debug!("Drift baseline established: {:.4}", baseline);
                state.baseline = Some(baseline);
                state.baseline_samples = Vec::new();
            }
        }
        if state.recent.len() == self.window {
            state.recent.pop_front();
        }
        state.recent.push_back(mean);
    }

    /// Replace the externally supplied snapshot. An empty snapshot withdraws it.
    pub fn set_external(&self, snapshot: RiskSnapshot) {
        self.set_external_at(snapshot, Instant::now())
    }

    pub(crate) fn set_external_at(&self, snapshot: RiskSnapshot, now: Instant) {
        self.state.lock().external = Some((now, snapshot));
    }

    pub fn snapshot(&self) -> RiskSnapshot {
        self.snapshot_at(Instant::now())
    }

    pub(crate) fn snapshot_at(&self, now: Instant) -> RiskSnapshot {
        let mut state = self.state.lock();
        let horizon = self.horizon;
        let stale = |at: Instant| now.saturating_duration_since(at) > horizon;

        // Oldest first, so stale samples sit at the front
        while state.divergences.front().is_some_and(|(at, _)| stale(*at)) {
            state.divergences.pop_front();
        }
        if state.external.is_some_and(|(at, _)| stale(at)) {
            debug!("External risk snapshot expired");
            state.external = None;
        }

        let correctness_risk = if state.divergences.is_empty() {
            None
        } else {
            Some(average(state.divergences.iter().map(|(_, d)| *d)))
        };

        let drift_score = state.baseline.map(|baseline| {
            let recent = average(state.recent.iter().copied());
            ((recent - baseline).abs() / self.drift_scale).clamp(0.0, 1.0)
        });

        let external = state.external.map(|(_, snapshot)| snapshot).unwrap_or_default();
        RiskSnapshot {
            correctness_risk: max_signal(correctness_risk, external.correctness_risk),
            drift_score: max_signal(drift_score, external.drift_score),
        }
    }
}

fn max_signal(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

fn average(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}
