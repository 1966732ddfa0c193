//! Request latency tracking with bounded retention.
//!
//! [`LatencyTracker`] keeps the most recent `max_samples` latencies in a ring
//! buffer and reports nearest-rank percentiles over them. The rank index is
//! `floor(p * n)` clamped to the last sample, so tiny sample counts never
//! index out of range.

use crate::error::{Result, ServiceError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Percentile summary over the retained samples, in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Number of retained samples the percentiles are computed over.
    pub count: usize,
    /// Number of samples recorded since startup, including dropped ones.
    pub total_recorded: u64,
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

struct Samples {
    window: VecDeque<f64>,
    total_recorded: u64,
}

pub struct LatencyTracker {
    max_samples: usize,
    samples: Mutex<Samples>,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Result<Self> {
        if max_samples == 0 {
            return Err(ServiceError::Config("latency max_samples must be positive".to_string()));
        }

        Ok(Self {
            max_samples,
            samples: Mutex::new(Samples {
                window: VecDeque::with_capacity(max_samples.min(4096)),
                total_recorded: 0,
            }),
        })
    }

    /// Append one sample, dropping the oldest once the buffer is full.
    pub fn record(&self, sample_ms: f64) {
        if !sample_ms.is_finite() || sample_ms < 0.0 {
            debug!("Ignoring invalid latency sample: {}", sample_ms);
            return;
        }

        let mut samples = self.samples.lock();
        if samples.window.len() == self.max_samples {
            samples.window.pop_front();
        }
        samples.window.push_back(sample_ms);
        samples.total_recorded += 1;
    }

    /// `None` until the first sample arrives.
    pub fn summary(&self) -> Option<LatencySummary> {
        // Copy out under the lock, sort without it
        let (mut sorted, total_recorded) = {
            let samples = self.samples.lock();
            if samples.window.is_empty() {
                return None;
            }
            (samples.window.iter().copied().collect::<Vec<_>>(), samples.total_recorded)
        };
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(LatencySummary {
            count: sorted.len(),
            total_recorded,
            p50: nearest_rank(&sorted, 0.50),
            p95: nearest_rank(&sorted, 0.95),
            p99: nearest_rank(&sorted, 0.99),
        })
    }
}

fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    let index = ((p * n as f64).floor() as usize).min(n - 1);
    sorted[index]
}
