//! The serving loop.
//!
//! [`PredictionService`] wires the pieces together for one request:
//!
//! 1. derive the prefix fingerprint
//! 2. consult the cache; on a miss, encode and store
//! 3. audit cached embeddings against fresh ones (sampled on hits, free
//!    "shadow" audits while the cache is disabled)
//! 4. score the embedding
//! 5. fold the request into the risk monitor, let the agent decide on the
//!    merged internal and external signals, and have the controller apply
//!    the decision for the next request
//! 6. record latency
//!
//! Nothing on the cache/agent/controller path fails a request; the worst
//! outcome is a miss.

use crate::agent::{Controller, PolicyAgent, PolicyDecision, RiskSnapshot};
use crate::cache::{AdaptiveCache, CacheStats, KeyDeriver};
use crate::config::AppConfig;
use crate::encoder::{cosine_distance, l2_distance, Embedding, EmbeddingModel, ProjectionModel};
use crate::error::{Result, ServiceError};
use crate::metrics::{self, LatencyTracker, RiskMonitor};
use crate::models::{PolicyStatus, PredictRequest, PredictResponse, StatsResponse};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Cache of pooled embeddings keyed by fingerprint.
pub type EmbeddingCache = AdaptiveCache<Arc<Embedding>>;

pub struct PredictionService {
    model: Arc<dyn EmbeddingModel>,
    deriver: KeyDeriver,
    cache: Arc<EmbeddingCache>,
    caching_allowed: bool,
    agent: PolicyAgent,
    controller: Controller<Arc<Embedding>>,
    risk: RiskMonitor,
    latency: LatencyTracker,
    audit_every: u64,
    hits_seen: AtomicU64,
}

impl PredictionService {
    /// Build the service around the deterministic [`ProjectionModel`].
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model = ProjectionModel::new(&config.model)?;
        Self::new(config, Arc::new(model))
    }

    /// Build the service around any [`EmbeddingModel`].
    pub fn new(config: &AppConfig, model: Arc<dyn EmbeddingModel>) -> Result<Self> {
        let default_ttl = Duration::from_secs(config.cache.default_ttl_seconds);
        let short_ttl = Duration::from_secs(config.cache.short_ttl_seconds);

        let cache = Arc::new(AdaptiveCache::new(config.cache.max_size, default_ttl)?);
        let controller = Controller::new(cache.clone(), default_ttl, short_ttl)?;

        info!(
            "Embedding cache ready: max_size={}, ttl={}s, short_ttl={}s, prefix_len={} ({:?})",
            config.cache.max_size,
            config.cache.default_ttl_seconds,
            config.cache.short_ttl_seconds,
            config.cache.prefix_len,
            config.cache.scope
        );
        if !config.cache.enabled {
            info!("Caching switched off by configuration");
        }
        metrics::update_cache_policy(cache.is_enabled(), cache.ttl().as_secs_f64());

        Ok(Self {
            model,
            deriver: KeyDeriver::new(config.cache.prefix_len, config.cache.scope)?,
            cache,
            caching_allowed: config.cache.enabled,
            agent: PolicyAgent::new(&config.policy),
            controller,
            risk: RiskMonitor::new(&config.risk)?,
            latency: LatencyTracker::new(config.latency.max_samples)?,
            audit_every: config.risk.audit_every,
            hits_seen: AtomicU64::new(0),
        })
    }

    /// Run one request through the cache, the model and the control loop.
    pub fn predict(&self, req: &PredictRequest) -> Result<PredictResponse> {
        self.predict_at(req, Instant::now())
    }

    pub(crate) fn predict_at(&self, req: &PredictRequest, now: Instant) -> Result<PredictResponse> {
        let start = Instant::now();
        self.validate(&req.features)?;

        let key = self.deriver.derive(&req.features);
        let use_cache = req.use_cache && self.caching_allowed;

        let cached = if use_cache { self.cache.get_at(&key, now) } else { None };
        let cache_hit = cached.is_some();

        let embedding = match cached {
            Some(embedding) => {
                if self.audit_due() {
                    let fresh = self.model.encode(&req.features);
                    self.record_divergence(&embedding, &fresh, "sampled", now);
                }
                embedding
            }
            None => {
                let fresh = Arc::new(self.model.encode(&req.features));
                if use_cache {
                    if self.cache.is_enabled() {
                        self.cache.set_at(&key, fresh.clone(), now);
                    } else if let Some(stored) = self.cache.peek(&key) {
                        self.record_divergence(&stored, &fresh, "shadow", now);
                    }
                }
                fresh
            }
        };

        let prediction = self.model.predict(&embedding) as f64;

        self.risk.observe_features(&req.features);
        let decision = self.run_policy_cycle(&self.risk.snapshot_at(now));

        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        self.latency.record(latency_ms);

        debug!(
            "Predict: key={}, cache_hit={}, decision={}, latency_ms={:.3}",
            key.get(..16).unwrap_or(&key),
            cache_hit,
            decision,
            latency_ms
        );

        Ok(PredictResponse {
            prediction,
            cache_hit,
            latency_ms: (latency_ms * 100.0).round() / 100.0,
        })
    }

    /// Accept a snapshot from an external metrics provider and run a decision
    /// cycle on it merged with the internal signals. The snapshot keeps
    /// counting for later requests until replaced or past the risk horizon.
    pub fn apply_risk(&self, external: &RiskSnapshot) -> PolicyDecision {
        self.risk.set_external(*external);
        self.run_policy_cycle(&self.risk.snapshot())
    }

    // snapshot -> agent -> controller
    fn run_policy_cycle(&self, snapshot: &RiskSnapshot) -> PolicyDecision {
        metrics::update_risk_signals(snapshot.correctness_risk(), snapshot.drift_score());
        let decision = self.agent.decide(snapshot);
        self.controller.apply(decision);
        decision
    }

    pub fn stats(&self) -> StatsResponse {
        StatsResponse {
            cache: self.cache.stats(),
            latency: self.latency.summary(),
            policy: PolicyStatus {
                last_decision: self.controller.last_decision(),
                risk: self.risk.snapshot(),
            },
        }
    }

    /// Empty the cache and reset its counters.
    pub fn clear_cache(&self) -> CacheStats {
        self.cache.clear();
        info!("Embedding cache cleared");
        self.cache.stats()
    }

    pub fn cache(&self) -> &Arc<EmbeddingCache> {
        &self.cache
    }

    pub fn is_cache_enabled(&self) -> bool {
        self.caching_allowed && self.cache.is_enabled()
    }

    // Shape checks belong to the transport boundary, not the cache
    fn validate(&self, features: &[Vec<f32>]) -> Result<()> {
        if features.is_empty() {
            return Err(ServiceError::InvalidRequest(
                "features must contain at least one row".to_string(),
            ));
        }

        let width = self.model.input_dim();
        if let Some((index, row)) = features.iter().enumerate().find(|(_, row)| row.len() != width) {
            return Err(ServiceError::InvalidRequest(format!(
                "feature row {} has {} values, expected {}",
                index,
                row.len(),
                width
            )));
        }

        Ok(())
    }

    fn audit_due(&self) -> bool {
        if self.audit_every == 0 {
            return false;
        }
        let seen = self.hits_seen.fetch_add(1, Ordering::Relaxed) + 1;
        seen % self.audit_every == 0
    }

    fn record_divergence(&self, cached: &Embedding, fresh: &Embedding, kind: &str, now: Instant) {
        let distance = cosine_distance(cached.as_slice(), fresh.as_slice());
        self.risk.record_divergence_at(distance, now);
        metrics::record_audit(kind);
        debug!(
            "Embedding audit ({}): cosine_distance={:.4}, l2_distance={:.4}",
            kind,
            distance,
            l2_distance(cached.as_slice(), fresh.as_slice())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Embeds a matrix as `[last_row[0], 0]` and counts encode calls.
    struct StubModel {
        encodes: AtomicUsize,
    }

    impl StubModel {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                encodes: AtomicUsize::new(0),
            })
        }

        fn encodes(&self) -> usize {
            self.encodes.load(Ordering::SeqCst)
        }
    }

    impl EmbeddingModel for StubModel {
        fn input_dim(&self) -> usize {
            2
        }

        fn encode(&self, features: &[Vec<f32>]) -> Embedding {
            self.encodes.fetch_add(1, Ordering::SeqCst);
            let lead = features.last().map(|row| row[0]).unwrap_or(0.0);
            Embedding::new(vec![lead, 0.0])
        }

        fn predict(&self, embedding: &Embedding) -> f32 {
            if embedding.as_slice()[0] > 0.0 {
                1.0
            } else {
                0.0
            }
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.cache.prefix_len = 1;
        config.risk.window = 1;
        config.risk.audit_every = 1;
        config
    }

    fn request(features: Vec<Vec<f32>>) -> PredictRequest {
        PredictRequest {
            features,
            use_cache: true,
        }
    }

    #[test]
    fn test_second_request_hits() {
        let model = StubModel::new();
        let mut config = config();
        config.risk.audit_every = 0;
        let service = PredictionService::new(&config, model.clone()).unwrap();

        let req = request(vec![vec![5.0, 5.0], vec![1.0, 0.0]]);
        assert!(!service.predict(&req).unwrap().cache_hit);
        assert!(service.predict(&req).unwrap().cache_hit);

        assert_eq!(model.encodes(), 1);
        let stats = service.stats();
        assert_eq!(stats.cache.hits, 1);
        assert_eq!(stats.cache.misses, 1);
        assert_eq!(stats.latency.unwrap().count, 2);
    }

    #[test]
    fn test_use_cache_false_bypasses_cache() {
        let model = StubModel::new();
        let service = PredictionService::new(&config(), model.clone()).unwrap();

        let req = PredictRequest {
            features: vec![vec![1.0, 1.0]],
            use_cache: false,
        };
        service.predict(&req).unwrap();
        service.predict(&req).unwrap();

        assert_eq!(model.encodes(), 2);
        let stats = service.cache().stats();
        assert_eq!(stats.hits + stats.misses, 0);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_master_switch_off() {
        let model = StubModel::new();
        let mut config = config();
        config.cache.enabled = false;
        let service = PredictionService::new(&config, model.clone()).unwrap();

        let req = request(vec![vec![1.0, 1.0]]);
        assert!(!service.predict(&req).unwrap().cache_hit);
        assert!(!service.predict(&req).unwrap().cache_hit);
        assert!(service.cache().is_empty());
        assert!(!service.is_cache_enabled());
    }

    #[test]
    fn test_rejects_malformed_features() {
        let service = PredictionService::new(&config(), StubModel::new()).unwrap();

        let empty = request(vec![]);
        assert!(matches!(service.predict(&empty), Err(ServiceError::InvalidRequest(_))));

        let ragged = request(vec![vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(service.predict(&ragged), Err(ServiceError::InvalidRequest(_))));

        assert_eq!(service.stats().latency, None);
    }

    #[test]
    fn test_divergence_disables_then_recovers() {
        let model = StubModel::new();
        let service = PredictionService::new(&config(), model.clone()).unwrap();

        // Same first row, so both share one fingerprint
        let a = request(vec![vec![5.0, 5.0], vec![1.0, 0.0]]);
        let b = request(vec![vec![5.0, 5.0], vec![-1.0, 0.0]]);

        let first = service.predict(&a).unwrap();
        assert!(!first.cache_hit);
        assert_eq!(service.stats().policy.last_decision, Some(PolicyDecision::Normal));

        // Served A's embedding for B; the audit sees opposite vectors
        let second = service.predict(&b).unwrap();
        assert!(second.cache_hit);
        assert_eq!(second.prediction, 1.0);
        assert_eq!(service.stats().policy.last_decision, Some(PolicyDecision::DisableCache));
        assert!(!service.cache().is_enabled());

        // Disabled: fresh result, shadow audit keeps risk high
        let third = service.predict(&b).unwrap();
        assert!(!third.cache_hit);
        assert_eq!(third.prediction, 0.0);
        assert!(!service.cache().is_enabled());

        // A agrees with the stored entry again, so the cache comes back
        service.predict(&a).unwrap();
        assert!(service.cache().is_enabled());
        assert!(service.predict(&a).unwrap().cache_hit);
    }

    #[test]
    fn test_external_risk_snapshot() {
        let service = PredictionService::new(&config(), StubModel::new()).unwrap();

        let decision = service.apply_risk(&RiskSnapshot {
            correctness_risk: None,
            drift_score: Some(0.9),
        });
        assert_eq!(decision, PolicyDecision::ShortTtl);
        assert_eq!(service.cache().ttl(), Duration::from_secs(5));

        assert_eq!(service.apply_risk(&RiskSnapshot::default()), PolicyDecision::Normal);
        assert_eq!(service.cache().ttl(), Duration::from_secs(30));
    }

    #[test]
    fn test_external_risk_outlives_next_request() {
        let service = PredictionService::new(&config(), StubModel::new()).unwrap();

        assert_eq!(
            service.apply_risk(&RiskSnapshot::new(0.95, 0.0)),
            PolicyDecision::DisableCache
        );

        // Unseen key, no audit: only the external reading says anything
        let response = service.predict(&request(vec![vec![3.0, 3.0]])).unwrap();
        assert!(!response.cache_hit);
        assert!(!service.cache().is_enabled());
        assert_eq!(service.stats().policy.last_decision, Some(PolicyDecision::DisableCache));
        assert_eq!(service.stats().policy.risk.correctness_risk, Some(0.95));

        // Withdrawn by the provider, the next request goes back to normal
        service.apply_risk(&RiskSnapshot::default());
        service.predict(&request(vec![vec![4.0, 4.0]])).unwrap();
        assert!(service.cache().is_enabled());
    }

    #[test]
    fn test_disabled_cache_recovers_on_fresh_traffic() {
        let mut config = config();
        config.risk.window = 20;
        // Keep drift out of the picture; only correctness risk is under test
        config.risk.drift_scale = 1e6;
        let service = PredictionService::new(&config, StubModel::new()).unwrap();
        let t0 = Instant::now();

        let a = request(vec![vec![5.0, 5.0], vec![1.0, 0.0]]);
        let b = request(vec![vec![5.0, 5.0], vec![-1.0, 0.0]]);
        service.predict_at(&a, t0).unwrap();
        service.predict_at(&b, t0).unwrap();
        assert!(!service.cache().is_enabled());

        // New fingerprints never hit a stored entry, so no audit lowers the risk
        for i in 0..500 {
            let fresh = request(vec![vec![100.0 + i as f32, 0.0]]);
            service.predict_at(&fresh, t0 + Duration::from_millis(i)).unwrap();
        }
        assert!(!service.cache().is_enabled());

        // Past the horizon the stale divergence no longer counts
        let later = t0 + Duration::from_secs(31);
        service.predict_at(&request(vec![vec![-7.0, 0.0]]), later).unwrap();
        assert!(service.cache().is_enabled());
        assert_eq!(service.stats().policy.last_decision, Some(PolicyDecision::Normal));
    }

    #[test]
    fn test_clear_cache_resets_counters() {
        let service = PredictionService::new(&config(), StubModel::new()).unwrap();
        service.predict(&request(vec![vec![1.0, 1.0]])).unwrap();

        let stats = service.clear_cache();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.misses, 0);
    }
}
