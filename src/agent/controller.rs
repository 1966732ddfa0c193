// Agent controller - applies policy decisions to the adaptive cache

use crate::agent::policy::PolicyDecision;
use crate::cache::AdaptiveCache;
use crate::error::{Result, ServiceError};
use crate::metrics;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Sole writer of an [`AdaptiveCache`]'s `enabled` flag and TTL.
pub struct Controller<V> {
    cache: Arc<AdaptiveCache<V>>,
    default_ttl: Duration,
    short_ttl: Duration,
    last_decision: Mutex<Option<PolicyDecision>>,
}

impl<V: Clone> Controller<V> {
    pub fn new(cache: Arc<AdaptiveCache<V>>, default_ttl: Duration, short_ttl: Duration) -> Result<Self> {
        if default_ttl.is_zero() || short_ttl.is_zero() {
            return Err(ServiceError::Config("controller TTLs must be positive".to_string()));
        }

        Ok(Self {
            cache,
            default_ttl,
            short_ttl,
            last_decision: Mutex::new(None),
        })
    }

    /// Rewrite the cache policy for `decision`. Safe to repeat every cycle.
    pub fn apply(&self, decision: PolicyDecision) {
        let applied = match decision {
            PolicyDecision::DisableCache => self.cache.set_policy(false, None),
            PolicyDecision::ShortTtl => self.cache.set_policy(true, Some(self.short_ttl)),
            PolicyDecision::Normal => self.cache.set_policy(true, Some(self.default_ttl)),
        };

        *self.last_decision.lock() = Some(decision);
        metrics::record_policy_decision(decision.as_str());

        if let Some((enabled, ttl)) = applied {
            info!("Cache policy -> {} (enabled={}, ttl={:?})", decision, enabled, ttl);
            metrics::record_policy_transition(decision.as_str());
            metrics::update_cache_policy(enabled, ttl.as_secs_f64());
        }
    }

    pub fn last_decision(&self) -> Option<PolicyDecision> {
        *self.last_decision.lock()
    }

    pub fn cache(&self) -> &Arc<AdaptiveCache<V>> {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT_TTL: Duration = Duration::from_secs(30);
    const SHORT_TTL: Duration = Duration::from_secs(5);

    fn controller() -> Controller<u32> {
        let cache = Arc::new(AdaptiveCache::new(8, DEFAULT_TTL).unwrap());
        Controller::new(cache, DEFAULT_TTL, SHORT_TTL).unwrap()
    }

    #[test]
    fn test_rejects_zero_ttl() {
        let cache = Arc::new(AdaptiveCache::<u32>::new(8, DEFAULT_TTL).unwrap());
        assert!(Controller::new(cache.clone(), Duration::ZERO, SHORT_TTL).is_err());
        assert!(Controller::new(cache, DEFAULT_TTL, Duration::ZERO).is_err());
    }

    #[test]
    fn test_disable_keeps_ttl() {
        let controller = controller();
        controller.apply(PolicyDecision::ShortTtl);
        controller.apply(PolicyDecision::DisableCache);

        assert!(!controller.cache().is_enabled());
        assert_eq!(controller.cache().ttl(), SHORT_TTL);
    }

    #[test]
    fn test_short_ttl_then_normal() {
        let controller = controller();
        controller.apply(PolicyDecision::DisableCache);
        controller.apply(PolicyDecision::ShortTtl);
        assert!(controller.cache().is_enabled());
        assert_eq!(controller.cache().ttl(), SHORT_TTL);

        controller.apply(PolicyDecision::Normal);
        assert!(controller.cache().is_enabled());
        assert_eq!(controller.cache().ttl(), DEFAULT_TTL);
        assert_eq!(controller.last_decision(), Some(PolicyDecision::Normal));
    }

    #[test]
    fn test_apply_is_idempotent() {
        let controller = controller();
        controller.cache().set("a", 1);
        controller.cache().get("a");

        for decision in [PolicyDecision::Normal, PolicyDecision::ShortTtl, PolicyDecision::DisableCache] {
            controller.apply(decision);
            let first = controller.cache().stats();
            controller.apply(decision);
            let second = controller.cache().stats();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn test_concurrent_apply_leaves_a_valid_policy() {
        let controller = Arc::new(controller());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let controller = controller.clone();
                std::thread::spawn(move || {
                    for i in 0..200 {
                        let decision = match (t + i) % 3 {
                            0 => PolicyDecision::Normal,
                            1 => PolicyDecision::ShortTtl,
                            _ => PolicyDecision::DisableCache,
                        };
                        controller.apply(decision);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Whatever won, enabled and TTL were written together
        let stats = controller.cache().stats();
        assert!(stats.ttl_seconds == 5.0 || stats.ttl_seconds == 30.0);

        controller.apply(PolicyDecision::ShortTtl);
        let stats = controller.cache().stats();
        assert!(stats.enabled);
        assert_eq!(stats.ttl_seconds, 5.0);
    }

    #[test]
    fn test_policy_change_keeps_entries() {
        let controller = controller();
        controller.cache().set("a", 1);

        controller.apply(PolicyDecision::DisableCache);
        assert_eq!(controller.cache().len(), 1);

        controller.apply(PolicyDecision::Normal);
        assert_eq!(controller.cache().get("a"), Some(1));
    }
}
