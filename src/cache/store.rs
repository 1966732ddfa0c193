//! Hybrid LRU+TTL store with a runtime-mutable policy.
//!
//! [`AdaptiveCache`] bounds memory with least-recently-used eviction and
//! bounds staleness with a TTL checked lazily at read time. Its `enabled`
//! flag and TTL can change between any two operations; only the
//! [`Controller`](crate::agent::Controller) writes them.
//!
//! Store, counters and policy live behind one mutex per instance, so every
//! read-then-write (recency touch, eviction, counter bump, policy change) is
//! serialized and a `(value, timestamp)` pair is never observed torn.

use crate::cache::models::{CacheEntry, CacheStats, CACHE_POLICY_NAME};
use crate::error::{Result, ServiceError};
use crate::metrics;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use tracing::debug;

struct Inner<V> {
    entries: LruCache<String, CacheEntry<V>>,
    enabled: bool,
    ttl: Duration,
    hits: u64,
    misses: u64,
    expired: u64,
    evictions: u64,
}

pub struct AdaptiveCache<V> {
    max_size: usize,
    inner: Mutex<Inner<V>>,
}

impl<V: Clone> AdaptiveCache<V> {
    /// Create an enabled cache holding at most `max_size` entries for up to `ttl`.
    pub fn new(max_size: usize, ttl: Duration) -> Result<Self> {
        let capacity = NonZeroUsize::new(max_size)
            .ok_or_else(|| ServiceError::Config("cache max_size must be positive".to_string()))?;
        if ttl.is_zero() {
            return Err(ServiceError::Config("cache ttl must be positive".to_string()));
        }

        Ok(Self {
            max_size,
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                enabled: true,
                ttl,
                hits: 0,
                misses: 0,
                expired: 0,
                evictions: 0,
            }),
        })
    }

    /// Look up `key`, honoring the enabled flag and the TTL in effect now.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub(crate) fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !inner.enabled {
            inner.misses += 1;
            metrics::record_cache_miss();
            return None;
        }

        let ttl = inner.ttl;
        let is_expired = match inner.entries.peek(key) {
            None => {
                inner.misses += 1;
                metrics::record_cache_miss();
                return None;
            }
            Some(entry) => now.saturating_duration_since(entry.inserted_at) > ttl,
        };

        if is_expired {
            inner.entries.pop(key);
            inner.expired += 1;
            inner.misses += 1;
            metrics::record_cache_expired();
            metrics::record_cache_miss();
            metrics::update_cache_entries(inner.entries.len());
            debug!("Cache entry expired: {}", short_key(key));
            return None;
        }

        let value = inner.entries.get(key).map(|entry| entry.value.clone());
        inner.hits += 1;
        metrics::record_cache_hit();
        value
    }

    /// Store `value` under `key` as most recently used. Dropped silently while disabled.
    pub fn set(&self, key: &str, value: V) {
        self.set_at(key, value, Instant::now())
    }

    pub(crate) fn set_at(&self, key: &str, value: V, now: Instant) {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if !inner.enabled {
            return;
        }

        let inserted_at = match inner.entries.peek(key) {
            Some(existing) => existing.inserted_at.max(now),
            None => now,
        };

        if let Some((evicted, _)) = inner
            .entries
            .push(key.to_string(), CacheEntry { value, inserted_at })
        {
            // push() hands back the old entry on overwrite; only a different key is an eviction
            if evicted != key {
                inner.evictions += 1;
                metrics::record_cache_eviction();
                debug!("Evicted LRU entry: {}", short_key(&evicted));
            }
        }
        metrics::update_cache_entries(inner.entries.len());
    }

    /// Read a stored value regardless of policy and age, without touching
    /// recency or counters.
    pub fn peek(&self, key: &str) -> Option<V> {
        self.inner.lock().entries.peek(key).map(|entry| entry.value.clone())
    }

    /// Drop every entry and zero all counters. Policy is left as is.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.expired = 0;
        inner.evictions = 0;
        metrics::update_cache_entries(0);
        debug!("Cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total > 0 {
            inner.hits as f64 / total as f64
        } else {
            0.0
        };

        CacheStats {
            policy: CACHE_POLICY_NAME.to_string(),
            enabled: inner.enabled,
            size: inner.entries.len(),
            max_size: self.max_size,
            ttl_seconds: inner.ttl.as_secs_f64(),
            hits: inner.hits,
            misses: inner.misses,
            expired: inner.expired,
            evictions: inner.evictions,
            hit_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().enabled
    }

    pub fn ttl(&self) -> Duration {
        self.inner.lock().ttl
    }

    /// Policy writer, reserved for the controller. Sets both fields under one
    /// lock and, when anything changed, returns the resulting `(enabled, ttl)`
    /// as seen under that same lock.
    pub(crate) fn set_policy(&self, enabled: bool, ttl: Option<Duration>) -> Option<(bool, Duration)> {
        let mut inner = self.inner.lock();
        let mut changed = inner.enabled != enabled;
        inner.enabled = enabled;
        if let Some(ttl) = ttl {
            changed |= inner.ttl != ttl;
            inner.ttl = ttl;
        }

        if changed {
            Some((inner.enabled, inner.ttl))
        } else {
            None
        }
    }
}

fn short_key(key: &str) -> &str {
    key.get(..16).unwrap_or(key)
}
