//! Cache entry and statistics models.

use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Name reported by [`CacheStats::policy`].
pub const CACHE_POLICY_NAME: &str = "LRU+TTL";

/// One cached computation result.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The cached payload, opaque to the cache.
    pub value: V,
    /// When the entry was last written. Never moves backwards across overwrites.
    pub inserted_at: Instant,
}

/// Point-in-time snapshot of cache policy, occupancy and counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Eviction/expiration policy name.
    pub policy: String,
    /// Whether the cache currently serves and accepts entries.
    pub enabled: bool,
    /// Number of stored entries.
    pub size: usize,
    /// Fixed capacity.
    pub max_size: usize,
    /// TTL currently applied at read time.
    pub ttl_seconds: f64,
    /// Number of successful lookups.
    pub hits: u64,
    /// Number of lookups that returned nothing, including expirations.
    pub misses: u64,
    /// Number of entries dropped because they were too old when read.
    pub expired: u64,
    /// Number of entries dropped to stay within capacity.
    pub evictions: u64,
    /// `hits / (hits + misses)`, or 0 before any lookup.
    pub hit_rate: f64,
}
