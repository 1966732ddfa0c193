// Embedding cache: prefix fingerprints and the adaptive LRU+TTL store

pub mod fingerprint;
pub mod models;
pub mod store;

pub use fingerprint::KeyDeriver;
pub use models::{CacheEntry, CacheStats, CACHE_POLICY_NAME};
pub use store::AdaptiveCache;
