//! Single-tier cache store with LRU eviction and TTL expiry

use crate::cache::{
    config::TierConfig,
    entry::{estimate_size, CacheEntry},
    types::{CacheKey, CacheStats},
};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

/// Fixed-capacity LRU cache with per-entry TTL
///
/// This implementation provides:
/// - Thread-safe async access; lookup, recency update and eviction share one lock
/// - Lazy TTL expiry on read, plus an explicit sweep
/// - Exactly one LRU eviction per insert that grows the map past capacity
/// - Hit/miss/eviction counters
pub struct LruCache<V> {
    /// Tier configuration
    config: TierConfig,

    /// Internal storage
    store: Mutex<CacheStore<V>>,
}

/// Internal cache storage
struct CacheStore<V> {
    /// key -> entry, ordered by recency of use
    entries: lru::LruCache<CacheKey, CacheEntry<V>>,

    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,

    /// Next write sequence number
    next_sequence: u64,
}

impl<V> LruCache<V>
where
    V: Clone + Serialize + Send,
{
    /// Create a new cache tier
    pub fn new(config: TierConfig) -> Self {
        debug!(
            "Initializing LRU cache (max_size={}, default_ttl={:?})",
            config.max_size, config.default_ttl
        );

        let store = CacheStore {
            entries: lru::LruCache::unbounded(),
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
            next_sequence: 0,
        };

        Self {
            config,
            store: Mutex::new(store),
        }
    }

    /// Convenience constructor
    pub fn with_capacity(max_size: usize, default_ttl: Option<Duration>) -> Self {
        Self::new(TierConfig::new(max_size, default_ttl))
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn max_size(&self) -> usize {
        self.config.max_size
    }

    /// Get a value from the cache
    ///
    /// A hit refreshes recency and bumps the access count. Expired entries are
    /// removed and reported as a miss.
    pub async fn get(&self, key: &str) -> Option<V> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;
        let now = Instant::now();

        let expired = match store.entries.peek(key) {
            Some(entry) => entry.is_expired_at(now),
            None => {
                debug!("Cache miss: {}", key);
                store.misses += 1;
                return None;
            }
        };

        if expired {
            debug!("Cache entry expired: {}", key);
            store.entries.pop(key);
            store.misses += 1;
            store.expirations += 1;
            return None;
        }

        // get_mut promotes the entry to most recently used
        let entry = store.entries.get_mut(key)?;
        entry.touch(now);
        let value = entry.value.clone();
        store.hits += 1;

        debug!("Cache hit: {}", key);
        Some(value)
    }

    /// Insert or overwrite using the tier's default TTL
    pub async fn set(&self, key: impl Into<CacheKey>, value: V) {
        let ttl = self.config.ttl_with_jitter();
        self.insert(key.into(), value, ttl).await;
    }

    /// Insert or overwrite with an explicit TTL (`None` = never expire)
    pub async fn set_with_ttl(&self, key: impl Into<CacheKey>, value: V, ttl: Option<Duration>) {
        self.insert(key.into(), value, ttl).await;
    }

    /// Write an entry and return whatever LRU pressure pushed out.
    ///
    /// Overwrites never evict. A new key that takes the map past capacity
    /// evicts exactly one entry, which is the new one itself when capacity is 0.
    pub(crate) async fn insert(
        &self,
        key: CacheKey,
        value: V,
        ttl: Option<Duration>,
    ) -> Option<CacheEntry<V>> {
        let size_bytes = estimate_size(&value);

        let mut guard = self.store.lock().await;
        let store = &mut *guard;

        let sequence = store.next_sequence;
        store.next_sequence += 1;

        let entry = CacheEntry::new(key.clone(), value, ttl, size_bytes, sequence);
        if store.entries.put(key.clone(), entry).is_some() {
            debug!("Updated existing cache entry: {}", key);
            return None;
        }
        debug!("Inserted new cache entry: {}", key);

        if store.entries.len() > self.config.max_size {
            if let Some((evicted_key, evicted)) = store.entries.pop_lru() {
                debug!("Evicting entry due to max_size limit: {}", evicted_key);
                store.evictions += 1;
                return Some(evicted);
            }
        }

        None
    }

    /// Check presence without touching recency or counters
    pub async fn contains_key(&self, key: &str) -> bool {
        let store = self.store.lock().await;
        store
            .entries
            .peek(key)
            .is_some_and(|entry| !entry.is_expired())
    }

    /// Remove a specific entry. No-op (and no counter change) if absent.
    pub async fn delete(&self, key: &str) -> Option<V> {
        let mut store = self.store.lock().await;
        let removed = store.entries.pop(key).map(|entry| entry.value);
        if removed.is_some() {
            debug!("Removed cache entry: {}", key);
        }
        removed
    }

    /// Remove all entries and reset every counter
    pub async fn clear(&self) {
        let mut store = self.store.lock().await;

        let count = store.entries.len();
        store.entries.clear();
        store.hits = 0;
        store.misses = 0;
        store.evictions = 0;
        store.expirations = 0;

        info!("Cleared {} entries from cache", count);
    }

    /// Remove all expired entries, returning their keys
    pub async fn purge_expired(&self) -> Vec<CacheKey> {
        let mut guard = self.store.lock().await;
        let store = &mut *guard;
        let now = Instant::now();

        let expired: Vec<CacheKey> = store
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            store.entries.pop(key);
        }
        store.expirations += expired.len() as u64;

        if !expired.is_empty() {
            debug!("Purged {} expired entries", expired.len());
        }
        expired
    }

    /// Live keys containing `pattern` as a plain substring
    pub async fn keys_matching(&self, pattern: &str) -> Vec<CacheKey> {
        let store = self.store.lock().await;
        let now = Instant::now();
        store
            .entries
            .iter()
            .filter(|(key, entry)| key.contains(pattern) && !entry.is_expired_at(now))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Snapshot of statistics
    pub async fn stats(&self) -> CacheStats {
        let store = self.store.lock().await;

        CacheStats {
            size: store.entries.len(),
            max_size: self.config.max_size,
            hits: store.hits,
            misses: store.misses,
            evictions: store.evictions,
            expirations: store.expirations,
            hit_rate: CacheStats::compute_hit_rate(store.hits, store.misses),
            total_size_bytes: store
                .entries
                .iter()
                .map(|(_, entry)| entry.metadata.size_bytes)
                .sum(),
        }
    }

    /// Top `n` live keys by access count, descending; ties go to the
    /// earlier write.
    pub async fn hot_keys(&self, n: usize) -> Vec<(CacheKey, u64)> {
        let store = self.store.lock().await;
        let now = Instant::now();

        let mut ranked: Vec<(&CacheKey, u64, u64)> = store
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key, entry.metadata.access_count, entry.metadata.sequence))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.2.cmp(&b.2)));

        ranked
            .into_iter()
            .take(n)
            .map(|(key, count, _)| (key.clone(), count))
            .collect()
    }

    /// Number of entries physically resident
    pub async fn len(&self) -> usize {
        self.store.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.entries.is_empty()
    }
}
