//! Two-tier cache: a small hot L1 in front of a larger warm L2

use crate::cache::{
    config::CacheConfig,
    invalidation::{InvalidationEvent, InvalidationReason},
    store::LruCache,
    types::{CacheKey, Tier, TieredStats},
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// L1/L2 cache with read-through promotion
///
/// - Reads check L1, then L2. An L2 hit is copied into L1 under L1's own
///   default TTL; the L2 copy stays where it is.
/// - Writes go to exactly one tier.
/// - Deletes and clears hit both tiers.
/// - With `demote_evicted`, an entry pushed out of L1 by capacity pressure is
///   written into L2 for the rest of its lifetime instead of being dropped.
///
/// Promotion, writes, deletes and clears are serialized by `write_lock`, so a
/// read that started before a delete can never put the deleted value back.
pub struct TieredCache<V> {
    l1: LruCache<V>,
    l2: LruCache<V>,
    write_lock: Mutex<()>,
    l1_promotions: AtomicU64,
    l2_promotions: AtomicU64,
    demote_evicted: bool,
    cleanup_interval: Duration,
}

impl<V> TieredCache<V>
where
    V: Clone + Serialize + Send,
{
    /// Create a tiered cache from configuration
    pub fn new(config: &CacheConfig) -> Self {
        info!(
            "Initializing tiered cache (l1={}/{:?}, l2={}/{:?}, demote_evicted={})",
            config.l1.max_size,
            config.l1.default_ttl,
            config.l2.max_size,
            config.l2.default_ttl,
            config.demote_evicted
        );

        Self {
            l1: LruCache::new(config.l1.clone()),
            l2: LruCache::new(config.l2.clone()),
            write_lock: Mutex::new(()),
            l1_promotions: AtomicU64::new(0),
            l2_promotions: AtomicU64::new(0),
            demote_evicted: config.demote_evicted,
            cleanup_interval: config.cleanup_interval,
        }
    }

    pub fn l1(&self) -> &LruCache<V> {
        &self.l1
    }

    pub fn l2(&self) -> &LruCache<V> {
        &self.l2
    }

    pub fn tier(&self, tier: Tier) -> &LruCache<V> {
        match tier {
            Tier::L1 => &self.l1,
            Tier::L2 => &self.l2,
        }
    }

    /// Look up a key in L1, then L2, promoting L2 hits.
    ///
    /// A miss in both tiers leaves both untouched.
    pub async fn get(&self, key: &str) -> Option<V> {
        if let Some(value) = self.l1.get(key).await {
            return Some(value);
        }

        let _guard = self.write_lock.lock().await;
        let value = self.l2.get(key).await?;
        debug!("Promoting {} from l2 to l1", key);
        self.write_l1(key.to_string(), value.clone(), self.l1.config().ttl_with_jitter())
            .await;
        self.l1_promotions.fetch_add(1, Ordering::Relaxed);

        Some(value)
    }

    /// Write into one tier using that tier's default TTL
    pub async fn set(&self, key: impl Into<CacheKey>, value: V, tier: Tier) {
        let ttl = self.tier(tier).config().ttl_with_jitter();
        self.set_with_ttl(key, value, tier, ttl).await;
    }

    /// Write into one tier with an explicit TTL (`None` = never expire)
    pub async fn set_with_ttl(
        &self,
        key: impl Into<CacheKey>,
        value: V,
        tier: Tier,
        ttl: Option<Duration>,
    ) {
        let key = key.into();
        let _guard = self.write_lock.lock().await;
        match tier {
            Tier::L1 => self.write_l1(key, value, ttl).await,
            Tier::L2 => self.l2.set_with_ttl(key, value, ttl).await,
        }
    }

    /// Caller holds `write_lock`
    async fn write_l1(&self, key: CacheKey, value: V, ttl: Option<Duration>) {
        let Some(evicted) = self.l1.insert(key, value, ttl).await else {
            return;
        };

        if !self.demote_evicted || evicted.is_expired() {
            return;
        }
        if self.l2.contains_key(&evicted.key).await {
            return;
        }

        // keep the remaining lifetime, never extend it
        let ttl = match evicted.metadata.ttl {
            Some(_) => match evicted.time_until_expiration() {
                Some(remaining) => Some(remaining),
                None => return,
            },
            None => self.l2.config().ttl_with_jitter(),
        };

        debug!("Demoting {} from l1 to l2 (ttl: {:?})", evicted.key, ttl);
        self.l2.set_with_ttl(evicted.key, evicted.value, ttl).await;
        self.l2_promotions.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove a key from both tiers
    pub async fn delete(&self, key: &str) {
        let _guard = self.write_lock.lock().await;
        self.delete_both(key).await;
    }

    async fn delete_both(&self, key: &str) {
        self.l1.delete(key).await;
        self.l2.delete(key).await;
    }

    /// Clear both tiers and reset all counters
    pub async fn clear(&self) {
        let _guard = self.write_lock.lock().await;
        self.l1.clear().await;
        self.l2.clear().await;
        self.l1_promotions.store(0, Ordering::Relaxed);
        self.l2_promotions.store(0, Ordering::Relaxed);
    }

    /// Delete every key, in either tier, that contains `pattern` as a substring
    pub async fn invalidate_pattern(&self, pattern: &str) -> InvalidationEvent {
        let _guard = self.write_lock.lock().await;
        let mut matched: BTreeSet<CacheKey> = BTreeSet::new();
        matched.extend(self.l1.keys_matching(pattern).await);
        matched.extend(self.l2.keys_matching(pattern).await);

        for key in &matched {
            self.delete_both(key).await;
        }

        InvalidationEvent::new(
            InvalidationReason::PatternMatch {
                pattern: pattern.to_string(),
            },
            matched.into_iter().collect(),
        )
    }

    /// Sweep expired entries out of both tiers
    pub async fn purge_expired(&self) -> Vec<InvalidationEvent> {
        let mut events = Vec::new();

        for tier in [Tier::L1, Tier::L2] {
            let keys = self.tier(tier).purge_expired().await;
            if !keys.is_empty() {
                events.push(InvalidationEvent::new(InvalidationReason::Expired, keys).in_tier(tier));
            }
        }

        events
    }

    pub async fn hot_keys(&self, tier: Tier, n: usize) -> Vec<(CacheKey, u64)> {
        self.tier(tier).hot_keys(n).await
    }

    pub async fn stats(&self) -> TieredStats {
        TieredStats {
            l1: self.l1.stats().await,
            l2: self.l2.stats().await,
            l1_promotions: self.l1_promotions.load(Ordering::Relaxed),
            l2_promotions: self.l2_promotions.load(Ordering::Relaxed),
        }
    }
}

/// Spawn a background task that sweeps expired entries every
/// `cleanup_interval`. Abort the returned handle to stop it.
pub fn spawn_cleanup_task<V>(cache: Arc<TieredCache<V>>) -> JoinHandle<()>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    let period = cache.cleanup_interval;
    info!("Starting cache cleanup task (interval: {:?})", period);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // first tick completes immediately
        interval.tick().await;

        loop {
            interval.tick().await;

            let events = cache.purge_expired().await;
            for event in &events {
                debug!("Cleanup: {}", event);
            }

            let removed: usize = events.iter().map(InvalidationEvent::count).sum();
            if removed > 0 {
                info!("Cleaned up {} expired cache entries", removed);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStats;

    fn config(l1: usize, l2: usize) -> CacheConfig {
        CacheConfig::builder()
            .l1_size(l1)
            .l1_ttl(Some(Duration::from_secs(60)))
            .l2_size(l2)
            .l2_ttl(Some(Duration::from_secs(600)))
            .build()
    }

    #[tokio::test]
    async fn test_l1_hit() {
        let cache: TieredCache<String> = TieredCache::new(&config(2, 4));
        cache.set("k", "v".to_string(), Tier::L1).await;

        assert_eq!(cache.get("k").await, Some("v".to_string()));

        let stats = cache.stats().await;
        assert_eq!(stats.l1.hits, 1);
        assert_eq!(stats.l2.hits + stats.l2.misses, 0);
        assert_eq!(stats.l1_promotions, 0);
    }

    #[tokio::test]
    async fn test_promotion_from_l2() {
        let cache: TieredCache<String> = TieredCache::new(&config(2, 4));
        cache.set("k", "v".to_string(), Tier::L2).await;
        assert!(!cache.l1().contains_key("k").await);

        assert_eq!(cache.get("k").await, Some("v".to_string()));
        assert_eq!(cache.get("k").await, Some("v".to_string()));

        let stats = cache.stats().await;
        assert_eq!(stats.l1_promotions, 1);
        assert_eq!(stats.l2.hits, 1);
        assert_eq!(stats.l1.hits, 1);
        // promotion copies; L2 keeps its entry
        assert!(cache.l2().contains_key("k").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_promoted_entry_uses_l1_ttl() {
        let cache: TieredCache<u32> = TieredCache::new(&config(2, 4));
        cache.set("k", 1, Tier::L2).await;
        cache.get("k").await;

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(!cache.l1().contains_key("k").await);
        assert!(cache.l2().contains_key("k").await);

        // served from L2 again and re-promoted
        assert_eq!(cache.get("k").await, Some(1));
        assert_eq!(cache.stats().await.l1_promotions, 2);
    }

    #[tokio::test]
    async fn test_double_miss_does_not_populate() {
        let cache: TieredCache<String> = TieredCache::new(&config(2, 4));

        assert_eq!(cache.get("missing").await, None);

        let stats = cache.stats().await;
        assert_eq!(stats.l1.misses, 1);
        assert_eq!(stats.l2.misses, 1);
        assert_eq!(stats.l1.size + stats.l2.size, 0);
    }

    #[tokio::test]
    async fn test_set_touches_one_tier_only() {
        let cache: TieredCache<String> = TieredCache::new(&config(2, 4));
        cache.set("a", "1".to_string(), Tier::L1).await;
        cache.set("b", "2".to_string(), Tier::L2).await;

        assert!(cache.l1().contains_key("a").await);
        assert!(!cache.l2().contains_key("a").await);
        assert!(cache.l2().contains_key("b").await);
        assert!(!cache.l1().contains_key("b").await);
    }

    #[tokio::test]
    async fn test_delete_and_clear_both_tiers() {
        let cache: TieredCache<String> = TieredCache::new(&config(2, 4));
        cache.set("k", "v".to_string(), Tier::L2).await;
        cache.get("k").await;

        cache.delete("k").await;
        cache.delete("k").await;
        assert!(!cache.l1().contains_key("k").await);
        assert!(!cache.l2().contains_key("k").await);

        cache.set("x", "y".to_string(), Tier::L1).await;
        cache.clear().await;
        let expected = TieredStats {
            l1: CacheStats {
                max_size: 2,
                ..Default::default()
            },
            l2: CacheStats {
                max_size: 4,
                ..Default::default()
            },
            l1_promotions: 0,
            l2_promotions: 0,
        };
        assert_eq!(cache.stats().await, expected);
    }

    #[tokio::test]
    async fn test_no_demotion_by_default() {
        let cache: TieredCache<u32> = TieredCache::new(&config(1, 4));
        cache.set("a", 1, Tier::L1).await;
        cache.set("b", 2, Tier::L1).await;

        assert_eq!(cache.get("a").await, None);
        assert_eq!(cache.stats().await.l2_promotions, 0);
    }

    #[tokio::test]
    async fn test_demotion_on_l1_eviction() {
        let mut cfg = config(1, 4);
        cfg.demote_evicted = true;
        let cache: TieredCache<u32> = TieredCache::new(&cfg);

        cache.set("a", 1, Tier::L1).await;
        cache.set("b", 2, Tier::L1).await;

        assert!(cache.l2().contains_key("a").await);
        assert_eq!(cache.stats().await.l2_promotions, 1);
        assert_eq!(cache.get("a").await, Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_demotion_keeps_remaining_lifetime() {
        let mut cfg = config(1, 4);
        cfg.demote_evicted = true;
        let cache: TieredCache<u32> = TieredCache::new(&cfg);

        cache.set("x", 1, Tier::L2).await;
        tokio::time::advance(Duration::from_secs(590)).await;
        assert_eq!(cache.get("x").await, Some(1));

        // L2 still holds x, so the evicted L1 copy is not written back
        cache.set("y", 2, Tier::L1).await;
        assert_eq!(cache.stats().await.l2_promotions, 0);

        tokio::time::advance(Duration::from_secs(400)).await;
        assert_eq!(cache.get("x").await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_demoted_entry_expires_with_l1_deadline() {
        let mut cfg = config(1, 4);
        cfg.demote_evicted = true;
        let cache: TieredCache<u32> = TieredCache::new(&cfg);

        cache.set("a", 1, Tier::L1).await;
        tokio::time::advance(Duration::from_secs(40)).await;
        cache.set("b", 2, Tier::L1).await;
        assert!(cache.l2().contains_key("a").await);

        // 20s of the 60s L1 lifetime were left
        tokio::time::advance(Duration::from_secs(21)).await;
        assert!(!cache.l2().contains_key("a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_capacity_l1_does_not_refresh_l2() {
        let mut cfg = config(0, 4);
        cfg.demote_evicted = true;
        let cache: TieredCache<u32> = TieredCache::new(&cfg);

        cache.set("x", 1, Tier::L2).await;
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(100)).await;
            assert_eq!(cache.get("x").await, Some(1));
        }

        tokio::time::advance(Duration::from_secs(101)).await;
        assert_eq!(cache.get("x").await, None);
        assert_eq!(cache.stats().await.l2_promotions, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_delete_racing_promotion_leaves_no_copy() {
        let cache: Arc<TieredCache<u32>> = Arc::new(TieredCache::new(&config(4, 8)));

        for round in 0..2_000u32 {
            cache.set("k", round, Tier::L2).await;

            let reader = tokio::spawn({
                let cache = cache.clone();
                async move { cache.get("k").await }
            });
            let deleter = tokio::spawn({
                let cache = cache.clone();
                async move { cache.delete("k").await }
            });
            reader.await.unwrap();
            deleter.await.unwrap();

            assert!(!cache.l1().contains_key("k").await, "round {}", round);
            assert!(!cache.l2().contains_key("k").await, "round {}", round);
        }
    }

    #[tokio::test]
    async fn test_invalidate_pattern_counts_distinct_keys() {
        let cache: TieredCache<u32> = TieredCache::new(&config(4, 8));
        cache.set("search:rust", 1, Tier::L2).await;
        cache.get("search:rust").await; // now in both tiers
        cache.set("search:go", 2, Tier::L1).await;
        cache.set("llm:hello", 3, Tier::L2).await;

        let event = cache.invalidate_pattern("search:").await;
        assert_eq!(event.count(), 2);
        assert_eq!(event.keys, vec!["search:go", "search:rust"]);

        assert_eq!(cache.get("search:rust").await, None);
        assert_eq!(cache.get("llm:hello").await, Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_pattern_ignores_expired_entries() {
        let cache: TieredCache<u32> = TieredCache::new(&config(4, 8));
        cache.set("news:old", 1, Tier::L1).await;
        cache.set("news:fresh", 2, Tier::L2).await;

        tokio::time::advance(Duration::from_secs(61)).await;

        let event = cache.invalidate_pattern("news:").await;
        assert_eq!(event.keys, vec!["news:fresh"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_reports_per_tier() {
        let cache: TieredCache<u32> = TieredCache::new(&config(4, 8));
        cache.set("hot", 1, Tier::L1).await;
        cache.set("warm", 2, Tier::L2).await;

        tokio::time::advance(Duration::from_secs(120)).await;

        let events = cache.purge_expired().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tier, Some(Tier::L1));
        assert_eq!(events[0].keys, vec!["hot"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task() {
        let cfg = CacheConfig::builder()
            .l1_ttl(Some(Duration::from_secs(1)))
            .cleanup_interval(Duration::from_secs(10))
            .build();
        let cache: Arc<TieredCache<u32>> = Arc::new(TieredCache::new(&cfg));
        cache.set("k", 1, Tier::L1).await;

        let handle = spawn_cleanup_task(cache.clone());
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert_eq!(cache.l1().len().await, 0);
        handle.abort();
    }
}
