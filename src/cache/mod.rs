//! # Tiered Response Cache
//!
//! In-memory caching for expensive, repeatable calls: LLM completions, tool
//! invocations and search queries.
//!
//! ## Features
//!
//! - **LRU Eviction**: fixed-capacity tiers, one eviction per growing insert
//! - **TTL-Based Expiration**: per-entry time-to-live, checked lazily on read
//!   and by an optional background sweep
//! - **Two Tiers**: small hot L1 in front of a larger warm L2, with L2 hits
//!   promoted into L1
//! - **Invocation Wrapper**: compute-on-miss, nothing cached on failure
//! - **Warm-up**: registered loaders pre-populate L2
//! - **Statistics**: hit rate, evictions, hot keys, size accounting
//!
//! ## Example
//!
//! ```rust
//! use tiercache::cache::{CacheConfig, Tier, TieredCache};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let config = CacheConfig::builder()
//!     .l1_size(100)
//!     .l1_ttl(Some(Duration::from_secs(60)))
//!     .l2_size(1_000)
//!     .l2_ttl(Some(Duration::from_secs(600)))
//!     .build();
//!
//! let cache: TieredCache<String> = TieredCache::new(&config);
//!
//! cache.set("query:123", "cached response".to_string(), Tier::L2).await;
//!
//! // L2 hit, promoted into L1
//! if let Some(value) = cache.get("query:123").await {
//!     println!("Cache hit: {}", value);
//! }
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod invalidation;
pub mod keys;
pub mod optimizer;
pub mod store;
pub mod tiered;
pub mod types;

pub use config::{CacheConfig, CacheConfigBuilder, TierConfig};
pub use entry::{CacheEntry, CacheMetadata};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use keys::{digest, response_key, CallArgs};
pub use optimizer::{CacheOptimizer, CachedFn, CallOptions, Invocation, WarmupReport};
pub use store::LruCache;
pub use tiered::{spawn_cleanup_task, TieredCache};
pub use types::{CacheKey, CacheStats, Tier, TieredStats};
