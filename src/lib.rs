//! # tiercache
//!
//! A tiered in-memory cache for chat backends that route requests to
//! third-party LLM, search and news providers.
//!
//! ## Features
//!
//! - Single-tier LRU cache with optional per-entry TTL
//! - Two-tier (L1/L2) cache with read-through promotion
//! - Cache-aware invocation wrapper keyed by operation name and arguments
//! - Warm-up from registered loaders, with a per-loader timeout
//! - Hit/miss/eviction statistics and hot-key ranking
//! - Async-first, every tier guarded by its own lock
//!
//! ## Single tier
//!
//! ```rust
//! use tiercache::LruCache;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let cache: LruCache<String> = LruCache::with_capacity(3, None);
//!
//! for q in ["q1", "q2", "q3", "q4"] {
//!     cache.set(q, format!("answer to {}", q)).await;
//! }
//!
//! assert!(cache.get("q1").await.is_none());
//! assert!(cache.get("q4").await.is_some());
//! assert_eq!(cache.stats().await.evictions, 1);
//! # }
//! ```
//!
//! ## Wrapping a computation
//!
//! ```rust
//! use tiercache::{CacheConfig, CacheOptimizer, CallOptions, Tier};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let optimizer: CacheOptimizer<String> = CacheOptimizer::new(CacheConfig::from_env()?)?;
//!
//! optimizer
//!     .register_warmup("models", || async { Ok("llama,mixtral".to_string()) })
//!     .await;
//! let report = optimizer.warm_cache().await;
//! println!("Cache warmed: {}", report);
//!
//! let completion = optimizer
//!     .call("llm:greeting", CallOptions::in_tier(Tier::L1), || async {
//!         // the real provider call goes here
//!         Ok::<_, anyhow::Error>("Hello!".to_string())
//!     })
//!     .await?;
//! println!("{}", completion);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;

// Re-export main types for convenience
pub use cache::{
    digest, response_key, spawn_cleanup_task, CacheConfig, CacheConfigBuilder, CacheEntry,
    CacheKey, CacheMetadata, CacheOptimizer, CacheStats, CachedFn, CallArgs, CallOptions,
    InvalidationEvent, InvalidationReason, Invocation, LruCache, Tier, TierConfig, TieredCache,
    TieredStats, WarmupReport,
};
pub use error::{CacheError, Result};
