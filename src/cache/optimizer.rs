//! Cache-aware invocation and warm-up
//!
//! [`CacheOptimizer`] sits in front of expensive work (LLM completions, tool
//! calls, search queries) and serves repeated identical invocations from a
//! [`TieredCache`]:
//!
//! - on a hit the wrapped computation is not run at all
//! - on a miss it runs once and its result is stored at the configured tier
//! - a failing computation returns its error unchanged and caches nothing
//!
//! Warm-up loaders registered with [`CacheOptimizer::register_warmup`] are run
//! by [`CacheOptimizer::warm_cache`], typically at startup, and fill L2.
//!
//! ## Example
//!
//! ```rust
//! use tiercache::{CacheConfig, CacheOptimizer, CallArgs, CallOptions};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let optimizer: CacheOptimizer<String> = CacheOptimizer::new(CacheConfig::default())?;
//!
//! let search = optimizer.cached("web_search", |args: CallArgs| async move {
//!     let query = args.positional()[0].as_str().unwrap_or_default().to_string();
//!     Ok::<_, anyhow::Error>(format!("results for {}", query))
//! });
//!
//! let args = CallArgs::new().arg("rust lru")?;
//! let first = search.invoke(args.clone()).await?;
//! let second = search.invoke(args).await?;
//! assert!(!first.from_cache);
//! assert!(second.from_cache);
//!
//! let answer = optimizer
//!     .call("llm:hello", CallOptions::default(), || async {
//!         Ok::<_, anyhow::Error>("hi".to_string())
//!     })
//!     .await?;
//! assert_eq!(answer, "hi");
//! # Ok(())
//! # }
//! ```

use crate::cache::{
    config::CacheConfig,
    keys::CallArgs,
    tiered::TieredCache,
    types::{CacheKey, Tier, TieredStats},
};
use crate::error::Result;
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// Zero-argument warm-up loader
pub type Loader<V> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<V>> + Send + Sync>;

/// Custom key derivation for a wrapped function
pub type KeyFn = Arc<dyn Fn(&CallArgs) -> CacheKey + Send + Sync>;

/// Where and for how long a wrapped call's result is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallOptions {
    pub tier: Tier,

    /// Overrides the tier's default TTL when set
    pub ttl: Option<Duration>,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            tier: Tier::L1,
            ttl: None,
        }
    }
}

impl CallOptions {
    pub fn in_tier(tier: Tier) -> Self {
        Self { tier, ttl: None }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

/// Result of a wrapped call, with where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation<V> {
    pub value: V,

    /// True when served from cache without running the computation
    pub from_cache: bool,
}

/// Summary of one `warm_cache` run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarmupReport {
    pub loaded: usize,
    pub total: usize,

    /// Keys whose loader failed or timed out
    pub failed: Vec<CacheKey>,

    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

impl WarmupReport {
    pub fn is_complete(&self) -> bool {
        self.loaded == self.total
    }
}

impl std::fmt::Display for WarmupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{} keys in {:.2}s",
            self.loaded,
            self.total,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Cache front-end for expensive computations
pub struct CacheOptimizer<V> {
    cache: Arc<TieredCache<V>>,

    /// Registered (key, loader) pairs, in registration order
    warmup: Mutex<Vec<(CacheKey, Loader<V>)>>,

    /// Upper bound on a single loader
    warmup_timeout: Duration,
}

impl<V> CacheOptimizer<V>
where
    V: Clone + Serialize + Send + Sync + 'static,
{
    /// Create an optimizer with its own tiered cache
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(TieredCache::new(&config));
        Ok(Self::from_cache(cache, config.warmup_timeout))
    }

    /// Wrap an existing (possibly shared) tiered cache
    pub fn from_cache(cache: Arc<TieredCache<V>>, warmup_timeout: Duration) -> Self {
        Self {
            cache,
            warmup: Mutex::new(Vec::new()),
            warmup_timeout,
        }
    }

    /// Get the underlying cache instance
    pub fn cache(&self) -> Arc<TieredCache<V>> {
        self.cache.clone()
    }

    /// Serve `key` from cache, or run `compute` and store its result
    pub async fn invoke<F, Fut, E>(
        &self,
        key: impl Into<CacheKey>,
        options: CallOptions,
        compute: F,
    ) -> std::result::Result<Invocation<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        invoke_cached(&self.cache, key.into(), options, compute).await
    }

    /// Same as [`invoke`](Self::invoke), returning only the value
    pub async fn call<F, Fut, E>(
        &self,
        key: impl Into<CacheKey>,
        options: CallOptions,
        compute: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<V, E>>,
    {
        Ok(self.invoke(key, options, compute).await?.value)
    }

    /// Wrap `func` so calls are keyed by `name` and their arguments
    pub fn cached<F>(&self, name: impl Into<String>, func: F) -> CachedFn<V, F> {
        CachedFn {
            cache: self.cache.clone(),
            name: name.into(),
            options: CallOptions::default(),
            key_fn: None,
            func,
        }
    }

    /// Register a loader for cache warming. Nothing runs until
    /// [`warm_cache`](Self::warm_cache).
    pub async fn register_warmup<F, Fut>(&self, key: impl Into<CacheKey>, loader: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let loader: Loader<V> = Arc::new(move || loader().boxed());
        self.warmup.lock().await.push((key.into(), loader));
    }

    pub async fn warmup_len(&self) -> usize {
        self.warmup.lock().await.len()
    }

    /// Run every registered loader once, in registration order, storing
    /// results in L2. A failing or slow loader is logged and skipped.
    pub async fn warm_cache(&self) -> WarmupReport {
        let entries: Vec<(CacheKey, Loader<V>)> = self.warmup.lock().await.clone();
        let total = entries.len();
        info!("Warming cache with {} keys...", total);

        let started_at = Utc::now();
        let start = Instant::now();
        let mut loaded = 0;
        let mut failed = Vec::new();

        for (key, loader) in entries {
            match tokio::time::timeout(self.warmup_timeout, loader()).await {
                Ok(Ok(value)) => {
                    self.cache.set(key, value, Tier::L2).await;
                    loaded += 1;
                }
                Ok(Err(e)) => {
                    error!("Failed to warm key '{}': {:#}", key, e);
                    failed.push(key);
                }
                Err(_) => {
                    warn!(
                        "Warm-up loader for '{}' timed out after {:?}",
                        key, self.warmup_timeout
                    );
                    failed.push(key);
                }
            }
        }

        let report = WarmupReport {
            loaded,
            total,
            failed,
            started_at,
            elapsed: start.elapsed(),
        };
        info!("Cache warmed: {}", report);
        report
    }

    /// Delete every key containing `pattern` from both tiers.
    /// Returns the number of distinct keys removed.
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        let event = self.cache.invalidate_pattern(pattern).await;
        info!("Invalidated {} keys matching '{}'", event.count(), pattern);
        event.count()
    }

    pub async fn stats(&self) -> TieredStats {
        self.cache.stats().await
    }

    pub async fn hot_keys(&self, tier: Tier, n: usize) -> Vec<(CacheKey, u64)> {
        self.cache.hot_keys(tier, n).await
    }
}

async fn invoke_cached<V, F, Fut, E>(
    cache: &TieredCache<V>,
    key: CacheKey,
    options: CallOptions,
    compute: F,
) -> std::result::Result<Invocation<V>, E>
where
    V: Clone + Serialize + Send,
    F: FnOnce() -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
{
    if let Some(value) = cache.get(&key).await {
        return Ok(Invocation {
            value,
            from_cache: true,
        });
    }

    let value = compute().await?;

    match options.ttl {
        Some(ttl) => {
            cache
                .set_with_ttl(key.clone(), value.clone(), options.tier, Some(ttl))
                .await
        }
        None => cache.set(key.clone(), value.clone(), options.tier).await,
    }
    debug!("Cached result for {} in {}", key, options.tier);

    Ok(Invocation {
        value,
        from_cache: false,
    })
}

/// A function whose results are cached by name and arguments
///
/// Built by [`CacheOptimizer::cached`].
pub struct CachedFn<V, F> {
    cache: Arc<TieredCache<V>>,
    name: String,
    options: CallOptions,
    key_fn: Option<KeyFn>,
    func: F,
}

impl<V, F> CachedFn<V, F> {
    pub fn with_options(mut self, options: CallOptions) -> Self {
        self.options = options;
        self
    }

    /// Replace the default name+arguments digest
    pub fn with_key_fn<K>(mut self, key_fn: K) -> Self
    where
        K: Fn(&CallArgs) -> CacheKey + Send + Sync + 'static,
    {
        self.key_fn = Some(Arc::new(key_fn));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cache key a call with `args` would use
    pub fn key_for(&self, args: &CallArgs) -> CacheKey {
        match &self.key_fn {
            Some(key_fn) => key_fn(args),
            None => args.cache_key(&self.name),
        }
    }
}

impl<V, F, Fut, E> CachedFn<V, F>
where
    V: Clone + Serialize + Send,
    F: Fn(CallArgs) -> Fut,
    Fut: Future<Output = std::result::Result<V, E>>,
{
    pub async fn invoke(&self, args: CallArgs) -> std::result::Result<Invocation<V>, E> {
        let key = self.key_for(&args);
        invoke_cached(&self.cache, key, self.options, || (self.func)(args)).await
    }

    pub async fn call(&self, args: CallArgs) -> std::result::Result<V, E> {
        Ok(self.invoke(args).await?.value)
    }
}
