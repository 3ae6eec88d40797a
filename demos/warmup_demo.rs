//! Cache Warm-up Demo
//!
//! Warms a tiered cache from loaders, then serves a few wrapped "provider"
//! calls and prints the resulting statistics.
//!
//! Usage:
//!   cargo run --example warmup_demo
//!
//! Environment variables (also read from `.env`):
//!   CACHE_L1_SIZE, CACHE_L1_TTL_SECS, CACHE_L2_SIZE, CACHE_L2_TTL_SECS,
//!   CACHE_WARMUP_TIMEOUT_SECS, CACHE_CLEANUP_INTERVAL_SECS,
//!   CACHE_DEMOTE_EVICTED (true/false, 1/0, yes/no, on/off)
//!   RUST_LOG - log filter (default: info)

use std::time::Duration;
use tiercache::{spawn_cleanup_task, CacheConfig, CacheOptimizer, CallArgs, CallOptions, Tier};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::from_env()?;
    info!("Using cache config: {:?}", config);

    let optimizer: CacheOptimizer<String> = CacheOptimizer::new(config)?;
    let cleanup = spawn_cleanup_task(optimizer.cache());

    optimizer
        .register_warmup("models", || async { Ok("llama-3,mixtral".to_string()) })
        .await;
    optimizer
        .register_warmup("headlines", || async {
            anyhow::bail!("news provider unavailable")
        })
        .await;

    let report = optimizer.warm_cache().await;
    info!("Warm-up finished: {}", report);

    let search = optimizer
        .cached("web_search", |args: CallArgs| async move {
            // stand-in for a slow provider round-trip
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, anyhow::Error>(format!("results for {}", args.positional()[0]))
        })
        .with_options(CallOptions::in_tier(Tier::L1).with_ttl(Duration::from_secs(30)));

    for _ in 0..3 {
        let args = CallArgs::new().arg("rust lru cache")?;
        let outcome = search.invoke(args).await?;
        info!("search served from cache: {}", outcome.from_cache);
    }

    if let Some(models) = optimizer.cache().get("models").await {
        info!("models: {}", models);
    }

    info!("Hot L1 keys: {:?}", optimizer.hot_keys(Tier::L1, 5).await);
    info!("\n{}", optimizer.stats().await);

    cleanup.abort();
    Ok(())
}
