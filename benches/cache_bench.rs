//! Hot-path benchmarks for the tiered cache

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tiercache::{CacheConfig, CallArgs, Tier, TieredCache};
use tokio::runtime::Runtime;

fn bench_tiered(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let cache: TieredCache<String> = TieredCache::new(&CacheConfig::default());

    rt.block_on(async {
        for i in 0..100 {
            cache.set(format!("k{}", i), "x".repeat(256), Tier::L1).await;
            cache.set(format!("w{}", i), "y".repeat(256), Tier::L2).await;
        }
    });

    let cache = &cache;

    c.bench_function("tiered_get_l1_hit", |b| {
        b.to_async(&rt).iter(move || async move { black_box(cache.get("k42").await) })
    });

    c.bench_function("tiered_get_miss", |b| {
        b.to_async(&rt).iter(move || async move { black_box(cache.get("absent").await) })
    });

    c.bench_function("tiered_set_l2", |b| {
        b.to_async(&rt)
            .iter(move || async move { cache.set("bench", "z".to_string(), Tier::L2).await })
    });
}

fn bench_keys(c: &mut Criterion) {
    let args = CallArgs::new()
        .arg("what is the weather in Paris")
        .and_then(|a| a.kwarg("model", "llama-3"))
        .and_then(|a| a.kwarg("temperature", 0.2))
        .expect("serializable args");

    c.bench_function("call_args_cache_key", |b| {
        b.iter(|| black_box(args.cache_key("chat_completion")))
    });
}

criterion_group!(benches, bench_tiered, bench_keys);
criterion_main!(benches);
