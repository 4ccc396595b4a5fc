//! Benchmarks for local- and remote-tier read/write latency.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tiered_cache::{CacheProvider, CacheProviderOptions, GetOptions, Primitive, SetOptions, TierLevel};
use tokio::runtime::Runtime;

fn setup_provider(level: TierLevel) -> (CacheProvider, Runtime, TierLevel) {
    let rt = Runtime::new().unwrap_or_else(|_| panic!("failed to create runtime"));
    let provider = rt.block_on(async {
        let opts = CacheProviderOptions::new("bench").with_single("127.0.0.1", 6379);
        CacheProvider::new(opts).await.unwrap_or_else(|_| panic!("failed to create provider"))
    });
    (provider, rt, level)
}

fn test_value(size_bytes: usize) -> Primitive {
    Primitive::String("x".repeat(size_bytes))
}

fn bench_set(c: &mut Criterion) {
    let mut group = c.benchmark_group("set");

    for (label, level) in [("local", TierLevel::LOCAL), ("remote", TierLevel::REMOTE), ("both", TierLevel::BOTH)] {
        let (provider, rt, level) = setup_provider(level);
        for size in &[100usize, 1024, 10_240] {
            group.bench_with_input(BenchmarkId::new(label, size), size, |b, _| {
                b.iter(|| {
                    rt.block_on(async {
                        let key = format!("bench-set-{}", rand::random::<u32>());
                        provider
                            .set_primitive(
                                &key,
                                black_box(test_value(*size)),
                                SetOptions { level: Some(level), ..Default::default() },
                            )
                            .await
                            .unwrap_or_else(|_| panic!("failed to set"));
                    });
                });
            });
        }
    }

    group.finish();
}

fn bench_local_hit(c: &mut Criterion) {
    let (provider, rt, _) = setup_provider(TierLevel::LOCAL);

    rt.block_on(async {
        for i in 0..100 {
            provider
                .set_primitive(
                    &format!("bench-local-{i}"),
                    test_value(1024),
                    SetOptions { level: Some(TierLevel::LOCAL), ..Default::default() },
                )
                .await
                .unwrap_or_else(|_| panic!("failed to warm local tier"));
        }
    });

    c.bench_function("local_cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench-local-{}", rand::random::<u8>() % 100);
                black_box(
                    provider
                        .get_primitive(&key, GetOptions::default())
                        .await
                        .unwrap_or_else(|_| panic!("failed to get")),
                );
            });
        });
    });
}

fn bench_remote_hit(c: &mut Criterion) {
    let (provider, rt, _) = setup_provider(TierLevel::REMOTE);

    rt.block_on(async {
        for i in 0..100 {
            provider
                .set_primitive(
                    &format!("bench-remote-{i}"),
                    test_value(1024),
                    SetOptions { level: Some(TierLevel::REMOTE), ..Default::default() },
                )
                .await
                .unwrap_or_else(|_| panic!("failed to warm remote tier"));
        }
    });

    c.bench_function("remote_cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench-remote-{}", rand::random::<u8>() % 100);
                black_box(
                    provider
                        .get_primitive(&key, GetOptions { force_remote: true, ..Default::default() })
                        .await
                        .unwrap_or_else(|_| panic!("failed to get")),
                );
            });
        });
    });
}

fn bench_cache_miss(c: &mut Criterion) {
    let (provider, rt, _) = setup_provider(TierLevel::BOTH);

    c.bench_function("cache_miss", |b| {
        b.iter(|| {
            rt.block_on(async {
                let key = format!("bench-miss-{}", rand::random::<u32>());
                black_box(
                    provider
                        .get_primitive(&key, GetOptions::default())
                        .await
                        .unwrap_or_else(|_| panic!("failed to get")),
                );
            });
        });
    });
}

criterion_group!(benches, bench_set, bench_local_hit, bench_remote_hit, bench_cache_miss);
criterion_main!(benches);
