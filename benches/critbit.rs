//! Benchmarks for critbit tree operations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use critbit_rs::{Flow, Tree};
use std::collections::BTreeMap;

fn generate_url_like_keys(n: usize) -> Vec<Vec<u8>> {
    let hosts = ["example.com", "test.org", "demo.net"];
    let paths = ["users", "posts", "api/v1", "api/v2"];

    (0..n)
        .map(|i| {
            let host = hosts[i % hosts.len()];
            let path = paths[(i / hosts.len()) % paths.len()];
            let id = i / (hosts.len() * paths.len());
            format!("{host}/{path}/{id}").into_bytes()
        })
        .collect()
}

fn build(keys: &[Vec<u8>]) -> Tree<Vec<u8>, u64> {
    keys.iter().cloned().zip(0..).collect()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_url_like_keys(size);

        group.bench_with_input(BenchmarkId::new("in_place", size), &keys, |b, keys| {
            b.iter(|| black_box(build(keys)));
        });

        group.bench_with_input(BenchmarkId::new("persistent", size), &keys, |b, keys| {
            b.iter(|| {
                let mut t = Tree::new();
                for (i, key) in keys.iter().enumerate() {
                    t = t.with(key.clone(), i as u64);
                }
                black_box(t)
            });
        });

        group.bench_with_input(BenchmarkId::new("BTreeMap", size), &keys, |b, keys| {
            b.iter(|| {
                let map: BTreeMap<Vec<u8>, u64> = keys.iter().cloned().zip(0..).collect();
                black_box(map)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");

    for size in [1_000, 10_000, 100_000] {
        let keys = generate_url_like_keys(size);
        let tree = build(&keys);

        group.bench_with_input(BenchmarkId::new("Tree", size), &keys, |b, keys| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys {
                    if let Some(v) = tree.lookup(key) {
                        sum += v;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_update_shared(c: &mut Criterion) {
    let mut group = c.benchmark_group("update_shared");

    for size in [1_000, 100_000] {
        let keys = generate_url_like_keys(size);
        let base = build(&keys);

        group.bench_with_input(BenchmarkId::new("with", size), &keys, |b, keys| {
            b.iter(|| {
                let mut total = 0;
                for key in keys.iter().step_by(97) {
                    total += base.with(key.clone(), 0).len();
                }
                black_box(total)
            });
        });
    }

    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");

    for size in [1_000, 10_000] {
        let keys = generate_url_like_keys(size);
        let (left, right) = keys.split_at(size / 2);
        let a = build(left);
        let b = build(right);

        group.bench_function(BenchmarkId::new("halves", size), |bench| {
            bench.iter(|| black_box(Tree::merge([&a, &b])));
        });
    }

    group.finish();
}

fn bench_for_each(c: &mut Criterion) {
    let tree = build(&generate_url_like_keys(10_000));

    c.bench_function("for_each/10000", |b| {
        b.iter(|| {
            let mut sum = 0u64;
            tree.for_each(|_, v| {
                sum += v;
                Ok::<_, critbit_rs::BoxError>(Flow::Continue)
            })
            .ok();
            black_box(sum)
        });
    });
}

criterion_group!(
    benches,
    bench_insert,
    bench_lookup,
    bench_update_shared,
    bench_merge,
    bench_for_each
);
criterion_main!(benches);
