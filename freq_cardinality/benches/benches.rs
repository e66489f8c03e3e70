// This file is part of freq_cardinality. Copyright © 2026 freq_cardinality contributors.
// freq_cardinality is licensed under the GNU GPL v3.0 or any later version. See LICENSE file for full text.

//! Benchmarks for the counter hot paths

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use freq_cardinality::BoundedCounter;

criterion_group!(benches, bench_increment, bench_get, bench_prune_heavy, bench_cardinality);
criterion_main!(benches);

fn random_keys(count: usize) -> Vec<Vec<u8>> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    (0..count)
        .map(|_| {
            let length = rng.gen_range(4..24);
            (0..length).map(|_| rng.gen_range(b'a'..=b'z')).collect()
        })
        .collect()
}

fn bench_increment(c: &mut Criterion) {
    let keys = random_keys(10_000);
    c.bench_function("increment 10k keys, roomy table", |b| {
        b.iter(|| {
            let mut counter = BoundedCounter::new(1 << 16).unwrap();
            for key in &keys {
                counter.increment(key).unwrap();
            }
            counter
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let keys = random_keys(10_000);
    let mut counter = BoundedCounter::new(1 << 16).unwrap();
    for key in &keys {
        counter.increment(key).unwrap();
    }
    c.bench_function("get 10k keys", |b| {
        b.iter(|| {
            let mut sum = 0i64;
            for key in &keys {
                sum += counter.get(black_box(key));
            }
            sum
        })
    });
}

fn bench_prune_heavy(c: &mut Criterion) {
    // a table far smaller than the stream keeps the prune path hot
    let keys = random_keys(50_000);
    c.bench_function("increment 50k keys, 1k-slot table", |b| {
        b.iter(|| {
            let mut counter = BoundedCounter::new(1 << 10).unwrap();
            for key in &keys {
                counter.increment(key).unwrap();
            }
            counter
        })
    });
}

fn bench_cardinality(c: &mut Criterion) {
    let keys = random_keys(50_000);
    let mut counter = BoundedCounter::new(1 << 10).unwrap();
    for key in &keys {
        counter.increment(key).unwrap();
    }
    c.bench_function("cardinality from sketch", |b| {
        b.iter(|| black_box(&counter).cardinality())
    });
}
