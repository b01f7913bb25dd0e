//! Basic benchmarks for the `recycle_pool` package.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use new_zealand::nz;
use recycle_pool::{ConstructionPolicy, RecyclePool};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type TestItem = Vec<u8>;
const TEST_ITEM_LEN: usize = 4096;

fn make_item() -> TestItem {
    vec![0; TEST_ITEM_LEN]
}

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("rp_acquire");

    group.bench_function("construct_without_pool", |b| {
        b.iter(|| drop(black_box(make_item())));
    });

    group.bench_function("reuse_one", |b| {
        let pool = RecyclePool::new(make_item);
        drop(pool.acquire().unwrap());

        b.iter(|| drop(black_box(pool.acquire().unwrap())));
    });

    group.bench_function("reuse_one_reserved", |b| {
        let pool = RecyclePool::builder(make_item)
            .construction(ConstructionPolicy::Reserved)
            .build();
        drop(pool.acquire().unwrap());

        b.iter(|| drop(black_box(pool.acquire().unwrap())));
    });

    group.bench_function("exhausted", |b| {
        let pool = RecyclePool::builder(make_item).limit(nz!(1)).build();
        let _held = pool.acquire().unwrap();

        b.iter(|| black_box(pool.acquire().unwrap()));
    });

    group.finish();

    let mut group = c.benchmark_group("rp_fill");

    group.bench_function("hundred_fresh", |b| {
        b.iter(|| {
            let pool = RecyclePool::new(make_item);
            let items: Vec<_> = (0..100).map(|_| pool.acquire().unwrap()).collect();
            drop(items);
            pool
        });
    });

    group.bench_function("hundred_recycled", |b| {
        let pool = RecyclePool::new(make_item);
        let items: Vec<_> = (0..100).map(|_| pool.acquire().unwrap()).collect();
        drop(items);

        b.iter(|| {
            let items: Vec<_> = (0..100).map(|_| pool.acquire().unwrap()).collect();
            drop(black_box(items));
        });
    });

    group.finish();
}
