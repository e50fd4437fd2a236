use std::sync::Arc;
use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use serde_json::json;

use lockable_core::allocator::Allocator;
use lockable_core::catalog::Catalog;
use lockable_core::config::AllocatorConfig;
use lockable_core::infrastructure::LockStore;
use lockable_core::infrastructure_fs::FileLockStore;
use lockable_core::infrastructure_in_memory::InMemoryLockStore;

fn candidates(count: usize) -> Vec<lockable_core::types::Resource> {
    let entries: Vec<_> = (0..count).map(|i| json!({"id": format!("r{}", i)})).collect();
    Catalog::from_value(json!(entries)).unwrap().resources().to_vec()
}

fn bench_acquire_release(c: &mut Criterion) {
    let config = AllocatorConfig::default().with_timeout(Duration::from_secs(1));
    let dir = tempfile::tempdir().unwrap();

    let stores: Vec<(&str, Arc<dyn LockStore>)> = vec![
        ("in_memory", Arc::new(InMemoryLockStore::new())),
        ("file", Arc::new(FileLockStore::open(dir.path()).unwrap())),
    ];

    let mut group = c.benchmark_group("lease_acquire_release_cycle");
    for (name, store) in stores {
        let allocator = Allocator::new(config.clone(), store);
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut lease = allocator.acquire_one(candidates(4)).unwrap();
                lease.release();
            })
        });
    }
    group.finish();
}

fn bench_busy_pool(c: &mut Criterion) {
    let mut group = c.benchmark_group("lease_busy_pool");

    for held in [10, 50, 100] {
        group.bench_with_input(BenchmarkId::new("held", held), &held, |b, &held| {
            let store = InMemoryLockStore::new();
            let allocator = Allocator::new(
                AllocatorConfig::default().with_timeout(Duration::from_secs(1)),
                Arc::new(store.clone()),
            );
            let pool = candidates(held + 1);
            // Every slot but the last one stays taken
            let _slots: Vec<_> = pool[..held]
                .iter()
                .map(|r| store.try_acquire(r.id()).unwrap().unwrap())
                .collect();

            b.iter(|| {
                let lease = allocator.acquire_one(pool.clone()).unwrap();
                drop(lease);
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_acquire_release, bench_busy_pool);
criterion_main!(benches);
