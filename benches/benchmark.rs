//! Put/get throughput benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use siltdb::{OptionsBuilder, Store};
use tempfile::tempdir;

fn bench_put(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let options = OptionsBuilder::new()
        .auto_sync(false)
        .wal_size(8 * 1024 * 1024)
        .build()
        .unwrap();
    let store = Store::open_with_options(dir.path(), options).unwrap();

    let mut i = 0u64;
    c.bench_function("put", |b| {
        b.iter(|| {
            let key = format!("key-{:012}", i);
            i += 1;
            store.put(black_box(key.as_bytes()), black_box(b"value")).unwrap();
        })
    });
}

fn bench_get(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let options = OptionsBuilder::new()
        .auto_sync(false)
        .wal_size(8 * 1024 * 1024)
        .build()
        .unwrap();
    let store = Store::open_with_options(dir.path(), options).unwrap();

    for i in 0..10_000u64 {
        let key = format!("key-{:012}", i);
        store.put(key.as_bytes(), b"value").unwrap();
    }

    let mut i = 0u64;
    c.bench_function("get", |b| {
        b.iter(|| {
            let key = format!("key-{:012}", i % 10_000);
            i += 1;
            black_box(store.get(key.as_bytes()).unwrap());
        })
    });
}

criterion_group!(benches, bench_put, bench_get);
criterion_main!(benches);
