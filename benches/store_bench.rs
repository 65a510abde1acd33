//! Benchmarks for kegdb store operations

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use tempfile::TempDir;

use kegdb::{CacheOptions, Config, ListOptions, Store};

fn store_benchmarks(c: &mut Criterion) {
    let dir = TempDir::new().expect("temp dir");
    let config = Config::builder()
        .path(dir.path())
        .cache(CacheOptions::Disabled)
        .build();
    let mut store = Store::open(config).expect("store opens");
    store
        .create_bucket_from_example("bench", &json!({ "id": 0, "name": "x", "age": 0 }))
        .expect("bucket");

    let mut next_id = 0i64;
    c.bench_function("create", |b| {
        b.iter(|| {
            let item = json!({ "id": next_id, "name": "value", "age": next_id });
            store.create("bench", &item).expect("create");
            next_id += 1;
        })
    });

    c.bench_function("get", |b| {
        b.iter(|| store.get("bench", "0").expect("get"))
    });

    c.bench_function("get_items_page", |b| {
        b.iter(|| {
            store
                .get_items("bench", ListOptions { take: 10, ..Default::default() })
                .expect("get_items")
        })
    });
}

criterion_group!(benches, store_benchmarks);
criterion_main!(benches);
