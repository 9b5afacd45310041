//! Throughput Benchmark for unikv
//!
//! This benchmark measures the in-process store under various workloads,
//! both through its synchronous API and through the async contract.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use unikv::{KvStore, MemoryStore, MemoryStoreConfig, Value};

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// The sweep task needs a runtime context at construction
fn new_store(rt: &Runtime) -> Arc<MemoryStore> {
    let _guard = rt.enter();
    Arc::new(MemoryStore::new())
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let rt = runtime();
    let store = new_store(&rt);

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(&format!("key:{}", i), "small_value", None).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_medium", |b| {
        let mut i = 0u64;
        let value = Value::from("x".repeat(1024)); // 1KB value
        b.iter(|| {
            store.set(&format!("key:{}", i), value.clone(), None).unwrap();
            i += 1;
        });
    });

    group.bench_function("set_integer", |b| {
        let mut i = 0i64;
        b.iter(|| {
            store.set(&format!("num:{}", i), i, None).unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let rt = runtime();
    let store = new_store(&rt);

    // Pre-populate with data
    for i in 0..100_000 {
        store.set(&format!("key:{}", i), format!("value:{}", i), None).unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)).unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark mixed workload (80% reads, 20% writes)
fn bench_mixed(c: &mut Criterion) {
    let rt = runtime();
    let store = new_store(&rt);

    for i in 0..10_000 {
        store.set(&format!("key:{}", i), format!("value:{}", i), None).unwrap();
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                store.set(&format!("new:{}", i), "value", None).unwrap();
            } else {
                black_box(store.get(&format!("key:{}", i % 10_000)).unwrap());
            }
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark counter operations
fn bench_incr(c: &mut Criterion) {
    let rt = runtime();
    let store = new_store(&rt);

    let mut group = c.benchmark_group("incr");
    group.throughput(Throughput::Elements(1));

    // Single counter (high contention)
    group.bench_function("single_counter", |b| {
        b.iter(|| {
            black_box(store.increment("counter", 1).unwrap());
        });
    });

    // Counter with a TTL that must survive every update
    group.bench_function("counter_with_ttl", |b| {
        store.set("ttl_counter", 0, Some(3600)).unwrap();
        b.iter(|| {
            black_box(store.increment("ttl_counter", 1).unwrap());
        });
    });

    group.bench_function("multiple_counters", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.increment(&format!("counter:{}", i % 1000), 1).unwrap());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark calls dispatched through `dyn KvStore`
fn bench_contract(c: &mut Criterion) {
    let rt = runtime();
    let store: Arc<dyn KvStore> = new_store(&rt);

    let mut group = c.benchmark_group("contract");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_get", |b| {
        let mut i = 0u64;
        b.iter(|| {
            rt.block_on(async {
                let key = format!("key:{}", i % 10_000);
                store.set(&key, Value::from("value"), None).await.unwrap();
                black_box(store.get(&key).await.unwrap());
            });
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let rt = runtime();
    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = new_store(&rt);
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.set(&key, "value", None).unwrap();
                            store.get(&key).unwrap();
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

/// Benchmark expiry operations
fn bench_expiry(c: &mut Criterion) {
    let rt = runtime();
    let store = new_store(&rt);

    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(&format!("key:{}", i), "value", Some(3600)).unwrap();
            i += 1;
        });
    });

    group.bench_function("expire_existing", |b| {
        for i in 0..10_000 {
            store.set(&format!("expire:{}", i), "value", None).unwrap();
        }

        let mut i = 0u64;
        b.iter(|| {
            store.expire(&format!("expire:{}", i % 10_000), 3600).unwrap();
            i += 1;
        });
    });

    group.bench_function("sweep_10k", |b| {
        b.iter(|| {
            let store = {
                let _guard = rt.enter();
                MemoryStore::with_config(MemoryStoreConfig::new().with_max_size(10_000))
            };
            for i in 0..10_000 {
                store.set(&format!("k:{}", i), "value", Some(3600)).unwrap();
            }
            black_box(store.remove_expired());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_incr,
    bench_contract,
    bench_concurrent,
    bench_expiry,
);

criterion_main!(benches);
