//! Client benchmarks against the in-memory server.
//!
//! These measure the wrapper's own overhead: key mapping, encoding,
//! dispatch and lock bookkeeping.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rediguard_bench::utils::{key_names, memory_client, record};
use rediguard_core::{KeyCodec, Value};

/// Benchmark single-key string operations.
fn bench_strings(c: &mut Criterion) {
    let mut group = c.benchmark_group("strings");
    let client = memory_client("bench_");

    group.bench_function("set_text", |b| {
        b.iter(|| client.set(black_box("name"), "zhangsan", None).unwrap());
    });

    client.set("name", "zhangsan", None).unwrap();
    group.bench_function("get_text", |b| {
        b.iter(|| black_box(client.get(black_box("name"), "default").unwrap()));
    });

    group.bench_function("inc", |b| {
        b.iter(|| black_box(client.inc(black_box("counter"), 1).unwrap()));
    });

    let profile = record(8, 16);
    group.bench_function("set_record", |b| {
        b.iter(|| client.set("profile", black_box(profile.clone()), None).unwrap());
    });

    group.finish();
}

/// Benchmark the lock acquire/release cycle.
fn bench_locks(c: &mut Criterion) {
    let mut group = c.benchmark_group("locks");
    let client = memory_client("bench_");

    group.bench_function("acquire_release", |b| {
        b.iter(|| {
            assert!(client.lock(black_box("job"), 10).unwrap());
            client.unlock("job").unwrap();
        });
    });

    client.lock("held", 10).unwrap();
    group.bench_function("acquire_busy", |b| {
        b.iter(|| black_box(client.lock(black_box("held"), 10).unwrap()));
    });

    group.finish();
}

/// Benchmark bulk listing as the keyspace grows.
fn bench_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("bulk");

    for count in [100, 1_000] {
        let client = memory_client("bench_");
        for name in key_names(count) {
            client.set(&name, Value::Integer(1), None).unwrap();
        }
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("all_data", count), &client, |b, client| {
            b.iter(|| black_box(client.all_data(false).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark logical-to-physical key mapping.
fn bench_key_mapping(c: &mut Criterion) {
    let keys = KeyCodec::new("a1b2c3_");
    c.bench_function("key_physical", |b| {
        b.iter(|| black_box(keys.physical(black_box("session:12345"))));
    });
    c.bench_function("key_lock", |b| {
        b.iter(|| black_box(keys.lock_key(black_box("foo"))));
    });
}

criterion_group!(benches, bench_strings, bench_locks, bench_bulk, bench_key_mapping);
criterion_main!(benches);
