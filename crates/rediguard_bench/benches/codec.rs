//! Value codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rediguard_bench::utils::record;
use rediguard_codec::{decode, encode, try_decode, Value};

/// Create a complex nested value.
fn complex_value(depth: usize, width: usize) -> Value {
    if depth == 0 {
        Value::Text("leaf".into())
    } else {
        Value::map((0..width).map(|i| (format!("key_{}", i), complex_value(depth - 1, width))))
    }
}

/// Benchmark encoding scalars, which bypass the serializer.
fn bench_encode_scalar(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_scalar");

    group.bench_function("integer", |b| {
        let value = Value::Integer(42);
        b.iter(|| black_box(encode(black_box(&value)).unwrap()));
    });

    group.bench_function("text_short", |b| {
        let value = Value::Text("zhangsan".into());
        b.iter(|| black_box(encode(black_box(&value)).unwrap()));
    });

    group.bench_function("bool", |b| {
        let value = Value::Bool(true);
        b.iter(|| black_box(encode(black_box(&value)).unwrap()));
    });

    group.finish();
}

/// Benchmark encoding composites of increasing size.
fn bench_encode_composite(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_composite");

    for fields in [4, 16, 64] {
        let value = record(fields, 32);
        let size = encode(&value).unwrap().len();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("record", fields), &value, |b, value| {
            b.iter(|| black_box(encode(black_box(value)).unwrap()));
        });
    }

    for depth in [2, 4] {
        let value = complex_value(depth, 4);
        group.bench_with_input(BenchmarkId::new("nested", depth), &value, |b, value| {
            b.iter(|| black_box(encode(black_box(value)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark decoding plain and tagged payloads.
fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");

    let plain = encode(&Value::Text("zhangsan".into())).unwrap();
    group.bench_function("plain_text", |b| {
        b.iter(|| black_box(try_decode(black_box(&plain)).unwrap()));
    });

    let tagged = encode(&record(16, 32)).unwrap();
    group.throughput(Throughput::Bytes(tagged.len() as u64));
    group.bench_function("record_16", |b| {
        b.iter(|| black_box(try_decode(black_box(&tagged)).unwrap()));
    });

    group.bench_function("missing_with_default", |b| {
        b.iter(|| black_box(decode(black_box(None), Value::Integer(20))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_scalar,
    bench_encode_composite,
    bench_decode,
);

criterion_main!(benches);
