//! Micro-benchmarks for rockcore's storage primitives.
//!
//! Uses Criterion for statistically rigorous measurement with regression
//! detection and HTML reports.
//!
//! # Running
//!
//! ```bash
//! cargo bench --bench micro              # run all micro-benchmarks
//! cargo bench --bench micro -- varint    # filter by name
//! ```
//!
//! Reports are generated in `target/criterion/report/index.html`.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use rockcore::cache::{Cache, CacheKey};
use rockcore::checksum::{self, ChecksumType};
use rockcore::encoding::{append_varint32, append_varint64, decode_varint32, decode_varint64};
use rockcore::filter::BloomBuilder;
use rockcore::memtable::{Memtable, ValueType};

/// Format a zero-padded key.
fn make_key(i: u64) -> Vec<u8> {
    format!("key-{i:012}").into_bytes()
}

// ------------------------------------------------------------------------------------------------
// Encoding
// ------------------------------------------------------------------------------------------------

fn bench_varint32_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint32");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode_decode", |b| {
        b.iter_batched(
            Vec::new,
            |mut buf| {
                append_varint32(&mut buf, black_box(123_456));
                decode_varint32(&buf).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

fn bench_varint64_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("varint64");
    group.throughput(Throughput::Elements(1));
    group.bench_function("encode_decode", |b| {
        b.iter_batched(
            Vec::new,
            |mut buf| {
                append_varint64(&mut buf, black_box(0x1234_5678_9ABC));
                decode_varint64(&buf).unwrap();
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

// ------------------------------------------------------------------------------------------------
// Checksum
// ------------------------------------------------------------------------------------------------

fn bench_crc32c(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");
    let data = vec![0xAB; 16 * 1024];
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("crc32c_16kib", |b| {
        b.iter(|| checksum::checksum(ChecksumType::Crc32c, black_box(&data)))
    });
    group.finish();
}

// ------------------------------------------------------------------------------------------------
// Memtable
// ------------------------------------------------------------------------------------------------

fn bench_memtable_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("memtable");
    group.bench_function("add_10k_sequential", |b| {
        b.iter_batched(
            Memtable::new,
            |table| {
                for i in 0..10_000u64 {
                    table.add(&make_key(i), i, ValueType::Value, b"value");
                }
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

fn bench_memtable_get(c: &mut Criterion) {
    let table = Memtable::new();
    for i in 0..10_000u64 {
        table.add(&make_key(i), i, ValueType::Value, b"value");
    }
    let mut group = c.benchmark_group("memtable");
    group.bench_function("get_hit", |b| {
        b.iter(|| table.get(black_box(&make_key(5_000)), 10_000))
    });
    group.finish();
}

// ------------------------------------------------------------------------------------------------
// Bloom filter
// ------------------------------------------------------------------------------------------------

fn bench_bloom_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("bloom");
    group.bench_function("build_10k_keys", |b| {
        b.iter_batched(
            || BloomBuilder::new(10),
            |mut builder| {
                for i in 0..10_000u64 {
                    builder.add_key(&make_key(i));
                }
                builder.finish()
            },
            BatchSize::LargeInput,
        )
    });
    group.finish();
}

// ------------------------------------------------------------------------------------------------
// Block cache
// ------------------------------------------------------------------------------------------------

fn bench_cache_insert_lookup(c: &mut Criterion) {
    let cache = Cache::new(64 * 1024 * 1024);
    for i in 0..10_000u64 {
        cache.insert(CacheKey::new(1, i), vec![0u8; 128], 128).release();
    }
    let mut group = c.benchmark_group("cache");
    group.bench_function("lookup_hit", |b| {
        b.iter(|| cache.lookup(black_box(&CacheKey::new(1, 5_000))))
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_varint32_roundtrip,
    bench_varint64_roundtrip,
    bench_crc32c,
    bench_memtable_insert,
    bench_memtable_get,
    bench_bloom_filter,
    bench_cache_insert_lookup,
);
criterion_main!(benches);
