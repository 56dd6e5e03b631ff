//! Benchmarks for the per-sample path of the measurement loop.

use criterion::{Criterion, criterion_group, criterion_main};
use irqlat_engine::{LatencyHistogram, latency_us, raw_delta};
use std::hint::black_box;
use std::num::NonZeroU32;

fn bench_latency_math(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency");
    let fclk = NonZeroU32::new(100_000_000).unwrap_or(NonZeroU32::MIN);

    group.bench_function("raw_delta_no_wrap", |b| {
        b.iter(|| black_box(raw_delta(black_box(1_000), black_box(51_000))));
    });

    group.bench_function("raw_delta_wrap", |b| {
        b.iter(|| black_box(raw_delta(black_box(u32::MAX - 10), black_box(5))));
    });

    group.bench_function("latency_us", |b| {
        b.iter(|| black_box(latency_us(black_box(0), black_box(50_000), fclk)));
    });

    group.finish();
}

fn bench_record(c: &mut Criterion) {
    let mut group = c.benchmark_group("histogram");

    group.bench_function("record_in_range", |b| {
        let mut hist = LatencyHistogram::new();
        b.iter(|| black_box(hist.record(black_box(500))));
    });

    group.bench_function("record_missed", |b| {
        let mut hist = LatencyHistogram::new();
        b.iter(|| black_box(hist.record(black_box(2_000_000))));
    });

    group.finish();
}

criterion_group!(benches, bench_latency_math, bench_record);
criterion_main!(benches);
