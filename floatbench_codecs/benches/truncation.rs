//! Encode/decode throughput of the native codecs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use floatbench_codecs::{BitTruncationCodec, BoundedErrorCodec, QuantizingEngine};
use floatbench_core::{Algorithm, BoundedErrorConfig, Codec, ErrorBoundMode, TruncationConfig};
use std::sync::Arc;

fn generate_test_data(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| (i as f32 * 0.001).sin() * 100.0 + (i % 17) as f32 * 0.01)
        .collect()
}

fn bench_truncation(c: &mut Criterion) {
    let mut group = c.benchmark_group("bit_truncation");
    let data = generate_test_data(256 * 1024);
    group.throughput(Throughput::Bytes((data.len() * 4) as u64));

    for bits in [4i64, 12, 23] {
        let codec = BitTruncationCodec::new(TruncationConfig::new(bits, 1).unwrap());
        let encoded = codec.encode(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", bits), &data, |b, data| {
            b.iter(|| codec.encode(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("decode", bits), &encoded, |b, encoded| {
            b.iter(|| codec.decode(black_box(encoded)))
        });
    }

    group.finish();
}

fn bench_quantizer(c: &mut Criterion) {
    let mut group = c.benchmark_group("quantizer");
    let data = generate_test_data(256 * 1024);
    group.throughput(Throughput::Bytes((data.len() * 4) as u64));

    for (label, mode, bound) in [
        ("abs_1e-3", ErrorBoundMode::Absolute, 1e-3),
        ("rel_1e-3", ErrorBoundMode::Relative, 1e-3),
    ] {
        let config = BoundedErrorConfig::new(Algorithm::LorenzoRegression, mode, bound).unwrap();
        let codec = BoundedErrorCodec::new(config, Arc::new(QuantizingEngine::default()));
        let encoded = codec.encode(&data).unwrap();
        group.bench_with_input(BenchmarkId::new("encode", label), &data, |b, data| {
            b.iter(|| codec.encode(black_box(data)))
        });
        group.bench_with_input(BenchmarkId::new("decode", label), &encoded, |b, encoded| {
            b.iter(|| codec.decode(black_box(encoded)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_truncation, bench_quantizer);
criterion_main!(benches);
