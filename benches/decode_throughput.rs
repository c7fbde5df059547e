//! Benchmarks for the per-line hot path
//!
//! Every line from every feed goes through classify → decode → encode inside
//! its feed task, so this is the cost that bounds line rate per feed:
//! - Classification of clean, compound and garbage lines
//! - Decoding each format from a classified segment
//! - Full pipeline pass from raw line to frames
//!
//! Platform: Cross-platform (in-memory fixtures, CI-safe)

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use downlink::test_utils::{fixtures, raw_line};
use downlink::{ClassifierConfig, Decoder, Pipeline, classify, encode};
use std::hint::black_box;

const GARBAGE: &str = "\u{0}\u{7f}~~ RX ERR 0xFF 0xFF 0xFF ###### noise on the line ######";

fn bench_classify(c: &mut Criterion) {
    let config = ClassifierConfig::default();
    let mut group = c.benchmark_group("classify");

    for (name, text) in [
        ("altimeter_a", fixtures::ALTIMETER_A),
        ("gps_stat", fixtures::GPS_STAT),
        ("compound", fixtures::COMPOUND),
        ("garbage", GARBAGE),
    ] {
        let line = raw_line(text);
        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_function(name, |b| b.iter(|| black_box(classify(black_box(&line), &config))));
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let config = ClassifierConfig::default();
    let decoder = Decoder::default();
    let mut group = c.benchmark_group("decode");

    for (kind, text) in fixtures::ALL {
        let segment = classify(&raw_line(text), &config)
            .into_iter()
            .next()
            .expect("fixture classifies");
        group.bench_function(kind.to_string(), |b| {
            b.iter(|| black_box(decoder.decode(black_box(&segment))))
        });
    }

    group.finish();
}

fn bench_encode(c: &mut Criterion) {
    let decoder = Decoder::default();
    let mut group = c.benchmark_group("encode");

    for (kind, text) in fixtures::ALL {
        let record = decoder.decode_text(kind, text).expect("fixture decodes");
        group.bench_function(kind.to_string(), |b| b.iter(|| black_box(encode(black_box(&record)))));
    }

    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let lines: Vec<_> = fixtures::ALL
        .iter()
        .map(|(_, text)| *text)
        .chain([fixtures::COMPOUND, GARBAGE])
        .map(raw_line)
        .collect();
    let bytes: usize = lines.iter().map(|line| line.len()).sum();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("mixed_feed", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(pipeline.process(black_box(line)));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, bench_classify, bench_decode, bench_encode, bench_pipeline);
criterion_main!(benches);
