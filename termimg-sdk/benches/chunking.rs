// ABOUTME: Benchmark for kitty graphics command framing and payload chunking
// ABOUTME: Covers tiny control commands, thumbnail-sized and full-screen payloads

use base64::{engine::general_purpose::STANDARD, Engine};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use termimg_sdk::kitty::format_command;

fn raw_payload(width: usize, height: usize) -> Vec<u8> {
    let pixels: Vec<u8> = (0..width * height * 3).map(|i| (i % 251) as u8).collect();
    STANDARD.encode(pixels).into_bytes()
}

fn benchmark_control_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("control_commands");

    group.bench_function("delete", |b| {
        b.iter(|| {
            format_command(
                black_box(&[("a", "d".to_string()), ("i", "42".to_string())]),
                None,
            )
        });
    });

    group.bench_function("support_query", |b| {
        let payload = STANDARD.encode("/tmp/tmpab12cd34");
        let params = [
            ("a", "q".to_string()),
            ("i", "1".to_string()),
            ("f", "24".to_string()),
            ("t", "f".to_string()),
            ("s", "1".to_string()),
            ("v", "1".to_string()),
            ("S", "3".to_string()),
        ];
        b.iter(|| format_command(black_box(&params), Some(payload.as_bytes())));
    });

    group.finish();
}

fn benchmark_stream_payloads(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_payloads");

    for (width, height) in [(64, 64), (320, 240), (800, 600), (1920, 1080)] {
        let payload = raw_payload(width, height);
        let params = [
            ("a", "T".to_string()),
            ("i", "7".to_string()),
            ("t", "d".to_string()),
            ("f", "24".to_string()),
            ("s", width.to_string()),
            ("v", height.to_string()),
        ];

        group.throughput(Throughput::Bytes(payload.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}", width, height)),
            &payload,
            |b, payload| b.iter(|| format_command(black_box(&params), Some(payload))),
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_control_commands,
    benchmark_stream_payloads
);
criterion_main!(benches);
