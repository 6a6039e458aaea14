// Core pipeline benchmark - measure work-set discovery and frame batching
//
// Run with: cargo bench --bench core_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use video_detect_common::Frame;
use video_detect_core::{pending_items, FrameBatcher};

/// Benchmark the input/result listing diff at different bucket sizes
fn bench_discovery(c: &mut Criterion) {
    let mut group = c.benchmark_group("discovery");

    for count in [100usize, 1_000, 10_000] {
        let inputs: Vec<String> = (0..count).map(|i| format!("video_{i:06}.mp4")).collect();
        // Half the inputs already have a result document
        let results: Vec<String> = (0..count / 2)
            .map(|i| format!("video_{i:06}.json"))
            .collect();

        group.bench_with_input(
            BenchmarkId::new("pending_items", count),
            &(inputs, results),
            |b, (inputs, results)| {
                b.iter(|| {
                    let pending = pending_items(black_box(inputs), black_box(results));
                    black_box(pending);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark batching a 1000-frame stream at different batch sizes
fn bench_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("batching");

    let frame_count = 1_000u64;
    for batch_size in [1usize, 8, 32] {
        group.bench_with_input(
            BenchmarkId::new("batch_1000_frames", batch_size),
            &batch_size,
            |b, &batch_size| {
                b.iter(|| {
                    let frames = (0..frame_count).map(|n| {
                        Ok(Frame {
                            frame_number: n,
                            width: 64,
                            height: 64,
                            data: vec![0u8; 64 * 64 * 3],
                        })
                    });
                    let mut total = 0usize;
                    for batch in FrameBatcher::new(frames, batch_size) {
                        total += batch.unwrap().len();
                    }
                    black_box(total);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_discovery, bench_batching);
criterion_main!(benches);
