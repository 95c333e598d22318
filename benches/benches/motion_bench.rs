//! # Motion Benchmarks
//!
//! Measures drive table construction, the rebuild-all calibration path and a
//! full multi-channel run with zero pacing.
//!
//! Run: `cargo bench --bench motion_bench`

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use servo_motion::{DriveTable, MockTransport, ServoController, DRIVE_MAX_16BIT};

/// Benchmark table construction for different ranges
fn bench_drive_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("drive_table");

    for (min, max) in [(0.0, 180.0), (30.0, 150.0), (80.0, 100.0)] {
        group.bench_with_input(
            BenchmarkId::new("build", format!("{}-{}", min, max)),
            &(min, max),
            |b, &(min, max)| b.iter(|| DriveTable::build(black_box(min), black_box(max), DRIVE_MAX_16BIT)),
        );
    }

    let table = DriveTable::build(0.0, 180.0, DRIVE_MAX_16BIT).unwrap();
    group.bench_function("lookup", |b| b.iter(|| table.lookup(black_box(97.4))));

    group.finish();
}

/// Benchmark calibration updates (every channel table is rebuilt)
fn bench_calibration(c: &mut Criterion) {
    let mut group = c.benchmark_group("calibration");

    for channels in [8usize, 16, 32] {
        let controller = ServoController::new(MockTransport::new(), channels).unwrap();
        group.bench_with_input(BenchmarkId::new("set_min_angle", channels), &channels, |b, _| {
            b.iter(|| controller.set_min_angle(0, black_box(10.0)))
        });
    }

    group.finish();
}

/// Benchmark a full run from 0° to 180° on every channel
fn bench_run(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("run");

    for factor in [0.1, 0.5, 1.0] {
        group.bench_with_input(BenchmarkId::new("8ch", factor), &factor, |b, &factor| {
            b.to_async(&rt).iter(|| async move {
                let controller = ServoController::new(MockTransport::new(), 8).unwrap();
                controller.set_pacing(Duration::ZERO).unwrap();
                for ch in 0..8 {
                    controller.set_smoothing_factor(ch, factor).unwrap();
                }
                controller.set_absolute_angles(&[180.0; 8]).unwrap();
                black_box(controller.run().await.unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_drive_table, bench_calibration, bench_run);
criterion_main!(benches);
