//! ABOUTME: Benchmarks for the per-tick vision pipeline
//! ABOUTME: Measures preprocessing and baseline differencing across frame sizes

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mw_vision::{
    detect, preprocess,
    utils::{create_test_frame_with_motion, rgb_frame_with_block, uniform_intensity_frame},
    DetectionConfig,
};

const FRAME_SIZES: [(u32, u32, &str); 3] = [
    (160, 120, "160x120"),
    (320, 240, "320x240"),
    (640, 480, "640x480"),
];

/// Grayscale conversion plus Gaussian smoothing at the default kernel size
fn bench_preprocess(c: &mut Criterion) {
    let mut group = c.benchmark_group("preprocess");

    for (width, height, size_name) in FRAME_SIZES {
        let frame = rgb_frame_with_block(width, height, 10, 10, 50, 50, [40, 60, 80], [220, 200, 180]);
        group.bench_with_input(BenchmarkId::new("blur_21", size_name), &frame, |b, frame| {
            b.iter(|| preprocess(frame, 21));
        });
    }

    group.finish();
}

/// Differencing with and without changed pixels
fn bench_detect(c: &mut Criterion) {
    let config = DetectionConfig::default();
    let mut group = c.benchmark_group("detect");

    for (width, height, size_name) in FRAME_SIZES {
        let baseline = uniform_intensity_frame(width, height, 64);
        let moving = create_test_frame_with_motion(width, height, 10, 10, 60, 60, 64, 200);

        group.bench_with_input(BenchmarkId::new("quiet", size_name), &baseline, |b, current| {
            b.iter(|| detect(current, &baseline, &config).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("motion", size_name), &moving, |b, current| {
            b.iter(|| detect(current, &baseline, &config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_preprocess, bench_detect);
criterion_main!(benches);
