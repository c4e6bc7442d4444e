use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use kalman_denoise::filter::{BlockMatchingFilter, Denoiser, RecursiveFilter};
use kalman_denoise::stream::{FrameSource, NoiseInjector, PixelFormat, SyntheticSource};
use kalman_denoise::Frame;

fn noisy_frames(width: u32, height: u32, count: u64) -> Vec<Frame> {
    let mut source = SyntheticSource::new(width, height, PixelFormat::Bgr24, count)
        .with_noise(NoiseInjector::with_seed(10.0, 7));
    let mut frames = Vec::new();
    while let Ok(Some(frame)) = source.read() {
        frames.push(frame);
    }
    frames
}

fn bench_per_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("per_frame");

    for &(width, height) in &[(320u32, 240u32), (640, 480)] {
        let frames = noisy_frames(width, height, 8);
        let label = format!("{}x{}", width, height);

        group.bench_with_input(
            BenchmarkId::new("block_matching", &label),
            &frames,
            |b, frames| {
                let mut filter = BlockMatchingFilter::with_defaults(&frames[0])
                    .expect("benchmark frames are valid");
                let mut i = 0;
                b.iter(|| {
                    let out = filter.process(&frames[i % frames.len()]);
                    i += 1;
                    black_box(out)
                })
            },
        );

        group.bench_with_input(
            BenchmarkId::new("recursive", &label),
            &frames,
            |b, frames| {
                let mut filter = RecursiveFilter::with_defaults(&frames[0])
                    .expect("benchmark frames are valid");
                let mut i = 0;
                b.iter(|| {
                    let out = filter.process(&frames[i % frames.len()]);
                    i += 1;
                    black_box(out)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_per_frame);
criterion_main!(benches);
