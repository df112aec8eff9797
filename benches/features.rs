//! Feature extraction benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use moment_catcher::audio::{AudioData, AudioFeatureExtractor};
use moment_catcher::video::features::canny;
use moment_catcher::video::{Frame, VisualFeatureExtractor};

/// Frame with a diagonal gradient, shifted by `offset`
fn gradient_frame(width: u32, height: u32, offset: u8) -> Frame {
    let mut frame = Frame::new_filled(width, height, [0, 0, 0]);
    for y in 0..height {
        for x in 0..width {
            let v = (((x + y) * 255 / (width + height)) as u8).wrapping_add(offset);
            frame.set_pixel(x, y, [v, v / 2, 255 - v]);
        }
    }
    frame
}

fn bench_audio(c: &mut Criterion) {
    let mut group = c.benchmark_group("audio_features");
    let extractor = AudioFeatureExtractor::default();

    for sample_rate in [22_050u32, 44_100, 48_000] {
        let samples: Vec<f32> = (0..sample_rate as usize * 10)
            .map(|i| ((i as f32) * 0.031).sin() * 0.5 + ((i % 97) as f32 / 97.0 - 0.5) * 0.1)
            .collect();
        let audio = AudioData::new(samples, sample_rate, 1);

        group.throughput(Throughput::Elements(audio.samples.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(sample_rate), &audio, |b, audio| {
            b.iter(|| extractor.extract(black_box(audio)));
        });
    }

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_features");
    let extractor = VisualFeatureExtractor::default();

    let resolutions = [("320x180", 320, 180), ("640x360", 640, 360), ("720p", 1280, 720)];

    for (name, width, height) in resolutions {
        let previous = gradient_frame(width, height, 0).to_gray();
        let frame = gradient_frame(width, height, 12);
        let gray = frame.to_gray();

        group.throughput(Throughput::Elements((width * height) as u64));
        group.bench_function(BenchmarkId::new("all", name), |b| {
            b.iter(|| {
                extractor.frame_features(black_box(&frame), black_box(&gray), Some(&previous))
            });
        });
        group.bench_function(BenchmarkId::new("canny", name), |b| {
            b.iter(|| canny(black_box(&gray), 50.0, 150.0));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_audio, bench_frames);
criterion_main!(benches);
