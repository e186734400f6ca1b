use criterion::{Criterion, black_box, criterion_group, criterion_main};
use screen_qr::models::Frame;
use screen_qr::transform::{TransformKind, TransformParams, rescale};

fn noisy_rgb(width: usize, height: usize) -> Frame {
    let data = (0..width * height * 3)
        .map(|i| ((i * 7919) % 251) as u8)
        .collect();
    Frame::from_rgb(width, height, data).unwrap()
}

fn bench_transform_kinds(c: &mut Criterion) {
    let frame = noisy_rgb(640, 480);
    let params = TransformParams::default();
    for kind in TransformKind::DEFAULT_SEQUENCE.into_iter().chain([TransformKind::Invert]) {
        c.bench_function(&format!("{}_640x480", kind), |b| {
            b.iter(|| kind.apply(black_box(&frame), &params))
        });
    }
}

fn bench_large_frame(c: &mut Criterion) {
    let frame = noisy_rgb(1920, 1080);
    let params = TransformParams::default();
    c.bench_function("grayscale_1920x1080", |b| {
        b.iter(|| TransformKind::Grayscale.apply(black_box(&frame), &params))
    });
    c.bench_function("adaptive_1920x1080", |b| {
        b.iter(|| TransformKind::Adaptive.apply(black_box(&frame), &params))
    });
}

fn bench_rescale(c: &mut Criterion) {
    let frame = noisy_rgb(640, 480);
    c.bench_function("rescale_up_2x_640x480", |b| {
        b.iter(|| rescale(black_box(&frame), 2.0))
    });
    c.bench_function("rescale_down_half_640x480", |b| {
        b.iter(|| rescale(black_box(&frame), 0.5))
    });
}

criterion_group!(benches, bench_transform_kinds, bench_large_frame, bench_rescale);
criterion_main!(benches);
