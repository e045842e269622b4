use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{DynamicImage, GrayImage, Luma};
use kyc_engine::analysis::{ela::ElaAnalyzer, pixel_forensics::PixelForensicsAnalyzer};

fn textured(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        Luma([(((x as u64).wrapping_mul(2654435761) ^ (y as u64).wrapping_mul(40503)) >> 3) as u8])
    }))
}

fn bench_ela(c: &mut Criterion) {
    let image = textured(256, 256);
    let analyzer = ElaAnalyzer::default();

    c.bench_function("ela_256x256", |b| {
        b.iter(|| analyzer.analyze(black_box(&image)).unwrap())
    });
}

fn bench_pixel_forensics(c: &mut Criterion) {
    let image = textured(128, 128);
    let analyzer = PixelForensicsAnalyzer::new();

    c.bench_function("pixel_forensics_128x128", |b| {
        b.iter(|| analyzer.analyze(black_box(&image)).unwrap())
    });
}

criterion_group!(benches, bench_ela, bench_pixel_forensics);
criterion_main!(benches);
