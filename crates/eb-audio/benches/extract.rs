use criterion::{Criterion, black_box, criterion_group, criterion_main};
use eb_audio::features::FeatureExtractor;
use eb_audio::normalize::normalize;
use eb_audio::segment::AudioSegment;
use eb_core::NormalizationPolicy;

fn speech_like(len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / 44100.0;
            0.4 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                + 0.2 * (2.0 * std::f32::consts::PI * 1330.0 * t).sin()
        })
        .collect()
}

fn bench_mfcc(c: &mut Criterion) {
    let ex = FeatureExtractor::mfcc(44100);
    let seg = AudioSegment::new(speech_like(110_250), 44100);
    c.bench_function("mfcc_2.5s", |b| {
        b.iter(|| {
            let mut m = ex.extract(black_box(&seg)).unwrap_or_else(|e| panic!("{e}"));
            normalize(&mut m, NormalizationPolicy::MinMax);
            m
        });
    });
}

fn bench_mel_image(c: &mut Criterion) {
    let ex = FeatureExtractor::mel_image(44100);
    let seg = AudioSegment::new(speech_like(110_250), 44100);
    c.bench_function("mel_image_2.5s", |b| {
        b.iter(|| ex.extract(black_box(&seg)));
    });
}

criterion_group!(benches, bench_mfcc, bench_mel_image);
criterion_main!(benches);
