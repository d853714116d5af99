use criterion::{criterion_group, criterion_main, Criterion};
use replay_core::EXPECTED_FLOATS;
use replay_io::{build_frame_urls, decode_checked};
use std::hint::black_box;

fn bench_frame_decode(c: &mut Criterion) {
    let bytes: Vec<u8> = (0..EXPECTED_FLOATS)
        .flat_map(|i| (i as f32 * 0.001).to_le_bytes())
        .collect();

    c.benchmark_group("frame_decode")
        .bench_function("decode_smpl_frame", |b| {
            b.iter(|| {
                let (frame, mismatch) = decode_checked(black_box(&bytes));
                black_box((frame, mismatch));
            });
        });
}

fn bench_url_building(c: &mut Criterion) {
    let filenames: Vec<String> = (0..300).map(|i| format!("frame_{:05}.bin", i)).collect();

    c.bench_function("build_300_frame_urls", |b| {
        b.iter(|| {
            black_box(build_frame_urls(
                "http://localhost:5000",
                black_box("pose_data/u1/s1/f1"),
                &filenames,
            ))
        });
    });
}

criterion_group!(benches, bench_frame_decode, bench_url_building);
criterion_main!(benches);
