// Render Benchmarks
// Performance benchmarks for rasterization and presentation

use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use thundervm::display::presenter::present_into;
use thundervm::{Palette, PixelBuffer};

/// Benchmark rectangle and scanline fills
fn bench_fill(c: &mut Criterion) {
    let mut group = c.benchmark_group("fill");

    group.bench_function("rect_full_screen", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| {
            buffer
                .fill_rect(black_box(0), 0, black_box(127), 127, 7)
                .unwrap();
        });
    });

    // Odd endpoints force the unaligned head/tail paths on every row
    group.bench_function("rect_unaligned", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| {
            buffer
                .fill_rect(black_box(1), 1, black_box(126), 126, 3)
                .unwrap();
        });
    });

    group.bench_function("scanline_run_whole_buffer", |b| {
        let mut buffer = PixelBuffer::new(512, 512).unwrap();
        b.iter(|| {
            buffer
                .fill_scanline_run(0, 0, black_box(511), black_box(511), 9)
                .unwrap();
        });
    });

    group.bench_function("clear", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| buffer.clear(black_box(5)).unwrap());
    });

    group.finish();
}

/// Benchmark Bresenham in shallow and steep octants
fn bench_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("line");

    group.bench_function("diagonal", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| buffer.line(0, 0, black_box(127), black_box(127), 1).unwrap());
    });

    group.bench_function("shallow", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| buffer.line(127, 10, black_box(0), black_box(40), 2).unwrap());
    });

    group.bench_function("steep", |b| {
        let mut buffer = PixelBuffer::new(128, 128).unwrap();
        b.iter(|| buffer.line(10, 0, black_box(40), black_box(127), 3).unwrap());
    });

    group.finish();
}

/// Benchmark indexed to RGBA conversion
fn bench_present(c: &mut Criterion) {
    let mut group = c.benchmark_group("present");

    for size in [128usize, 512] {
        group.bench_function(format!("present_into_{}", size), |b| {
            let mut buffer = PixelBuffer::new(size, size).unwrap();
            buffer
                .fill_rect(0, 0, size as i32 - 1, size as i32 - 1, 4)
                .unwrap();
            let palette = Palette::new();
            let mut frame = vec![0u8; size * size * 4];

            b.iter(|| {
                present_into(&buffer, &palette, &mut frame);
                black_box(&frame);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fill, bench_line, bench_present);
criterion_main!(benches);
