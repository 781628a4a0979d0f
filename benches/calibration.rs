use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use daystar_calib_rs::calibration::geometry::{FULL_COLS, FULL_ROWS};
use daystar_calib_rs::calibration::{
    CalibrationConfig, CalibrationPipeline, NormalizationMethod, RawFrame, TiffCompression,
    normalize, stats,
};
use ndarray::Array2;
use std::io::Cursor;

fn generate_mock_frame(rows: usize, cols: usize) -> Array2<u16> {
    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let gain = 1.0 + ((c * 13) % 17) as f64 * 0.01;
        let noise = ((r * 31 + c * 7) % 23) as f64;
        ((200.0 + noise) * gain) as u16
    })
}

fn benchmark_estimators(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_estimators");
    let region = generate_mock_frame(32, 2560).mapv(f64::from);

    for method in NormalizationMethod::ALL {
        group.bench_with_input(BenchmarkId::from_parameter(method), &region, |b, region| {
            b.iter(|| stats::estimate_columns(black_box(region.view()), method));
        });
    }

    group.finish();
}

fn benchmark_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize_full_frame");
    group.sample_size(10);
    let raw = RawFrame::new(generate_mock_frame(FULL_ROWS, FULL_COLS), 12);

    for (dark_rows_only, label) in [(true, "dark_rows_only"), (false, "with_self_pass")] {
        let config = CalibrationConfig::builder()
            .dark_rows_only(dark_rows_only)
            .build();
        group.bench_with_input(BenchmarkId::from_parameter(label), &raw, |b, raw| {
            b.iter(|| normalize(black_box(raw), &config));
        });
    }

    group.finish();
}

fn benchmark_compression_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("compression_methods");
    group.sample_size(10);
    let data: Vec<u8> = generate_mock_frame(FULL_ROWS, FULL_COLS)
        .iter()
        .flat_map(|v| v.to_le_bytes())
        .collect();

    let compressions = [
        (TiffCompression::None, "none"),
        (TiffCompression::Lzw, "lzw"),
        (TiffCompression::DeflateFast, "deflate_fast"),
    ];

    for (compression, label) in compressions {
        group.bench_with_input(BenchmarkId::from_parameter(label), &data, |b, data| {
            let config = CalibrationConfig::builder()
                .compression(compression)
                .dark_rows_only(true)
                .build();
            let pipeline = CalibrationPipeline::new(config);

            b.iter(|| {
                let mut output = Cursor::new(Vec::new());
                let _ = pipeline.calibrate(black_box(data), &mut output);
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_estimators,
    benchmark_normalize,
    benchmark_compression_methods
);
criterion_main!(benches);
