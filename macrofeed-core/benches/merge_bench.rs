//! Criterion benchmarks for the alignment hot path.
//!
//! Benchmarks:
//! 1. Normalizing a long daily series onto a monthly grid
//! 2. Merging a wide category of monthly series

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use macrofeed_core::data::{
    CategoryMerger, DateNormalizer, NormalizedSeries, RawSeries, SortOrder, Value,
};
use macrofeed_core::Frequency;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_raw(n: usize) -> RawSeries {
    let base = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap();
    let mut series = RawSeries::new("DAILY");
    for i in 0..n {
        let value = 100.0 + (i as f64 * 0.1).sin() * 10.0;
        series.push(base + Duration::days(i as i64), Some(Value::Number(value)));
    }
    series
}

fn make_category(width: usize, months: usize) -> Vec<NormalizedSeries> {
    let base = NaiveDate::from_ymd_opt(1980, 1, 1).unwrap();
    (0..width)
        .map(|col| {
            let rows = (col..months)
                .filter_map(|m| {
                    let date = base.checked_add_months(chrono::Months::new(m as u32))?;
                    Some((date, Some(Value::Number((m * col) as f64))))
                })
                .collect();
            NormalizedSeries::new(format!("S{col}"), rows)
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    for n in [1_000, 10_000] {
        let raw = make_raw(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &raw, |b, raw| {
            b.iter(|| {
                DateNormalizer::new().normalize(black_box(raw.clone()), Some(Frequency::Monthly), None)
            })
        });
    }
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge");
    for width in [4, 16] {
        let series = make_category(width, 480);
        let merger = CategoryMerger::new(
            "BENCH",
            series.iter().map(|s| s.header.clone()).collect(),
            SortOrder::Descending,
        );
        group.bench_with_input(BenchmarkId::from_parameter(width), &series, |b, series| {
            b.iter(|| merger.merge(black_box(series.clone())))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_normalize, bench_merge);
criterion_main!(benches);
