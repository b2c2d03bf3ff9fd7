use bigdecimal::BigDecimal;
use common_money::{clamp_to, init_rounding_mode_from_env, normalize_scale, percent_of, round_with, RoundingMode};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::str::FromStr;

fn bench_half_up(c: &mut Criterion) {
    init_rounding_mode_from_env();
    let samples: Vec<BigDecimal> = [
        "1.005", "2.675", "0.005", "-1.005", "-2.505", "12345", "19.90", "1000000.555",
        "-999999.995", "0.3349", "42.4242",
    ]
    .into_iter()
    .map(|s| BigDecimal::from_str(s).unwrap())
    .collect();
    c.bench_function("normalize_scale", |b| {
        b.iter(|| {
            for v in &samples {
                black_box(normalize_scale(v));
            }
        });
    });
}

fn bench_modes_compare(c: &mut Criterion) {
    let samples: Vec<BigDecimal> = (0..500)
        .map(|i| BigDecimal::from_str(&format!("{}.{:03}", i, i % 1000)).unwrap())
        .collect();
    for mode in [RoundingMode::Truncate, RoundingMode::Bankers, RoundingMode::HalfUp] {
        c.bench_function(&format!("round_mode_{}", mode.as_str()), |b| {
            b.iter(|| {
                for v in &samples {
                    black_box(round_with(v, mode));
                }
            });
        });
    }
}

fn bench_percentage_amount_off(c: &mut Criterion) {
    let subtotals: Vec<BigDecimal> = (1..1000)
        .map(|i| BigDecimal::from_str(&format!("{}.{:02}", i, i % 100)).unwrap())
        .collect();
    let pct = BigDecimal::from(15);
    let cap = BigDecimal::from(50);
    c.bench_function("percentage_amount_off_capped", |b| {
        b.iter(|| {
            for s in &subtotals {
                let raw = percent_of(s, &pct);
                let capped = clamp_to(raw, &cap);
                black_box(normalize_scale(&clamp_to(capped, s)));
            }
        });
    });
}

criterion_group!(rounding, bench_half_up, bench_modes_compare, bench_percentage_amount_off);
criterion_main!(rounding);
