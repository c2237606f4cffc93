//! Criterion benchmarks for BlendLab hot paths.
//!
//! Benchmarks:
//! 1. Indicator precompute (SMA, Bollinger)
//! 2. Signal sources over a full window
//! 3. Full combination pipeline (the unit of work of one objective call)

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use blendlab_core::components::indicator::Indicator;
use blendlab_core::components::{
    run_source, CombinationMode, MeanReversion, SessionFilter, SignalCombiner, SignalSource,
    SmaCrossover,
};
use blendlab_core::data::PriceWindow;
use blendlab_core::domain::Bar;
use blendlab_core::engine::{BacktestEvaluator, CombinationPipeline};
use blendlab_core::indicators::{Bollinger, Sma};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let t0 = Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let x = i as f64;
            Bar::new(
                t0 + Duration::minutes(20 * i as i64),
                1.12 + 0.02 * (x * 0.01).sin() + 0.003 * (x * 0.37).cos(),
            )
        })
        .collect()
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|b| b.close).collect()
}

// ── 1. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    for n in [5_000usize, 30_000] {
        let data = closes(&make_bars(n));
        group.bench_with_input(BenchmarkId::new("sma_150", n), &data, |b, d| {
            let sma = Sma::new(150);
            b.iter(|| sma.compute(black_box(d)))
        });
        group.bench_with_input(BenchmarkId::new("bollinger_75", n), &data, |b, d| {
            let bands = Bollinger::new(75, 3.0);
            b.iter(|| bands.compute(black_box(d)))
        });
    }
    group.finish();
}

// ── 2. Signal sources ────────────────────────────────────────────────

fn bench_sources(c: &mut Criterion) {
    let bars = make_bars(30_000);
    let sma = SmaCrossover::new(50, 150).unwrap();
    let mr = MeanReversion::new(75, 3.0).unwrap();
    c.bench_function("sma_crossover_30k", |b| b.iter(|| sma.positions(black_box(&bars))));
    c.bench_function("mean_reversion_30k", |b| b.iter(|| mr.positions(black_box(&bars))));
}

// ── 3. Pipeline ──────────────────────────────────────────────────────

fn bench_pipeline(c: &mut Criterion) {
    let window = PriceWindow::new("EURUSD", make_bars(30_000)).unwrap();
    let evaluator = BacktestEvaluator::new(0.000059).unwrap();
    let pipeline = CombinationPipeline::new(
        SignalCombiner::from_mode(CombinationMode::Majority),
        SessionFilter::new("America/New_York", 2, 12).unwrap(),
        evaluator,
    );

    c.bench_function("objective_eval_30k", |b| {
        b.iter(|| {
            let sources = vec![
                run_source(&SmaCrossover::new(50, 150).unwrap(), &window, &evaluator).unwrap(),
                run_source(&MeanReversion::new(75, 3.0).unwrap(), &window, &evaluator).unwrap(),
            ];
            pipeline.run(black_box(&sources)).unwrap().evaluation.final_multiple()
        })
    });
}

criterion_group!(benches, bench_indicators, bench_sources, bench_pipeline);
criterion_main!(benches);
