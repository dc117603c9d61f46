//! Performance benchmarks for match_core using Criterion.rs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use match_core::clock::ONE_MIN_MS;
use match_core::demand::{DemandAction, DemandFieldConfig};
use match_core::matching::RequestContext;
use match_core::scoring::{score, WeightVector};
use match_core::test_helpers::{berlin_selector, candidate_at_km, TEST_PICKUP};

fn bench_rank_candidates(c: &mut Criterion) {
    let (selector, _) = berlin_selector(DemandFieldConfig::default());
    let mut group = c.benchmark_group("rank_candidates");
    for size in [10usize, 100, 1_000] {
        let candidates = (0..size)
            .map(|i| candidate_at_km(&format!("d{i}"), (i % 50) as f64 * 0.3, 4.5, 0.9))
            .collect::<Vec<_>>();
        group.bench_with_input(BenchmarkId::from_parameter(size), &candidates, |b, candidates| {
            b.iter(|| black_box(selector.find_top_k(TEST_PICKUP, candidates, 5)));
        });
    }
    group.finish();
}

fn bench_score(c: &mut Criterion) {
    let candidate = candidate_at_km("d", 3.2, 4.6, 0.88);
    let context = RequestContext::new(TEST_PICKUP, Some("ber-mitte".to_string()));
    let weights = WeightVector::default();
    c.bench_function("score_single_candidate", |b| {
        b.iter(|| black_box(score(&candidate, &context, black_box(64.0), &weights)))
    });
}

fn bench_demand_updates(c: &mut Criterion) {
    let (selector, clock) = berlin_selector(DemandFieldConfig::default());
    let field = selector.demand().clone();
    c.bench_function("deposit", |b| {
        b.iter(|| black_box(field.deposit("ber-mitte", DemandAction::Request, 0.0)))
    });
    c.bench_function("evaporate_tick", |b| {
        b.iter(|| black_box(field.evaporate(clock.advance(ONE_MIN_MS))))
    });
}

criterion_group!(benches, bench_rank_candidates, bench_score, bench_demand_updates);
criterion_main!(benches);
