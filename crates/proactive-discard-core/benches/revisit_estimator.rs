//! Benchmarks for distribution lookup and revisit estimation.
//!
//! Performance budgets:
//! - `get_probability` on a 1k-bucket CDF: **< 100ns**
//! - Single revisit estimate: **< 1μs**
//! - Sampling pass over 500 tracked tabs: **< 1ms**

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use proactive_discard_core::evaluator::{DiscardFunction, ProactiveDiscardEvaluator};
use proactive_discard_core::probability_distribution::{DistributionEntry, ProbabilityDistribution};
use proactive_discard_core::revisit_estimator::{MAX_NUM_REVISIT, RevisitCountRevisitEstimator};
use proactive_discard_core::sampler::{ProbabilisticMemorySaverSampler, TabLifecycleObserver};
use proactive_discard_core::tab::TabHandle;
use proactive_discard_core::tab_revisit_tracker::TabRevisitTracker;
use std::collections::HashMap;
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};


const BUDGETS: &[bench_common::BenchBudget] = &[
    bench_common::BenchBudget {
        name: "distribution_lookup",
        budget: "p50 < 100ns (get_probability, 1k buckets)",
    },
    bench_common::BenchBudget {
        name: "revisit_estimate",
        budget: "p50 < 1us (single compute_revisit_probability)",
    },
    bench_common::BenchBudget {
        name: "sampling_pass",
        budget: "p50 < 1ms (500 tracked tabs)",
    },
];

/// Evenly spaced CDF over one week with `buckets` steps.
fn week_cdf(buckets: u64) -> ProbabilityDistribution {
    let step = 7 * 86_400 / buckets;
    let entries: Vec<DistributionEntry> = (1..=buckets)
        .map(|i| DistributionEntry::new(i * step, i as f32 / buckets as f32))
        .collect();
    ProbabilityDistribution::from_cdf_data(entries).expect("valid cdf")
}

fn full_tables() -> (HashMap<i64, ProbabilityDistribution>, HashMap<i64, f32>) {
    let cdf = week_cdf(256);
    let ttr = (0..MAX_NUM_REVISIT).map(|b| (b, cdf.clone())).collect();
    let revisit = (0..MAX_NUM_REVISIT)
        .map(|b| (b, 0.2 + 0.04 * b as f32))
        .collect();
    (ttr, revisit)
}

// =============================================================================
// Distribution lookup
// =============================================================================

fn bench_distribution_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("distribution_lookup");

    for buckets in [16u64, 256, 1024] {
        let cdf = week_cdf(buckets);
        group.bench_with_input(BenchmarkId::new("get_probability", buckets), &cdf, |b, d| {
            let mut value = 0u64;
            b.iter(|| {
                value = (value + 7_919) % (8 * 86_400);
                black_box(d.get_probability(black_box(value)))
            });
        });
    }

    group.finish();
}

// =============================================================================
// Revisit estimate
// =============================================================================

fn bench_revisit_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("revisit_estimate");

    let tracker = Arc::new(TabRevisitTracker::new());
    let t0 = Instant::now();
    tracker.on_tab_added_at(TabHandle(1), false, t0);
    let (ttr, revisit) = full_tables();
    let estimator = RevisitCountRevisitEstimator::new(ttr, revisit, tracker);
    let now = t0 + Duration::from_secs(3_600);

    group.bench_function("background_tab", |b| {
        b.iter(|| black_box(estimator.compute_revisit_probability_at(black_box(TabHandle(1)), now)));
    });

    group.bench_function("unknown_tab", |b| {
        b.iter(|| {
            black_box(estimator.compute_revisit_probability_at(black_box(TabHandle(404)), now))
        });
    });

    group.finish();
}

// =============================================================================
// Sampling pass
// =============================================================================

fn bench_sampling_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("sampling_pass");

    for tabs in [50u64, 500] {
        let tracker = Arc::new(TabRevisitTracker::new());
        let sampler = ProbabilisticMemorySaverSampler::new(Duration::from_secs(600), tracker.clone())
            .expect("valid interval")
            .without_timer();
        let observer = sampler.tab_observer();
        for id in 0..tabs {
            tracker.on_tab_added(TabHandle(id), id % 10 == 0);
            observer.on_tab_added(TabHandle(id));
        }

        let (ttr, revisit) = full_tables();
        let estimator = RevisitCountRevisitEstimator::new(ttr, revisit, tracker);
        // Never actually discards, so every pass sees the same tabs.
        let discard: DiscardFunction = Arc::new(|_: TabHandle| {});
        let evaluator = ProactiveDiscardEvaluator::new(
            Box::new(estimator),
            Box::new(sampler),
            discard,
            0.0001,
        )
        .expect("valid target");

        group.throughput(Throughput::Elements(tabs));
        group.bench_with_input(BenchmarkId::new("tabs", tabs), &evaluator, |b, e| {
            b.iter(|| black_box(e.run_sampling_pass()));
        });
    }

    group.finish();
}

// =============================================================================
// Criterion groups and main
// =============================================================================

fn bench_config() -> Criterion {
    bench_common::emit_bench_artifacts("revisit_estimator", BUDGETS);
    Criterion::default().configure_from_args()
}

criterion_group!(
    name = benches;
    config = bench_config();
    targets = bench_distribution_lookup,
        bench_revisit_estimate,
        bench_sampling_pass
);
criterion_main!(benches);
