// Benchmark for long pseudo-random dock runs
// Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use dock_sim::config::StatsConfig;
use dock_sim::{DockParams, DockSimulation, DockStats, RandomParams, RandomSource, SimConfig};
use std::hint::black_box;

fn bench_default_run(c: &mut Criterion) {
    let config = SimConfig::default();
    let params = DockParams {
        horizon: Some(20_000.0),
        shift_length: config.crew.shift_length,
    };
    c.bench_function("dock run, 20k hours", |b| {
        b.iter(|| {
            let source = RandomSource::new(RandomParams::from_config(&config), 42);
            let mut sim = DockSimulation::new(params, source, DockStats::new(&StatsConfig::default()));
            let report = sim.run().unwrap();
            black_box(sim.into_sink().summary());
            assert_eq!(report.in_flight, 0);
        });
    });
}

fn bench_congested_run(c: &mut Criterion) {
    let mut config = SimConfig::default();
    config.arrivals.mean_gap = 4.2;
    let params = DockParams {
        horizon: Some(5_000.0),
        shift_length: config.crew.shift_length,
    };
    c.bench_function("congested dock run, 5k hours", |b| {
        b.iter(|| {
            let source = RandomSource::new(RandomParams::from_config(&config), 7);
            let mut sim = DockSimulation::new(params, source, Vec::new());
            black_box(sim.run().unwrap());
        });
    });
}

criterion_group!(benches, bench_default_run, bench_congested_run);
criterion_main!(benches);
