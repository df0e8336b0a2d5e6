//! Benchmarks for scattered interpolation.
//!
//! Run with: `cargo bench --bench interpolation_bench`
//!
//! Compares triangulation build time and per-point lookup of the linear and
//! nearest interpolators on a jittered node cloud.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fjord_setup::interpolation::{LinearInterpolator, NearestInterpolator, ScatteredInterpolator, Triangulation};

/// Jittered lattice of `n * n` nodes over a 100 km square.
fn generate_nodes(n: usize) -> Vec<[f64; 2]> {
    let spacing = 100_000.0 / n as f64;
    let mut nodes = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            let phase = (i * n + j) as f64 * 0.7;
            nodes.push([
                (i as f64 + 0.3 * phase.sin()) * spacing,
                (j as f64 + 0.3 * phase.cos()) * spacing,
            ]);
        }
    }
    nodes
}

fn generate_targets(n: usize) -> Vec<[f64; 2]> {
    (0..n * n)
        .map(|k| {
            let (i, j) = (k / n, k % n);
            [(i as f64 + 0.5) * 90_000.0 / n as f64, (j as f64 + 0.5) * 90_000.0 / n as f64]
        })
        .collect()
}

/// Benchmark triangulation construction.
fn bench_triangulation(c: &mut Criterion) {
    let mut group = c.benchmark_group("triangulation");
    for n in [20, 40, 80, 120] {
        let nodes = generate_nodes(n);
        group.bench_with_input(BenchmarkId::from_parameter(n * n), &nodes, |b, nodes| {
            b.iter(|| Triangulation::new(black_box(nodes)));
        });
    }
    group.finish();
}

/// Benchmark lookups of a 100 x 100 target grid.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let nodes = generate_nodes(60);
    let values: Vec<f64> = nodes.iter().map(|p| 1e-4 * p[0] - 2e-4 * p[1]).collect();
    let targets = generate_targets(100);

    let linear = LinearInterpolator::new(&nodes);
    group.bench_function("linear", |b| {
        b.iter(|| linear.interpolate_points(black_box(&values), black_box(&targets)));
    });

    let nearest = NearestInterpolator::new(&nodes);
    group.bench_function("nearest", |b| {
        b.iter(|| nearest.interpolate_points(black_box(&values), black_box(&targets)));
    });
    group.finish();
}

criterion_group!(benches, bench_triangulation, bench_lookup);
criterion_main!(benches);
