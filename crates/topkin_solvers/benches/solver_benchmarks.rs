//! Criterion benchmarks for the top decay solvers.
//!
//! Compares the massless closed form with the three massive-b variants
//! and times the W mass range search on the same event.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Vector3;
use topkin_solvers::context::SolverContext;
use topkin_solvers::extremum::w_mass_range;
use topkin_solvers::hadronic::solve_hadronic_side;
use topkin_solvers::leptonic::{
    solve_leptonic_side, solve_leptonic_side_massive_b, solve_leptonic_side_massive_b_brute,
};
use topkin_solvers::solution::{HadronicSide, LeptonicSide, PzWindow, QuarkJet};

const MT: f64 = 172.5;
const MWSQ: f64 = 80.4 * 80.4;

fn leptonic_side() -> LeptonicSide {
    LeptonicSide::new(
        10.0,
        5.0,
        Vector3::new(30.0, 0.0, 40.0),
        Vector3::new(0.0, 40.0, 30.0),
    )
}

/// Benchmark the leptonic solvers by b mass treatment.
fn bench_leptonic(c: &mut Criterion) {
    let mut group = c.benchmark_group("leptonic");
    let side = leptonic_side();
    let window = PzWindow::unbounded();
    let mut ctx = SolverContext::default();

    group.bench_function("massless", |b| {
        b.iter(|| solve_leptonic_side(&mut ctx, black_box(&side), MT, 0.0, MWSQ))
    });

    for mb in [0.5, 4.8] {
        group.bench_with_input(BenchmarkId::new("massive_b", mb), &mb, |b, &mb| {
            b.iter(|| solve_leptonic_side_massive_b(&mut ctx, black_box(&side), MT, mb, MWSQ, &window))
        });
        group.bench_with_input(BenchmarkId::new("massive_b_brute", mb), &mb, |b, &mb| {
            b.iter(|| {
                solve_leptonic_side_massive_b_brute(&mut ctx, black_box(&side), MT, mb, MWSQ, &window)
            })
        });
    }

    group.finish();
}

/// Benchmark the hadronic side.
fn bench_hadronic(c: &mut Criterion) {
    let side = HadronicSide {
        q: QuarkJet::massless(Vector3::new(40.0, 10.0, 5.0)),
        qbar: QuarkJet::massless(Vector3::new(-10.0, 30.0, 20.0)),
        b: QuarkJet::new(Vector3::new(20.0, -30.0, 50.0), 4.8),
    };
    c.bench_function("hadronic_side", |b| {
        b.iter(|| solve_hadronic_side(black_box(&side), MT, MWSQ, 0.0))
    });
}

/// Benchmark the W mass range search.
fn bench_w_mass_range(c: &mut Criterion) {
    let side = leptonic_side();
    let trials = [40.0, 60.0, 75.0, 80.0];
    let mut ctx = SolverContext::default();
    c.bench_function("w_mass_range", |b| {
        b.iter(|| w_mass_range(&mut ctx, black_box(&side), MT, 0.0, &trials))
    });
}

criterion_group!(benches, bench_leptonic, bench_hadronic, bench_w_mass_range);
criterion_main!(benches);
