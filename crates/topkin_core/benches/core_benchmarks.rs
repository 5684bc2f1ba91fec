//! Criterion benchmarks for topkin_core root finders.
//!
//! Measures the closed-form quartic with refinement, the companion-matrix
//! solver across degrees, and the conic intersection.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use topkin_core::math::ellipse::{ellipse_intersection, EllipseCoefficients};
use topkin_core::math::polynomial::{checked_quartic_roots, polynomial_roots};
use topkin_core::math::quadratic::solve_quadratic;

/// Coefficients of Π (x − k) for k = 1..=degree, in decreasing powers.
fn product_polynomial(degree: usize) -> Vec<f64> {
    let mut coeffs = vec![1.0];
    for k in 1..=degree {
        let mut next = vec![0.0; coeffs.len() + 1];
        for (i, &c) in coeffs.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c * k as f64;
        }
        coeffs = next;
    }
    coeffs
}

/// Benchmark the quadratic and refined quartic solvers.
fn bench_closed_form(c: &mut Criterion) {
    let mut group = c.benchmark_group("closed_form");

    group.bench_function("quadratic", |b| {
        b.iter(|| solve_quadratic(black_box(-7.0), black_box(12.0)))
    });

    group.bench_function("checked_quartic", |b| {
        b.iter(|| {
            checked_quartic_roots(
                black_box(1.0),
                black_box(-2.0),
                black_box(-13.0),
                black_box(14.0),
                black_box(24.0),
            )
        })
    });

    group.finish();
}

/// Benchmark the companion-matrix solver by degree.
fn bench_polynomial_roots(c: &mut Criterion) {
    let mut group = c.benchmark_group("polynomial_roots");

    for degree in [2, 4, 6, 8] {
        let coeffs = product_polynomial(degree);
        group.bench_with_input(BenchmarkId::new("degree", degree), &coeffs, |b, coeffs| {
            b.iter(|| polynomial_roots(black_box(coeffs)).unwrap());
        });
    }

    group.finish();
}

/// Benchmark conic intersection.
fn bench_ellipse_intersection(c: &mut Criterion) {
    let circle = EllipseCoefficients {
        a00: 1.0,
        a01: 0.0,
        a11: 1.0,
        b0: -1.0,
        b1: 0.5,
        c: -1.9375,
    };
    let tilted = EllipseCoefficients {
        a00: 2.0,
        a01: 0.5,
        a11: 1.0,
        b0: -1.0,
        b1: 0.5,
        c: -3.0,
    };
    c.bench_function("ellipse_intersection", |b| {
        b.iter(|| ellipse_intersection(black_box(&circle), black_box(&tilted)))
    });
}

criterion_group!(
    benches,
    bench_closed_form,
    bench_polynomial_roots,
    bench_ellipse_intersection
);
criterion_main!(benches);
