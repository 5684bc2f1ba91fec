//! Numerically stable monic quadratic solver.

use roots::Roots;

/// Solve `x² + bx + c = 0` for its real roots.
///
/// The root of larger magnitude is computed directly from the
/// sign-adjusted discriminant and the other one from the product of roots
/// `x₁x₂ = c`, which avoids subtractive cancellation when `b² ≫ |c|`.
///
/// # Returns
///
/// - `Roots::No` when the discriminant `b² − 4c` is negative
/// - `Roots::One([-b/2])` when the discriminant is exactly zero
/// - `Roots::Two([x1, x2])` otherwise, `x1` being the larger-magnitude root
///
/// # Examples
///
/// ```
/// use roots::Roots;
/// use topkin_core::math::quadratic::solve_quadratic;
///
/// assert_eq!(solve_quadratic(-3.0, 2.0), Roots::Two([2.0, 1.0]));
/// assert_eq!(solve_quadratic(2.0, 1.0), Roots::One([-1.0]));
/// assert_eq!(solve_quadratic(0.0, 1.0), Roots::No([]));
/// ```
pub fn solve_quadratic(b: f64, c: f64) -> Roots<f64> {
    let d = b * b - 4.0 * c;

    if d < 0.0 {
        return Roots::No([]);
    }
    if d == 0.0 {
        return Roots::One([-b / 2.0]);
    }
    if b == 0.0 {
        let x1 = (-c).sqrt();
        return Roots::Two([x1, -x1]);
    }

    let x1 = -(b + b.signum() * d.sqrt()) / 2.0;
    Roots::Two([x1, c / x1])
}

/// Solve the general quadratic `a·x² + b·x + c = 0`.
///
/// Falls back to the linear root when `a == 0`; a fully degenerate
/// equation (`a == b == 0`) has no roots.
pub fn solve_quadratic_general(a: f64, b: f64, c: f64) -> Roots<f64> {
    if a == 0.0 {
        if b == 0.0 {
            return Roots::No([]);
        }
        return Roots::One([-c / b]);
    }
    solve_quadratic(b / a, c / a)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Basic Functionality Tests
    // ========================================

    #[test]
    fn test_distinct_roots() {
        let roots = solve_quadratic(-5.0, 6.0);
        let mut xs = roots.as_ref().to_vec();
        xs.sort_by(|a, b| a.total_cmp(b));
        assert_eq!(xs.len(), 2);
        assert_relative_eq!(xs[0], 2.0, epsilon = 1e-15);
        assert_relative_eq!(xs[1], 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_negative_discriminant() {
        assert!(solve_quadratic(1.0, 1.0).as_ref().is_empty());
    }

    #[test]
    fn test_double_root() {
        assert_eq!(solve_quadratic(-4.0, 4.0), Roots::One([2.0]));
    }

    #[test]
    fn test_zero_linear_term() {
        let roots = solve_quadratic(0.0, -9.0);
        assert_eq!(roots, Roots::Two([3.0, -3.0]));
    }

    #[test]
    fn test_cancellation_avoided() {
        // Roots 1e8 and 1e-8; the naive formula loses the small one entirely
        let roots = solve_quadratic(-(1e8 + 1e-8), 1.0);
        match roots {
            Roots::Two([x1, x2]) => {
                assert_relative_eq!(x1, 1e8, max_relative = 1e-15);
                assert_relative_eq!(x2, 1e-8, max_relative = 1e-15);
            }
            other => panic!("expected two roots, got {:?}", other),
        }
    }

    #[test]
    fn test_general_linear_fallback() {
        assert_eq!(solve_quadratic_general(0.0, 2.0, -4.0), Roots::One([2.0]));
        assert_eq!(solve_quadratic_general(0.0, 0.0, 1.0), Roots::No([]));
        assert_eq!(solve_quadratic_general(2.0, -6.0, 4.0), Roots::Two([2.0, 1.0]));
    }

    // Property-based tests for the quadratic solver
    #[cfg(test)]
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(1000))]

            #[test]
            fn test_roots_satisfy_equation(b in -1e3..1e3_f64, c in -1e3..1e3_f64) {
                let roots = solve_quadratic(b, c);
                let scale = 1.0 + b * b + c.abs();
                for &x in roots.as_ref() {
                    let residual = x * x + b * x + c;
                    prop_assert!(
                        residual.abs() <= 1e-10 * scale.max(x * x),
                        "x = {} leaves residual {} for b = {}, c = {}",
                        x, residual, b, c
                    );
                }
            }

            #[test]
            fn test_no_roots_iff_negative_discriminant(b in -1e3..1e3_f64, c in -1e3..1e3_f64) {
                let roots = solve_quadratic(b, c);
                let negative = b * b - 4.0 * c < 0.0;
                prop_assert_eq!(roots.as_ref().is_empty(), negative);
            }

            #[test]
            fn test_from_known_roots(r1 in -1e3..1e3_f64, r2 in -1e3..1e3_f64) {
                // (x - r1)(x - r2) = x² - (r1 + r2)x + r1·r2
                prop_assume!((r1 - r2).abs() > 1e-3);
                let roots = solve_quadratic(-(r1 + r2), r1 * r2);
                prop_assert!(!roots.as_ref().is_empty());
                let tol = 1e-6 * (1.0 + r1.abs().max(r2.abs()));
                for &x in roots.as_ref() {
                    prop_assert!((x - r1).abs() < tol.max(1e-3) || (x - r2).abs() < tol.max(1e-3));
                }
            }
        }
    }
}
