//! Real polynomial root finding.
//!
//! Cubic and quartic roots come from the closed-form solvers of the
//! `roots` crate. Quartic roots are then refined with a local Taylor model
//! ([`refine_quartic_root`]) which also rejects spurious roots that the
//! closed form produces near multiple roots. Higher degrees (up to 8) use
//! the eigenvalues of a balanced companion matrix.

use crate::math::quadratic::solve_quadratic;
use crate::types::{KinematicsError, Solutions};
use nalgebra::{DMatrix, Schur};
use roots::{find_roots_cubic, find_roots_quartic, Roots};

/// Highest degree accepted by [`polynomial_roots`].
pub const MAX_POLYNOMIAL_DEGREE: usize = 8;

/// Imaginary parts below this fraction of `max(|re|, 1)` count as zero.
const REAL_ROOT_TOLERANCE: f64 = 1e-10;

/// Newton polishing steps applied to each real eigenvalue.
const POLISH_STEPS: usize = 3;

/// Real roots of the monic cubic `x³ + a·x² + b·x + c`.
#[inline]
pub fn cubic_real_roots(a: f64, b: f64, c: f64) -> Roots<f64> {
    find_roots_cubic(1.0, a, b, c)
}

/// Real roots of the monic quartic `x⁴ + a·x³ + b·x² + c·x + d`, unrefined.
#[inline]
pub fn quartic_real_roots(a: f64, b: f64, c: f64, d: f64) -> Roots<f64> {
    find_roots_quartic(1.0, a, b, c, d)
}

/// Refine an estimate `x0` of a root of the monic quartic
/// `x⁴ + a·x³ + b·x² + c·x + d`.
///
/// The quartic is expanded around `x0`. When the third derivative does not
/// vanish the cubic Taylor model is solved; it must have one real root if
/// `f'² > 2f''f` and three otherwise, and the correction of smallest
/// magnitude below 1 is applied. With a vanishing third derivative a Newton
/// step (flat `f''`) or the quadratic Taylor model is used, provided
/// `f'² > 2f''f`.
///
/// Returns `None` when no acceptable correction exists; the estimate is
/// then treated as a spurious root.
///
/// # Examples
///
/// ```
/// use topkin_core::math::polynomial::refine_quartic_root;
///
/// // (x - 1)(x - 2)(x - 3)(x - 4) = x⁴ - 10x³ + 35x² - 50x + 24
/// let x = refine_quartic_root(-10.0, 35.0, -50.0, 24.0, 2.001).unwrap();
/// assert!((x - 2.0).abs() < 1e-8);
/// ```
pub fn refine_quartic_root(a: f64, b: f64, c: f64, d: f64, x0: f64) -> Option<f64> {
    let f0 = x0 * (x0 * (x0 * (x0 + a) + b) + c) + d;
    let deriv1 = x0 * (x0 * (4.0 * x0 + 3.0 * a) + 2.0 * b) + c;
    let deriv2 = x0 * (12.0 * x0 + 6.0 * a) + 2.0 * b;
    let deriv3 = 24.0 * x0 + 6.0 * a;
    let looks_real = deriv1 * deriv1 > 2.0 * deriv2 * f0;

    if deriv3 != 0.0 {
        let corrections = cubic_real_roots(
            deriv2 / deriv3 * 3.0,
            deriv1 / deriv3 * 6.0,
            f0 / deriv3 * 6.0,
        );
        let required = if looks_real { 1 } else { 3 };
        if corrections.as_ref().len() < required {
            return None;
        }
        let mut best: Option<f64> = None;
        let mut min_diff = 1.0;
        for &dx in corrections.as_ref() {
            if dx.abs() < min_diff {
                min_diff = dx.abs();
                best = Some(x0 + dx);
            }
        }
        best
    } else if looks_real {
        if deriv2 == 0.0 {
            Some(x0 - f0 / deriv1)
        } else {
            let dx = match solve_quadratic(2.0 * deriv1 / deriv2, 2.0 * f0 / deriv2) {
                Roots::One([x]) => x,
                Roots::Two([x1, x2]) => {
                    if x1.abs() < x2.abs() {
                        x1
                    } else {
                        x2
                    }
                }
                _ => return None,
            };
            (dx.abs() < 1.0).then_some(x0 + dx)
        }
    } else {
        None
    }
}

fn refined_quartic_roots(
    coeffs: [f64; 5],
    accept_estimate: fn(f64) -> bool,
    accept_refined: fn(f64) -> bool,
) -> Result<Solutions<f64, 4>, KinematicsError> {
    let [a, b, c, d, e] = coeffs;
    if a == 0.0 {
        return Err(KinematicsError::DegeneratePolynomial { degree: 4 });
    }
    let (ca, cb, cc, cd) = (b / a, c / a, d / a, e / a);

    let mut out = Solutions::new();
    for &x0 in quartic_real_roots(ca, cb, cc, cd).as_ref() {
        if !accept_estimate(x0) {
            continue;
        }
        if let Some(x) = refine_quartic_root(ca, cb, cc, cd, x0) {
            if accept_refined(x) {
                out.push(x);
            }
        }
    }
    Ok(out)
}

/// Positive real roots of `a·x⁴ + b·x³ + c·x² + d·x + e`, refined.
///
/// Only positive raw estimates are refined, and a refined value is kept
/// only when it is still positive.
///
/// # Errors
///
/// [`KinematicsError::DegeneratePolynomial`] when `a == 0`.
pub fn positive_quartic_roots(
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
) -> Result<Solutions<f64, 4>, KinematicsError> {
    refined_quartic_roots([a, b, c, d, e], |x| x > 0.0, |x| x > 0.0)
}

/// Real roots of `a·x⁴ + b·x³ + c·x² + d·x + e` of any sign, refined.
///
/// # Errors
///
/// [`KinematicsError::DegeneratePolynomial`] when `a == 0`.
pub fn checked_quartic_roots(
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
) -> Result<Solutions<f64, 4>, KinematicsError> {
    refined_quartic_roots([a, b, c, d, e], |_| true, |x| x.is_finite())
}

/// A root of a general real polynomial.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolynomialRoot {
    /// Real part
    pub re: f64,
    /// Imaginary part
    pub im: f64,
    /// True when the imaginary part is numerically zero
    pub is_real: bool,
}

/// Evaluate a polynomial given in decreasing powers (Horner scheme).
#[inline]
pub fn horner(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().fold(0.0, |acc, &c| acc * x + c)
}

/// Value and first derivative of a polynomial in decreasing powers.
fn horner_with_derivative(coeffs: &[f64], x: f64) -> (f64, f64) {
    let mut p = 0.0;
    let mut dp = 0.0;
    for &c in coeffs {
        dp = dp * x + p;
        p = p * x + c;
    }
    (p, dp)
}

/// Parlett-Reinsch balancing with radix-2 scaling factors.
fn balance(m: &mut DMatrix<f64>) {
    const RADIX: f64 = 2.0;
    let n = m.nrows();
    let mut done = false;
    while !done {
        done = true;
        for i in 0..n {
            let mut r = 0.0;
            let mut c = 0.0;
            for j in 0..n {
                if j != i {
                    c += m[(j, i)].abs();
                    r += m[(i, j)].abs();
                }
            }
            if c == 0.0 || r == 0.0 {
                continue;
            }
            let s = c + r;
            let mut g = r / RADIX;
            let mut f = 1.0;
            while c < g {
                f *= RADIX;
                c *= RADIX * RADIX;
            }
            g = r * RADIX;
            while c > g {
                f /= RADIX;
                c /= RADIX * RADIX;
            }
            if (c + r) / f < 0.95 * s {
                done = false;
                let g = 1.0 / f;
                for j in 0..n {
                    m[(i, j)] *= g;
                }
                for j in 0..n {
                    m[(j, i)] *= f;
                }
            }
        }
    }
}

fn polish(coeffs: &[f64], x0: f64) -> f64 {
    let mut x = x0;
    let (mut px, _) = horner_with_derivative(coeffs, x);
    for _ in 0..POLISH_STEPS {
        let (p, dp) = horner_with_derivative(coeffs, x);
        if p == 0.0 || dp == 0.0 {
            break;
        }
        let candidate = x - p / dp;
        let pc = horner(coeffs, candidate);
        if pc.is_nan() || pc.abs() >= px.abs() {
            break;
        }
        x = candidate;
        px = pc;
    }
    x
}

/// All roots of a real polynomial of degree at most
/// [`MAX_POLYNOMIAL_DEGREE`], coefficients in decreasing powers.
///
/// Leading zero coefficients are stripped. The roots are the eigenvalues of
/// the balanced companion matrix; real ones are polished with a few Newton
/// steps. For a complex-conjugate pair whose imaginary part is below the
/// noise level only one member is reported as real, so double roots are not
/// duplicated.
///
/// # Errors
///
/// - [`KinematicsError::DegeneratePolynomial`] when every coefficient is zero
/// - [`KinematicsError::InvalidInput`] when the degree exceeds the maximum
///   or a coefficient is not finite
///
/// # Examples
///
/// ```
/// use topkin_core::math::polynomial::polynomial_roots;
///
/// // 0·x³ + x² - 1
/// let roots = polynomial_roots(&[0.0, 1.0, 0.0, -1.0]).unwrap();
/// let mut real: Vec<f64> = roots.iter().filter(|r| r.is_real).map(|r| r.re).collect();
/// real.sort_by(|a, b| a.total_cmp(b));
/// assert!((real[0] + 1.0).abs() < 1e-12);
/// assert!((real[1] - 1.0).abs() < 1e-12);
/// ```
pub fn polynomial_roots(coeffs: &[f64]) -> Result<Vec<PolynomialRoot>, KinematicsError> {
    KinematicsError::ensure(
        coeffs.iter().all(|c| c.is_finite()),
        "polynomial_roots",
        "coefficients must be finite",
    )?;
    let first = match coeffs.iter().position(|&c| c != 0.0) {
        Some(i) => i,
        None => {
            return Err(KinematicsError::DegeneratePolynomial {
                degree: coeffs.len().saturating_sub(1),
            })
        }
    };
    let coeffs = &coeffs[first..];
    let degree = coeffs.len() - 1;
    KinematicsError::ensure(
        degree <= MAX_POLYNOMIAL_DEGREE,
        "polynomial_roots",
        "degree exceeds 8",
    )?;
    if degree == 0 {
        return Ok(Vec::new());
    }

    let lead = coeffs[0];
    let mut companion = DMatrix::<f64>::zeros(degree, degree);
    for j in 0..degree {
        companion[(0, j)] = -coeffs[j + 1] / lead;
    }
    for i in 1..degree {
        companion[(i, i - 1)] = 1.0;
    }
    balance(&mut companion);

    let eigenvalues = Schur::new(companion).complex_eigenvalues();

    let roots = eigenvalues
        .iter()
        .map(|z| {
            let exact = z.im == 0.0;
            let tiny = z.im.abs() <= REAL_ROOT_TOLERANCE * z.re.abs().max(1.0);
            if exact || (tiny && z.im > 0.0) {
                PolynomialRoot {
                    re: polish(coeffs, z.re),
                    im: 0.0,
                    is_real: true,
                }
            } else {
                PolynomialRoot {
                    re: z.re,
                    im: z.im,
                    is_real: false,
                }
            }
        })
        .collect();
    Ok(roots)
}

/// Real roots of a polynomial in decreasing powers, as plain values.
///
/// # Errors
///
/// Same as [`polynomial_roots`].
pub fn real_polynomial_roots(coeffs: &[f64]) -> Result<Vec<f64>, KinematicsError> {
    Ok(polynomial_roots(coeffs)?
        .into_iter()
        .filter(|r| r.is_real)
        .map(|r| r.re)
        .collect())
}
