//! Intersection of two conic sections.

use crate::math::polynomial::checked_quartic_roots;
use crate::math::quadratic::solve_quadratic;
use crate::math::sorting::sort_by_key_f64;
use crate::types::{KinematicsError, Solutions};
use roots::Roots;

/// Conic `a00·x² + 2a01·xy + a11·y² + b0·x + b1·y + c = 0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EllipseCoefficients {
    /// Coefficient of `x²`
    pub a00: f64,
    /// Half the coefficient of `xy`
    pub a01: f64,
    /// Coefficient of `y²`
    pub a11: f64,
    /// Coefficient of `x`
    pub b0: f64,
    /// Coefficient of `y`
    pub b1: f64,
    /// Constant term
    pub c: f64,
}

impl EllipseCoefficients {
    /// Value of the conic polynomial at `(x, y)`.
    pub fn evaluate(&self, x: f64, y: f64) -> f64 {
        self.a00 * x * x
            + 2.0 * self.a01 * x * y
            + self.a11 * y * y
            + self.b0 * x
            + self.b1 * y
            + self.c
    }

    /// Real `x` values on the conic at height `y`.
    fn x_at(&self, y: f64) -> Roots<f64> {
        let b = 2.0 * self.a01 * y + self.b0;
        let c = (self.a11 * y + self.b1) * y + self.c;
        solve_quadratic(b / self.a00, c / self.a00)
    }
}

/// A point of intersection.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IntersectionPoint {
    /// Abscissa
    pub x: f64,
    /// Ordinate
    pub y: f64,
}

fn both_roots(roots: Roots<f64>) -> Option<[f64; 2]> {
    match roots {
        Roots::One([x]) => Some([x, x]),
        Roots::Two(pair) => Some(pair),
        _ => None,
    }
}

/// Midpoint of the closest pair between the two candidate sets.
fn best_match(x0: [f64; 2], x1: [f64; 2]) -> f64 {
    let mut pairs = [
        ((x0[0] - x1[0]).abs(), 0.5 * (x0[0] + x1[0])),
        ((x0[0] - x1[1]).abs(), 0.5 * (x0[0] + x1[1])),
        ((x0[1] - x1[0]).abs(), 0.5 * (x0[1] + x1[0])),
        ((x0[1] - x1[1]).abs(), 0.5 * (x0[1] + x1[1])),
    ];
    sort_by_key_f64(&mut pairs, |p| p.0);
    pairs[0].1
}

/// Intersect two conics.
///
/// `y` is eliminated through the Bezout resultant, a quartic in `y` whose
/// real roots are found with [`checked_quartic_roots`]. At each root both
/// conics are solved for `x`; the closest pair of candidates is averaged.
/// Roots where either conic has no real `x` are skipped.
///
/// Both conics must have a non-zero `a00`.
///
/// # Errors
///
/// - [`KinematicsError::InvalidInput`] when either `a00` is zero
/// - [`KinematicsError::DegeneratePolynomial`] when the resultant quartic
///   has a vanishing leading coefficient
///
/// # Examples
///
/// ```
/// use topkin_core::math::ellipse::{ellipse_intersection, EllipseCoefficients};
///
/// // Circle of radius 1.5 around (0.5, -0.25) and a tilted ellipse
/// let circle = EllipseCoefficients {
///     a00: 1.0, a01: 0.0, a11: 1.0, b0: -1.0, b1: 0.5, c: -1.9375,
/// };
/// let ellipse = EllipseCoefficients {
///     a00: 2.0, a01: 0.5, a11: 1.0, b0: -1.0, b1: 0.5, c: -3.0,
/// };
/// let points = ellipse_intersection(&circle, &ellipse).unwrap();
/// assert_eq!(points.len(), 4);
/// for p in points.iter() {
///     assert!(circle.evaluate(p.x, p.y).abs() < 1e-8);
///     assert!(ellipse.evaluate(p.x, p.y).abs() < 1e-8);
/// }
/// ```
pub fn ellipse_intersection(
    e0: &EllipseCoefficients,
    e1: &EllipseCoefficients,
) -> Result<Solutions<IntersectionPoint, 4>, KinematicsError> {
    KinematicsError::ensure(
        e0.a00 != 0.0 && e1.a00 != 0.0,
        "ellipse_intersection",
        "both conics need a non-zero x² coefficient",
    )?;

    let v0 = 2.0 * (e0.a00 * e1.a01 - e1.a00 * e0.a01);
    let v1 = e0.a00 * e1.a11 - e1.a00 * e0.a11;
    let v2 = e0.a00 * e1.b0 - e1.a00 * e0.b0;
    let v3 = e0.a00 * e1.b1 - e1.a00 * e0.b1;
    let v4 = e0.a00 * e1.c - e1.a00 * e0.c;
    let v5 = 2.0 * (e0.a01 * e1.a11 - e1.a01 * e0.a11);
    let v6 = 2.0 * (e0.a01 * e1.b1 - e1.a01 * e0.b1);
    let v7 = 2.0 * (e0.a01 * e1.c - e1.a01 * e0.c);
    let v8 = e0.a11 * e1.b0 - e1.a11 * e0.b0;
    let v9 = e0.b0 * e1.b1 - e1.b0 * e0.b1;
    let v10 = e0.b0 * e1.c - e1.b0 * e0.c;

    let u0 = v2 * v10 - v4 * v4;
    let u1 = v0 * v10 + v2 * (v7 + v9) - 2.0 * v3 * v4;
    let u2 = v0 * (v7 + v9) + v2 * (v6 - v8) - v3 * v3 - 2.0 * v1 * v4;
    let u3 = v0 * (v6 - v8) + v2 * v5 - 2.0 * v1 * v3;
    let u4 = v0 * v5 - v1 * v1;

    let ys = checked_quartic_roots(u4, u3, u2, u1, u0)?;

    let mut points = Solutions::new();
    for &y in ys.iter() {
        if let (Some(x0), Some(x1)) = (both_roots(e0.x_at(y)), both_roots(e1.x_at(y))) {
            points.push(IntersectionPoint {
                x: best_match(x0, x1),
                y,
            });
        }
    }
    Ok(points)
}
