//! Double-double extended precision arithmetic.
//!
//! A [`DoubleDouble`] is an unevaluated sum `hi + lo` of two `f64` values
//! with `|lo| ≤ ulp(hi)/2`, giving about 32 significant decimal digits.
//! It is used where polynomial coefficients are built from long sums of
//! products with heavy cancellation.
//!
//! ```
//! use topkin_core::math::double_double::DoubleDouble;
//!
//! let big = DoubleDouble::from(1.0e16);
//! let sum = big + 1.0 - big;
//! assert_eq!(sum.to_f64(), 1.0);
//! ```

use std::ops::{Add, Div, Mul, Neg, Sub};

// =============================================================================
// Error-free Transformations
// =============================================================================

/// `a + b` and its rounding error. Requires `|a| ≥ |b|`.
#[inline]
fn quick_two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    (s, b - (s - a))
}

/// `a + b` and its rounding error.
#[inline]
fn two_sum(a: f64, b: f64) -> (f64, f64) {
    let s = a + b;
    let bb = s - a;
    (s, (a - (s - bb)) + (b - bb))
}

/// `a · b` and its rounding error, exact through fused multiply-add.
#[inline]
fn two_prod(a: f64, b: f64) -> (f64, f64) {
    let p = a * b;
    (p, a.mul_add(b, -p))
}

// =============================================================================
// DoubleDouble
// =============================================================================

/// Compensated two-float number `hi + lo`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DoubleDouble {
    hi: f64,
    lo: f64,
}

impl DoubleDouble {
    /// Zero.
    pub const ZERO: Self = Self { hi: 0.0, lo: 0.0 };

    /// One.
    pub const ONE: Self = Self { hi: 1.0, lo: 0.0 };

    /// Build from a leading part and a tail, renormalising.
    #[inline]
    pub fn new(hi: f64, lo: f64) -> Self {
        let (hi, lo) = two_sum(hi, lo);
        Self { hi, lo }
    }

    /// Exact product of two doubles.
    #[inline]
    pub fn product(a: f64, b: f64) -> Self {
        let (hi, lo) = two_prod(a, b);
        Self { hi, lo }
    }

    /// Leading component.
    #[inline]
    pub fn hi(&self) -> f64 {
        self.hi
    }

    /// Trailing component.
    #[inline]
    pub fn lo(&self) -> f64 {
        self.lo
    }

    /// Nearest `f64`.
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.hi + self.lo
    }

    /// Square.
    #[inline]
    pub fn square(self) -> Self {
        self * self
    }

    /// Square root by one Newton correction of the `f64` estimate (Karp's
    /// method). Negative inputs give NaN; zero gives zero.
    pub fn sqrt(self) -> Self {
        if self.hi == 0.0 {
            return Self::ZERO;
        }
        if self.hi < 0.0 {
            return Self {
                hi: f64::NAN,
                lo: f64::NAN,
            };
        }
        let x = 1.0 / self.hi.sqrt();
        let ax = self.hi * x;
        let residual = self - Self::product(ax, ax);
        Self::from(ax) + residual.hi * (x * 0.5)
    }

    /// Absolute value.
    #[inline]
    pub fn abs(self) -> Self {
        if self.hi < 0.0 {
            -self
        } else {
            self
        }
    }

    /// True when both components are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.hi.is_finite() && self.lo.is_finite()
    }
}

impl From<f64> for DoubleDouble {
    #[inline]
    fn from(value: f64) -> Self {
        Self { hi: value, lo: 0.0 }
    }
}

impl From<DoubleDouble> for f64 {
    #[inline]
    fn from(value: DoubleDouble) -> Self {
        value.to_f64()
    }
}

// =============================================================================
// Arithmetic Operations
// =============================================================================

impl Add for DoubleDouble {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        let (s1, s2) = two_sum(self.hi, rhs.hi);
        let (t1, t2) = two_sum(self.lo, rhs.lo);
        let (s1, s2) = quick_two_sum(s1, s2 + t1);
        let (hi, lo) = quick_two_sum(s1, s2 + t2);
        Self { hi, lo }
    }
}

impl Add<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn add(self, rhs: f64) -> Self {
        let (s1, s2) = two_sum(self.hi, rhs);
        let (hi, lo) = quick_two_sum(s1, s2 + self.lo);
        Self { hi, lo }
    }
}

impl Add<DoubleDouble> for f64 {
    type Output = DoubleDouble;

    #[inline]
    fn add(self, rhs: DoubleDouble) -> DoubleDouble {
        rhs + self
    }
}

impl Neg for DoubleDouble {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            hi: -self.hi,
            lo: -self.lo,
        }
    }
}

impl Sub for DoubleDouble {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Sub<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: f64) -> Self {
        self + (-rhs)
    }
}

impl Sub<DoubleDouble> for f64 {
    type Output = DoubleDouble;

    #[inline]
    fn sub(self, rhs: DoubleDouble) -> DoubleDouble {
        (-rhs) + self
    }
}

impl Mul for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let (p1, p2) = two_prod(self.hi, rhs.hi);
        let p2 = p2 + (self.hi * rhs.lo + self.lo * rhs.hi);
        let (hi, lo) = quick_two_sum(p1, p2);
        Self { hi, lo }
    }
}

impl Mul<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        let (p1, p2) = two_prod(self.hi, rhs);
        let (hi, lo) = quick_two_sum(p1, p2 + self.lo * rhs);
        Self { hi, lo }
    }
}

impl Mul<DoubleDouble> for f64 {
    type Output = DoubleDouble;

    #[inline]
    fn mul(self, rhs: DoubleDouble) -> DoubleDouble {
        rhs * self
    }
}

impl Div for DoubleDouble {
    type Output = Self;

    /// Long division: three quotient digits, the last one folded into `lo`.
    fn div(self, rhs: Self) -> Self {
        let q1 = self.hi / rhs.hi;
        let r = self - rhs * q1;
        let q2 = r.hi / rhs.hi;
        let r = r - rhs * q2;
        let q3 = r.hi / rhs.hi;
        let (q1, q2) = quick_two_sum(q1, q2);
        Self { hi: q1, lo: q2 } + q3
    }
}

impl Div<f64> for DoubleDouble {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f64) -> Self {
        self / Self::from(rhs)
    }
}

impl Div<DoubleDouble> for f64 {
    type Output = DoubleDouble;

    #[inline]
    fn div(self, rhs: DoubleDouble) -> DoubleDouble {
        DoubleDouble::from(self) / rhs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_M30: f64 = 1.0 / 1_073_741_824.0;

    // ========================================
    // Error-free Transformations
    // ========================================

    #[test]
    fn test_two_sum_is_exact() {
        let (s, e) = two_sum(1.0, 1e-20);
        assert_eq!(s, 1.0);
        assert_eq!(e, 1e-20);
    }

    #[test]
    fn test_two_prod_is_exact() {
        let a = 1.0 + TWO_M30;
        let (p, e) = two_prod(a, a);
        // (1 + 2⁻³⁰)² = 1 + 2⁻²⁹ + 2⁻⁶⁰
        assert_eq!(p, 1.0 + 2.0 * TWO_M30);
        assert_eq!(e, TWO_M30 * TWO_M30);
    }

    // ========================================
    // Arithmetic Tests
    // ========================================

    #[test]
    fn test_cancellation_recovered() {
        let a = DoubleDouble::from(1.0e16) + 1.0;
        let b = a - 1.0e16;
        assert_eq!(b.to_f64(), 1.0);
        assert_eq!(f64::from(b), 1.0);
    }

    #[test]
    fn test_product_keeps_tail() {
        let a = DoubleDouble::from(1.0 + TWO_M30);
        let sq = a * a - (1.0 + 2.0 * TWO_M30);
        assert_eq!(sq.to_f64(), TWO_M30 * TWO_M30);
    }

    #[test]
    fn test_mixed_operands() {
        let x = DoubleDouble::from(3.0);
        assert_eq!((2.0 * x).to_f64(), 6.0);
        assert_eq!((2.0 + x).to_f64(), 5.0);
        assert_eq!((2.0 - x).to_f64(), -1.0);
        assert_eq!((x * 2.0 - 1.0).to_f64(), 5.0);
        assert_eq!((-x).to_f64(), -3.0);
        assert_eq!(x.abs(), (-x).abs());
    }

    #[test]
    fn test_division_round_trip() {
        let third = DoubleDouble::ONE / 3.0;
        let back = third * 3.0 - 1.0;
        assert!(back.to_f64().abs() < 1e-29);
        assert_relative_eq!((6.0 / DoubleDouble::from(4.0)).to_f64(), 1.5);
    }

    #[test]
    fn test_sqrt() {
        let two = DoubleDouble::from(2.0);
        let root = two.sqrt();
        let err = root.square() - two;
        assert!(err.to_f64().abs() < 1e-29);
        assert_eq!(DoubleDouble::ZERO.sqrt(), DoubleDouble::ZERO);
        assert!(DoubleDouble::from(-1.0).sqrt().hi().is_nan());
        assert!(!DoubleDouble::from(-1.0).sqrt().is_finite());
    }

    #[test]
    fn test_new_normalises() {
        let x = DoubleDouble::new(1.0, 1.0);
        assert_eq!(x.hi(), 2.0);
        assert_eq!(x.lo(), 0.0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(500))]

            #[test]
            fn test_sum_matches_f64_leading_part(a in -1e6..1e6_f64, b in -1e6..1e6_f64) {
                let s = DoubleDouble::from(a) + DoubleDouble::from(b);
                prop_assert_eq!(s.hi(), a + b);
                // hi + lo is exactly a + b
                prop_assert_eq!(s.lo(), two_sum(a, b).1);
            }

            #[test]
            fn test_product_is_exact(a in -1e6..1e6_f64, b in -1e6..1e6_f64) {
                let p = DoubleDouble::from(a) * DoubleDouble::from(b);
                let (hi, lo) = two_prod(a, b);
                prop_assert_eq!(p.hi(), hi);
                prop_assert_eq!(p.lo(), lo);
            }
        }
    }
}
