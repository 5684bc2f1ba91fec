//! Bisection on a feasibility boundary.

use crate::types::SolverError;

/// Stopping rule for [`BoundaryBisection`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BisectionTolerance {
    /// Stop when `|a − b| ≤ width`.
    Absolute(f64),
    /// Stop when `|a − b| / (1 + |a + b|/2) ≤ precision`.
    Relative(f64),
}

impl BisectionTolerance {
    fn satisfied(&self, a: f64, b: f64) -> bool {
        match *self {
            BisectionTolerance::Absolute(width) => (a - b).abs() <= width,
            BisectionTolerance::Relative(precision) => {
                (a - b).abs() / (1.0 + 0.5 * (a + b).abs()) <= precision
            }
        }
    }
}

/// Result of a boundary search.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPoint<S> {
    /// Feasible point closest to the boundary.
    pub feasible: f64,
    /// Infeasible point closest to the boundary.
    pub infeasible: f64,
    /// Payload produced by the last successful evaluation.
    pub payload: S,
    /// Number of evaluations performed.
    pub evaluations: usize,
}

/// Bisection between a point where some computation succeeds (feasible)
/// and one where it does not.
///
/// The evaluation callback returns `Some(payload)` at feasible points. The
/// interval shrinks around the boundary and the payload of the innermost
/// feasible point is kept.
///
/// # Example
///
/// ```
/// use topkin_core::math::solvers::{BisectionTolerance, BoundaryBisection};
///
/// // sqrt is defined for x >= 0: locate the boundary from [-1, 4]
/// let search = BoundaryBisection::new(BisectionTolerance::Absolute(1e-9), 200);
/// let found = search
///     .find_boundary(4.0, 2.0, -1.0, |x| {
///         Ok::<_, topkin_core::types::SolverError>((x >= 0.0).then(|| x.sqrt()))
///     })
///     .unwrap();
/// assert!(found.feasible >= 0.0 && found.feasible < 1e-9);
/// assert!(found.infeasible < 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryBisection {
    tolerance: BisectionTolerance,
    max_iterations: usize,
}

impl BoundaryBisection {
    /// Create a search with the given stopping rule and evaluation cap.
    pub fn new(tolerance: BisectionTolerance, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Stopping rule.
    pub fn tolerance(&self) -> BisectionTolerance {
        self.tolerance
    }

    /// Shrink `[feasible, infeasible]` onto the boundary.
    ///
    /// `payload` is the evaluation result already known at `feasible`.
    ///
    /// # Errors
    ///
    /// - `SolverError::NoBracket` when the endpoints coincide or are not finite
    /// - `SolverError::MaxIterationsExceeded` when the cap is reached first
    /// - any error returned by `eval`
    pub fn find_boundary<S, E, F>(
        &self,
        feasible: f64,
        payload: S,
        infeasible: f64,
        mut eval: F,
    ) -> Result<BoundaryPoint<S>, E>
    where
        E: From<SolverError>,
        F: FnMut(f64) -> Result<Option<S>, E>,
    {
        if !(feasible.is_finite() && infeasible.is_finite()) || feasible == infeasible {
            return Err(SolverError::NoBracket {
                a: feasible,
                b: infeasible,
            }
            .into());
        }

        let mut good = feasible;
        let mut bad = infeasible;
        let mut payload = payload;
        let mut evaluations = 0;

        while !self.tolerance.satisfied(good, bad) {
            if evaluations >= self.max_iterations {
                return Err(SolverError::MaxIterationsExceeded {
                    iterations: evaluations,
                }
                .into());
            }
            let mid = 0.5 * (good + bad);
            if mid == good || mid == bad {
                break;
            }
            evaluations += 1;
            match eval(mid)? {
                Some(found) => {
                    good = mid;
                    payload = found;
                }
                None => bad = mid,
            }
        }

        Ok(BoundaryPoint {
            feasible: good,
            infeasible: bad,
            payload,
            evaluations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold(limit: f64) -> impl FnMut(f64) -> Result<Option<f64>, SolverError> {
        move |x| Ok((x <= limit).then_some(x * 2.0))
    }

    #[test]
    fn test_absolute_tolerance() {
        let search = BoundaryBisection::new(BisectionTolerance::Absolute(0.01), 100);
        let found = search.find_boundary(0.0, 0.0, 10.0, threshold(3.3)).unwrap();
        assert!(found.feasible <= 3.3);
        assert!(found.infeasible > 3.3);
        assert!(found.infeasible - found.feasible <= 0.01);
        assert_eq!(found.payload, found.feasible * 2.0);
    }

    #[test]
    fn test_relative_tolerance_decreasing_direction() {
        // Feasible above the boundary
        let search = BoundaryBisection::new(BisectionTolerance::Relative(1e-10), 200);
        let found = search
            .find_boundary(100.0, (), -50.0, |x| Ok::<_, SolverError>((x > 7.5).then_some(())))
            .unwrap();
        assert!(found.feasible > 7.5);
        assert!((found.feasible - 7.5).abs() < 1e-8);
    }

    #[test]
    fn test_payload_untouched_when_already_converged() {
        let search = BoundaryBisection::new(BisectionTolerance::Absolute(1.0), 10);
        let found = search.find_boundary(1.0, 42.0, 1.5, threshold(1.2)).unwrap();
        assert_eq!(found.payload, 42.0);
        assert_eq!(found.evaluations, 0);
    }

    #[test]
    fn test_no_bracket() {
        let search = BoundaryBisection::new(BisectionTolerance::Absolute(0.01), 10);
        let err = search.find_boundary(1.0, 0.0, 1.0, threshold(1.0)).unwrap_err();
        assert!(matches!(err, SolverError::NoBracket { .. }));
    }

    #[test]
    fn test_iteration_cap() {
        let search = BoundaryBisection::new(BisectionTolerance::Absolute(1e-12), 5);
        let err = search.find_boundary(0.0, 0.0, 10.0, threshold(3.3)).unwrap_err();
        assert_eq!(err, SolverError::MaxIterationsExceeded { iterations: 5 });
    }

    #[test]
    fn test_evaluation_error_propagates() {
        let search = BoundaryBisection::new(BisectionTolerance::Absolute(0.01), 100);
        let err = search
            .find_boundary(0.0, 0.0, 1.0, |_| {
                Err::<Option<f64>, _>(SolverError::NumericalInstability("bad".to_string()))
            })
            .unwrap_err();
        assert!(matches!(err, SolverError::NumericalInstability(_)));
    }
}
