//! Newton-Raphson for small square nonlinear systems.

use super::SolverConfig;
use nalgebra::{Const, DimMin, SMatrix, SVector};

/// How a Newton run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NewtonStatus {
    /// Every relative step fell below the tolerance.
    Converged,
    /// The iteration cap was reached.
    MaxIterations,
    /// The first component kept reversing direction with growing steps.
    Oscillating,
    /// The Jacobian could not be factorised.
    Singular,
    /// An iterate became non-finite.
    Diverged,
}

/// Final state of a Newton run.
///
/// The point is the last iterate whatever the status, so callers can still
/// report it (flagged) when the run did not converge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonOutcome<const N: usize> {
    /// Last iterate.
    pub point: SVector<f64, N>,
    /// Last step applied (zero when no step was taken).
    pub step: SVector<f64, N>,
    /// Number of Jacobian evaluations.
    pub iterations: usize,
    /// Termination reason.
    pub status: NewtonStatus,
}

impl<const N: usize> NewtonOutcome<N> {
    /// True when the run converged.
    #[inline]
    pub fn converged(&self) -> bool {
        self.status == NewtonStatus::Converged
    }

    /// Relative size `|dx_i| / (|x_i| + 1)` of the last step per component.
    pub fn relative_step(&self) -> SVector<f64, N> {
        SVector::from_fn(|i, _| SolverConfig::relative_step(self.point[i], self.step[i]))
    }
}

/// Newton-Raphson driver for `N` equations in `N` unknowns.
///
/// Each iteration evaluates the residual vector `r` and Jacobian `J` at the
/// current point and solves `J·d = −r` by LU decomposition.
///
/// With the oscillation guard enabled the run is abandoned once the step in
/// the first component has changed sign while growing in magnitude more
/// than twice.
#[derive(Debug, Clone)]
pub struct NewtonSystemSolver<const N: usize> {
    config: SolverConfig,
    oscillation_guard: bool,
}

impl<const N: usize> NewtonSystemSolver<N>
where
    Const<N>: DimMin<Const<N>, Output = Const<N>>,
{
    /// Number of growing sign reversals tolerated by the oscillation guard.
    pub const MAX_DIRECTION_CHANGES: usize = 2;

    /// Create a driver with the given configuration and no oscillation guard.
    pub fn new(config: SolverConfig) -> Self {
        Self {
            config,
            oscillation_guard: false,
        }
    }

    /// Enable the oscillation guard on the first component.
    pub fn with_oscillation_guard(mut self) -> Self {
        self.oscillation_guard = true;
        self
    }

    /// Returns a reference to the driver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Iterate from `x0`. `system` returns the residuals and the Jacobian
    /// (`J[(i, j)] = ∂r_i/∂x_j`) at the given point.
    pub fn solve<F>(&self, x0: SVector<f64, N>, mut system: F) -> NewtonOutcome<N>
    where
        F: FnMut(&SVector<f64, N>) -> (SVector<f64, N>, SMatrix<f64, N, N>),
    {
        let mut x = x0;
        let mut step = SVector::<f64, N>::zeros();
        let mut old_first = 0.0;
        let mut direction_changes = 0;

        for iteration in 1..=self.config.max_iterations {
            let (residual, jacobian) = system(&x);

            let d = match jacobian.lu().solve(&(-residual)) {
                Some(d) if d.iter().all(|v| v.is_finite()) => d,
                _ => {
                    return NewtonOutcome {
                        point: x,
                        step,
                        iterations: iteration,
                        status: NewtonStatus::Singular,
                    }
                }
            };

            x += d;
            step = d;

            if !x.iter().all(|v| v.is_finite()) {
                return NewtonOutcome {
                    point: x,
                    step,
                    iterations: iteration,
                    status: NewtonStatus::Diverged,
                };
            }

            if self.oscillation_guard && N > 0 {
                let first = d[0];
                if old_first * first < 0.0 && first.abs() > old_first.abs() {
                    direction_changes += 1;
                    if direction_changes > Self::MAX_DIRECTION_CHANGES {
                        return NewtonOutcome {
                            point: x,
                            step,
                            iterations: iteration,
                            status: NewtonStatus::Oscillating,
                        };
                    }
                }
                old_first = first;
            }

            let small = x
                .iter()
                .zip(d.iter())
                .all(|(&xi, &di)| self.config.step_converged(xi, di));
            if small {
                return NewtonOutcome {
                    point: x,
                    step,
                    iterations: iteration,
                    status: NewtonStatus::Converged,
                };
            }
        }

        NewtonOutcome {
            point: x,
            step,
            iterations: self.config.max_iterations,
            status: NewtonStatus::MaxIterations,
        }
    }
}
