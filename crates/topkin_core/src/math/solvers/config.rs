//! Iteration driver configuration.

use crate::types::KinematicsError;

/// Tolerance and iteration cap shared by the iterative drivers.
///
/// Steps are measured relative to the iterate as `|dx| / (|x| + 1)`, so a
/// component near zero (a vanishing neutrino momentum, say) is judged on
/// its absolute step while large momenta are judged on their relative one.
///
/// # Example
///
/// ```
/// use topkin_core::math::solvers::SolverConfig;
///
/// let config = SolverConfig::default();
/// assert_eq!(config.tolerance, 1e-12);
/// assert_eq!(config.max_iterations, 100);
///
/// let loose = SolverConfig::new(1e-6, 20).unwrap();
/// assert!(loose.step_converged(1000.0, 1e-4));
/// assert!(!loose.step_converged(0.0, 1e-4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverConfig {
    /// Relative step tolerance.
    pub tolerance: f64,

    /// Maximum number of iterations before giving up.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    /// Relative tolerance 1e-12, at most 100 iterations.
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            max_iterations: 100,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration.
    ///
    /// # Errors
    ///
    /// [`KinematicsError::InvalidInput`] if `tolerance` is not a positive
    /// finite number or `max_iterations == 0`.
    pub fn new(tolerance: f64, max_iterations: usize) -> Result<Self, KinematicsError> {
        KinematicsError::ensure(
            tolerance > 0.0 && tolerance.is_finite(),
            "SolverConfig",
            "tolerance must be positive",
        )?;
        KinematicsError::ensure(
            max_iterations > 0,
            "SolverConfig",
            "max_iterations must be > 0",
        )?;
        Ok(Self {
            tolerance,
            max_iterations,
        })
    }

    /// Size of the step `dx` taken from `x`, relative to `|x| + 1`.
    #[inline]
    pub fn relative_step(x: f64, dx: f64) -> f64 {
        dx.abs() / (x.abs() + 1.0)
    }

    /// True when the step `dx` taken from `x` is below the tolerance.
    #[inline]
    pub fn step_converged(&self, x: f64, dx: f64) -> bool {
        Self::relative_step(x, dx) < self.tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SolverConfig::default();
        assert_eq!(config.tolerance, 1e-12);
        assert_eq!(config.max_iterations, 100);
    }

    #[test]
    fn test_new_config() {
        let config = SolverConfig::new(1e-10, 200).unwrap();
        assert_eq!(config.max_iterations, 200);
        assert_eq!(config.tolerance, 1e-10);
    }

    #[test]
    fn test_new_config_rejects_bad_values() {
        assert!(matches!(
            SolverConfig::new(0.0, 100),
            Err(KinematicsError::InvalidInput { .. })
        ));
        assert!(SolverConfig::new(f64::NAN, 100).is_err());
        assert!(SolverConfig::new(1e-10, 0).is_err());
    }

    #[test]
    fn test_step_scale() {
        let config = SolverConfig::new(1e-8, 10).unwrap();
        // Near zero the step is absolute
        assert_eq!(SolverConfig::relative_step(0.0, 5e-9), 5e-9);
        assert!(config.step_converged(0.0, 5e-9));
        assert!(!config.step_converged(0.0, 5e-8));
        // A 1 TeV momentum tolerates a proportionally larger step
        assert!(config.step_converged(1000.0, 5e-6));
        assert!(!config.step_converged(1000.0, 5e-5));
    }
}
