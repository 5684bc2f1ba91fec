//! Error types for structured error handling.
//!
//! This module provides:
//! - `KinematicsError`: Precondition violations and numerical failures
//!   surfaced by the public solver entry points
//! - `SolverError`: Errors from the iterative numerical drivers

use thiserror::Error;

/// Categorised kinematics errors.
///
/// A returned solution count of zero is *not* an error: kinematically
/// disallowed inputs produce an empty solution set. These variants are
/// reserved for inputs that violate a precondition of the algebra and for
/// numerical breakdowns that leave no usable iterate.
///
/// # Variants
/// - `InvalidInput`: A precondition on the inputs is violated
/// - `DegeneratePolynomial`: A polynomial reduction has a vanishing leading coefficient
/// - `Solver`: An iterative driver failed without a usable result
///
/// # Examples
/// ```
/// use topkin_core::types::KinematicsError;
///
/// let err = KinematicsError::invalid_input("solve_leptonic_side", "lepton momentum is zero");
/// assert_eq!(
///     format!("{}", err),
///     "Invalid input to solve_leptonic_side: lepton momentum is zero"
/// );
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum KinematicsError {
    /// A precondition on the inputs is violated.
    #[error("Invalid input to {context}: {reason}")]
    InvalidInput {
        /// Operation that rejected the input
        context: String,
        /// Human-readable description of the violated precondition
        reason: String,
    },

    /// Leading coefficient of a polynomial reduction is zero.
    #[error("Degenerate polynomial: leading coefficient of degree-{degree} polynomial is zero")]
    DegeneratePolynomial {
        /// Nominal degree of the polynomial
        degree: usize,
    },

    /// Failure reported by an iterative numerical driver.
    #[error(transparent)]
    Solver(#[from] SolverError),
}

impl KinematicsError {
    /// Create an `InvalidInput` error.
    ///
    /// # Arguments
    /// * `context` - Name of the rejecting operation
    /// * `reason` - Description of the violated precondition
    pub fn invalid_input(context: impl Into<String>, reason: impl Into<String>) -> Self {
        KinematicsError::InvalidInput {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Returns `Ok(())` when `condition` holds, an `InvalidInput` error otherwise.
    ///
    /// # Examples
    /// ```
    /// use topkin_core::types::KinematicsError;
    ///
    /// assert!(KinematicsError::ensure(1.0 > 0.0, "op", "mass must be positive").is_ok());
    /// assert!(KinematicsError::ensure(false, "op", "mass must be positive").is_err());
    /// ```
    pub fn ensure(condition: bool, context: &str, reason: &str) -> Result<(), KinematicsError> {
        if condition {
            Ok(())
        } else {
            Err(Self::invalid_input(context, reason))
        }
    }
}

/// Iterative solver errors.
///
/// Provides structured error handling for the Newton system and bisection
/// drivers with descriptive context for each failure mode.
///
/// # Variants
/// - `MaxIterationsExceeded`: Driver failed to converge within iteration limit
/// - `SingularJacobian`: Linearised system could not be solved
/// - `NoBracket`: Bisection endpoints do not straddle the feasibility boundary
/// - `NumericalInstability`: General numerical instability
///
/// # Examples
/// ```
/// use topkin_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Driver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// Jacobian of the Newton system is singular.
    #[error("Singular Jacobian at iteration {iteration}")]
    SingularJacobian {
        /// Iteration at which the linear solve failed
        iteration: usize,
    },

    /// Bisection endpoints do not bracket a feasibility boundary.
    #[error("No bracket: feasibility does not change between {a} and {b}")]
    NoBracket {
        /// Feasible endpoint
        a: f64,
        /// Infeasible endpoint
        b: f64,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),
}
