//! Iterative drivers used by the extremum searches.
//!
//! - [`NewtonSystemSolver`]: Newton-Raphson for small square systems with a
//!   dense LU solve of the Jacobian and an optional oscillation guard
//! - [`BoundaryBisection`]: bisection between a feasible and an infeasible
//!   point, tracking the payload of the last feasible evaluation
//!
//! Both are configured through [`SolverConfig`] or their own tolerance
//! type and never loop more than their iteration cap.
//!
//! ```
//! use nalgebra::{Matrix2, Vector2};
//! use topkin_core::math::solvers::{NewtonSystemSolver, SolverConfig};
//!
//! // x² + y² = 25, x - y = 1
//! let solver = NewtonSystemSolver::<2>::new(SolverConfig::default());
//! let outcome = solver.solve(Vector2::new(1.0, 0.0), |v| {
//!     let (x, y) = (v[0], v[1]);
//!     let r = Vector2::new(x * x + y * y - 25.0, x - y - 1.0);
//!     let j = Matrix2::new(2.0 * x, 2.0 * y, 1.0, -1.0);
//!     (r, j)
//! });
//! assert!(outcome.converged());
//! assert!((outcome.point[0] - 4.0).abs() < 1e-10);
//! ```

mod bisection;
mod config;
mod newton;

pub use crate::types::SolverError;
pub use bisection::{BisectionTolerance, BoundaryBisection, BoundaryPoint};
pub use config::SolverConfig;
pub use newton::{NewtonOutcome, NewtonStatus, NewtonSystemSolver};
