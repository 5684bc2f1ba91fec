//! Numerical primitives for kinematic reconstruction.
//!
//! - [`quadratic`]: stable monic quadratic
//! - [`polynomial`]: cubic, quartic and general-degree roots, quartic root refinement
//! - [`ellipse`]: conic-conic intersection
//! - [`double_double`]: compensated two-float arithmetic
//! - [`distance`]: log-distance between momentum magnitudes
//! - [`sorting`]: stable float-keyed sort
//! - [`solvers`]: Newton system and feasibility bisection drivers

pub mod distance;
pub mod double_double;
pub mod ellipse;
pub mod polynomial;
pub mod quadratic;
pub mod solvers;
pub mod sorting;
