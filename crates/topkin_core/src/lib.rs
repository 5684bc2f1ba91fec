//! # topkin_core: Kinematic Foundation for Top-Decay Reconstruction
//!
//! ## Layer 1 (Foundation) Role
//!
//! topkin_core is the bottom layer of the topkin workspace, providing:
//! - Value records: [`Particle`](types::Particle), fixed-capacity
//!   [`Solutions`](types::Solutions) (`types`)
//! - Error types: [`KinematicsError`](types::KinematicsError),
//!   [`SolverError`](types::SolverError) (`types::error`)
//! - A numerically stable quadratic solver (`math::quadratic`)
//! - Cubic, quartic and general-degree polynomial roots with quartic root
//!   refinement (`math::polynomial`)
//! - Intersection of two conics via the Bezout quartic (`math::ellipse`)
//! - Double-double extended precision arithmetic (`math::double_double`)
//! - Newton system and feasibility bisection drivers (`math::solvers`)
//!
//! ## Minimal Dependency Principle
//!
//! Layer 1 has no dependencies on other topkin_* crates:
//! - nalgebra: 3-vectors, small dense linear solves, companion-matrix eigenvalues
//! - roots: closed-form cubic and quartic real roots
//! - thiserror: error enums
//! - serde: serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use topkin_core::math::quadratic::solve_quadratic;
//! use topkin_core::math::distance::pb_distance;
//!
//! // x² - 3x + 2 = 0 has roots 1 and 2
//! let roots = solve_quadratic(-3.0, 2.0);
//! assert_eq!(roots.as_ref().len(), 2);
//!
//! // Log-distance between momentum magnitudes
//! assert!((pb_distance(50.0, 25.0).unwrap() - 2.0_f64.ln()).abs() < 1e-15);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for value records and error types

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod math;
pub mod types;
