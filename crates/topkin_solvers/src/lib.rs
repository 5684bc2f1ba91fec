//! # topkin_solvers: Kinematic Constraint Solvers for Top-Quark Decays
//!
//! ## Layer 2 (Solvers) Role
//!
//! topkin_solvers builds on [`topkin_core`] and provides:
//! - Solver settings and their loading from TOML or the environment (`config`)
//! - Per-caller solver state: diagnostics sink, warning budgets, massive-b
//!   fast-break table and call counters (`context`)
//! - Input and output records of both top decays (`solution`)
//! - The hadronic side: light-quark and b momentum magnitudes from
//!   directions and masses (`hadronic`)
//! - The leptonic side: neutrino and b momenta for every combination of
//!   known quantities, massless or massive b (`leptonic`)
//! - Extremum searches that use the leptonic solvers as an oracle: local
//!   neutrino Pz peaks, the W mass range, the neutrino Pz boundary and the
//!   best neutrino Pz at fixed top pT (`extremum`)
//!
//! ## Usage Examples
//!
//! ```rust
//! use nalgebra::Vector3;
//! use topkin_solvers::context::SolverContext;
//! use topkin_solvers::leptonic::solve_leptonic_side;
//! use topkin_solvers::solution::LeptonicSide;
//!
//! let side = LeptonicSide::new(
//!     10.0,
//!     5.0,
//!     Vector3::new(30.0, 0.0, 40.0),
//!     Vector3::new(0.0, 40.0, 30.0),
//! );
//! let mut ctx = SolverContext::default();
//! let solutions = solve_leptonic_side(&mut ctx, &side, 172.5, 0.0, 80.4 * 80.4).unwrap();
//! for sol in solutions.iter() {
//!     assert!((sol.w_mass() - 80.4).abs() < 1e-6);
//! }
//! ```
//!
//! ## Diagnostics
//!
//! Warnings and iteration traces go to the context's
//! [`DiagnosticsSink`](context::DiagnosticsSink), by default a
//! [`TracingSink`](context::TracingSink) that forwards them to `tracing`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod config;
pub mod context;
pub mod extremum;
pub mod hadronic;
pub mod leptonic;
pub mod solution;
