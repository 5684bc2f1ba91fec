//! Core value types.
//!
//! This module provides:
//! - `particle`: On-shell four-vectors built on `nalgebra::Vector3`
//! - `solutions`: Fixed-capacity solution containers returned by every solver
//! - `error`: Structured error types for kinematics and solver operations
//!
//! # Re-exports
//!
//! For convenience, commonly used types are re-exported at this module level:
//! - [`Particle`], [`Momentum`], [`invariant_mass_squared`] from `particle`
//! - [`Solutions`] from `solutions`
//! - [`KinematicsError`], [`SolverError`] from `error`

pub mod error;
pub mod particle;
pub mod solutions;

// Re-export commonly used types at module level
pub use error::{KinematicsError, SolverError};
pub use particle::{invariant_mass_squared, Momentum, Particle};
pub use solutions::Solutions;
