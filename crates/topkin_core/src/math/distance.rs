//! Log-distance between momentum magnitudes.

use crate::types::KinematicsError;

/// Distance `|ln(p_solution / p_reference)|` used to rank candidate
/// solutions against a measured magnitude.
///
/// # Errors
///
/// Returns [`KinematicsError::InvalidInput`] unless both arguments are
/// strictly positive.
///
/// # Examples
///
/// ```
/// use topkin_core::math::distance::pb_distance;
///
/// assert_eq!(pb_distance(40.0, 40.0).unwrap(), 0.0);
/// assert_eq!(pb_distance(20.0, 40.0).unwrap(), pb_distance(40.0, 20.0).unwrap());
/// assert!(pb_distance(-1.0, 40.0).is_err());
/// ```
pub fn pb_distance(p_solution: f64, p_reference: f64) -> Result<f64, KinematicsError> {
    KinematicsError::ensure(
        p_solution > 0.0 && p_reference > 0.0,
        "pb_distance",
        "momentum magnitudes must be positive",
    )?;
    Ok((p_solution / p_reference).ln().abs())
}
