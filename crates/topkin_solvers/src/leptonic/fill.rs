//! Conversion of raw `(p_b, ν_z)` roots into solution records.

use crate::solution::{LeptonSideSolution, LeptonicSide, PzWindow};
use serde::{Deserialize, Serialize};
use topkin_core::math::sorting::sort_by_key_f64;
use topkin_core::types::{KinematicsError, Solutions};

/// A raw leptonic root: b momentum magnitude and neutrino z momentum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LeptonicCandidate {
    /// b momentum magnitude.
    pub pb: f64,
    /// Neutrino z momentum.
    pub nuz: f64,
    /// Iteration cap reached while finding this root.
    pub fail: bool,
}

impl LeptonicCandidate {
    /// A converged candidate.
    pub fn new(pb: f64, nuz: f64) -> Self {
        Self {
            pb,
            nuz,
            fail: false,
        }
    }
}

/// Build full solution records from raw roots.
///
/// The b momentum points along `side.b`; the W transverse momentum is the
/// top transverse momentum minus the b one. When `mwsq` is `None` the W
/// mass of each record is computed from the lepton and neutrino. Records
/// whose top z momentum falls outside `window` are dropped, and when more
/// than one remains they are stably sorted by increasing `mW²`.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero b momentum or a candidate
/// with non-positive `pb`.
pub fn fill_leptonic_solutions(
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: Option<f64>,
    candidates: &[LeptonicCandidate],
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    const CONTEXT: &str = "fill_leptonic_solutions";
    let (cb, _) = side.b_direction(CONTEXT)?;
    let ee = side.lepton.norm();

    let mut solutions = Solutions::new();
    for candidate in candidates {
        KinematicsError::ensure(
            candidate.pb > 0.0,
            CONTEXT,
            "b momentum of a candidate must be positive",
        )?;
        let b = cb * candidate.pb;
        let pwx = side.top_px - b.x;
        let pwy = side.top_py - b.y;
        let pwz = side.lepton.z + candidate.nuz;
        let tlepz = b.z + pwz;
        if !window.contains(tlepz) {
            continue;
        }

        let nu = nalgebra::Vector3::new(pwx - side.lepton.x, pwy - side.lepton.y, candidate.nuz);
        let mwsq = mwsq.unwrap_or_else(|| {
            let ew = ee + nu.norm();
            ew * ew - (pwx * pwx + pwy * pwy + pwz * pwz)
        });

        solutions.push(LeptonSideSolution {
            pblep: candidate.pb,
            b,
            mb,
            nu,
            mwsq,
            tlepz,
            mt,
            fail: candidate.fail,
        });
    }

    if solutions.len() > 1 {
        sort_by_key_f64(&mut solutions, |s| s.mwsq);
    }
    Ok(solutions)
}
