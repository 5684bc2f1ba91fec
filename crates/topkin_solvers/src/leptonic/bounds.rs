//! Kinematic limits on the leptonic side.

use crate::solution::{PzWindow, TopPt};
use topkin_core::math::ellipse::{ellipse_intersection, EllipseCoefficients};
use topkin_core::math::quadratic::solve_quadratic;
use topkin_core::types::{KinematicsError, Momentum, Solutions};

/// Largest lepton transverse momentum allowed for a W with transverse
/// momentum `(wx, wy)` and squared mass `mwsq`, given the lepton direction.
///
/// Returns 0 when no positive transverse momentum is allowed.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] when the lepton has no transverse
/// momentum or `mwsq` is not positive.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_solvers::leptonic::max_lepton_pt;
///
/// // A W at rest in the transverse plane: the lepton takes at most mW/2
/// let pt = max_lepton_pt(0.0, 0.0, 80.0 * 80.0, &Vector3::new(1.0, 0.0, 3.0)).unwrap();
/// assert!((pt - 40.0).abs() < 1e-9);
/// ```
pub fn max_lepton_pt(
    wx: f64,
    wy: f64,
    mwsq: f64,
    lepton: &Momentum,
) -> Result<f64, KinematicsError> {
    const CONTEXT: &str = "max_lepton_pt";
    let lpt = lepton.x.hypot(lepton.y);
    KinematicsError::ensure(lpt > 0.0, CONTEXT, "lepton transverse momentum must be positive")?;
    KinematicsError::ensure(mwsq > 0.0, CONTEXT, "W mass squared must be positive")?;

    let cex = lepton.x / lpt;
    let cey = lepton.y / lpt;
    let a = cey * cey * (mwsq + wx * wx) + cex * cex * (mwsq + wy * wy) - 2.0 * cex * cey * wx * wy;
    let b = -mwsq * (cex * wx + cey * wy);
    let c = -mwsq * mwsq / 4.0;

    let candidates: Vec<f64> = if a.abs() < 1.0e-20 {
        if b == 0.0 {
            return Ok(0.0);
        }
        vec![-c / b]
    } else {
        solve_quadratic(b / a, c / a).as_ref().to_vec()
    };

    let viable = candidates.into_iter().filter(|&pt| {
        let nux = wx - pt * cex;
        let nuy = wy - pt * cey;
        pt > 0.0 && mwsq / 2.0 + pt * cex * nux + pt * cey * nuy > 0.0
    });
    Ok(viable.fold(0.0, f64::max))
}

/// Window of leptonic top z momenta allowed by the collision energy once
/// the hadronic top and the transverse momentum of the top pair are known.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] unless `mthad > 0`, `mtlep > 0` and
/// `ecms > mthad + mtlep`, or when the energy balance is degenerate.
pub fn leptonic_top_z_range(
    ecms: f64,
    ttbar_pt: (f64, f64),
    hadronic_top: &Momentum,
    mthad: f64,
    mtlep: f64,
) -> Result<PzWindow, KinematicsError> {
    const CONTEXT: &str = "leptonic_top_z_range";
    KinematicsError::ensure(mthad > 0.0, CONTEXT, "hadronic top mass must be positive")?;
    KinematicsError::ensure(mtlep > 0.0, CONTEXT, "leptonic top mass must be positive")?;
    KinematicsError::ensure(
        ecms > mthad + mtlep,
        CONTEXT,
        "collision energy must exceed the sum of the top masses",
    )?;

    let ehad = (hadronic_top.norm_squared() + mthad * mthad).sqrt();
    let tlep_px = ttbar_pt.0 - hadronic_top.x;
    let tlep_py = ttbar_pt.1 - hadronic_top.y;
    let mttsq = tlep_px * tlep_px + tlep_py * tlep_py + mtlep * mtlep;

    let mut bounds = [0.0; 2];
    for (bound, sign) in bounds.iter_mut().zip([-1.0, 1.0]) {
        let rest = ecms - ehad + sign * hadronic_top.z;
        let b = 2.0 * sign * rest;
        KinematicsError::ensure(
            b != 0.0,
            CONTEXT,
            "hadronic top carries the whole light-cone momentum",
        )?;
        *bound = (mttsq - rest * rest) / b;
    }
    Ok(PzWindow::new(bounds[0].min(bounds[1]), bounds[0].max(bounds[1])))
}

/// Top transverse momenta for which the leptonic side closes with the
/// given masses and neutrino z momentum.
///
/// The neutrino transverse momentum solves two conics, the W mass
/// constraint and the top mass constraint, and each intersection is kept
/// when both `p_b·p_W + Δ` and `p_l·p_ν + mW²/2` are positive, where
/// `Δ = (mt² − mb² − mW²)/2`.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a negative b mass, non-positive
/// `mwsq`, or a lepton along the x axis; errors of the conic intersection
/// are propagated.
pub fn solve_leptonic_for_top_pt(
    lepton: &Momentum,
    b: &Momentum,
    mt: f64,
    mb: f64,
    mwsq: f64,
    nu_pz: f64,
) -> Result<Solutions<TopPt, 4>, KinematicsError> {
    const CONTEXT: &str = "solve_leptonic_for_top_pt";
    KinematicsError::ensure(mb >= 0.0, CONTEXT, "b mass must be non-negative")?;
    KinematicsError::ensure(mwsq > 0.0, CONTEXT, "W mass squared must be positive")?;

    let mut out = Solutions::new();
    let delta = (mt * mt - mb * mb - mwsq) / 2.0;
    if delta <= 0.0 {
        return Ok(out);
    }

    let (lx, ly, lz) = (lepton.x, lepton.y, lepton.z);
    let (bx, by, bz) = (b.x, b.y, b.z);
    KinematicsError::ensure(
        ly * ly + lz * lz > 0.0,
        CONTEXT,
        "lepton must not point along the x axis",
    )?;
    let ebsq = b.norm_squared() + mb * mb;
    let pwz = lz + nu_pz;

    let w_mass = EllipseCoefficients {
        a00: ly * ly + lz * lz,
        a01: -lx * ly,
        a11: lx * lx + lz * lz,
        b0: -(lx * (mwsq + 2.0 * lz * nu_pz)),
        b1: -(ly * (mwsq + 2.0 * lz * nu_pz)),
        c: (lx * lx + ly * ly) * nu_pz * nu_pz - lz * mwsq * nu_pz - mwsq * mwsq / 4.0,
    };

    let a00 = by * by + bz * bz + mb * mb;
    let a11 = bx * bx + bz * bz + mb * mb;
    let top_mass = EllipseCoefficients {
        a00,
        a01: -bx * by,
        a11,
        b0: -2.0 * (-lx * a00 + bx * (delta + by * ly + bz * pwz)),
        b1: -2.0 * (-ly * a11 + by * (delta + bx * lx + bz * pwz)),
        c: -delta * delta
            + (ebsq - bx * bx) * lx * lx
            + (ebsq - by * by) * ly * ly
            + (ebsq - bz * bz) * lz * lz
            + ebsq * mwsq
            - 2.0 * by * bz * ly * lz
            - 2.0 * by * bz * ly * nu_pz
            - 2.0 * bz * bz * lz * nu_pz
            + 2.0 * ebsq * lz * nu_pz
            + (ebsq - bz * bz) * nu_pz * nu_pz
            - 2.0 * bx * lx * (by * ly + bz * pwz)
            - 2.0 * delta * (bx * lx + by * ly + bz * pwz),
    };

    for point in ellipse_intersection(&w_mass, &top_mass)?.iter() {
        let pwx = lx + point.x;
        let pwy = ly + point.y;
        let pb_pw = bx * pwx + by * pwy + bz * pwz;
        let pl_pnu = lx * point.x + ly * point.y + lz * nu_pz;
        if pb_pw + delta > 0.0 && pl_pnu + mwsq / 2.0 > 0.0 {
            out.push(TopPt {
                px: pwx + bx,
                py: pwy + by,
            });
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SolverContext;
    use crate::leptonic::solve_leptonic_side;
    use crate::solution::LeptonicSide;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    // ========================================
    // max_lepton_pt
    // ========================================

    #[test]
    fn test_max_lepton_pt_is_reachable() {
        // The neutrino that goes with the maximal lepton pT closes the W mass
        let (wx, wy, mwsq) = (25.0, -10.0, 80.4 * 80.4);
        let lepton = Vector3::new(3.0, 4.0, 12.0);
        let pt = max_lepton_pt(wx, wy, mwsq, &lepton).unwrap();
        assert!(pt > 0.0);

        let lpt = lepton.x.hypot(lepton.y);
        let l = lepton * (pt / lpt);
        let nu_t = (wx - l.x, wy - l.y);
        let a = mwsq / 2.0 + l.x * nu_t.0 + l.y * nu_t.1;
        // Largest pT is where the neutrino z solution becomes a double root
        let lp = l.norm();
        let nut_sq = nu_t.0 * nu_t.0 + nu_t.1 * nu_t.1;
        let disc = a * a - (lp * lp - l.z * l.z) * nut_sq;
        assert_relative_eq!(disc / (a * a), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_max_lepton_pt_rejects_longitudinal_lepton() {
        assert!(max_lepton_pt(1.0, 1.0, 6400.0, &Vector3::new(0.0, 0.0, 5.0)).is_err());
    }

    // ========================================
    // leptonic_top_z_range
    // ========================================

    #[test]
    fn test_top_z_range_symmetric_event() {
        let window =
            leptonic_top_z_range(1960.0, (0.0, 0.0), &Vector3::zeros(), 172.5, 172.5).unwrap();
        assert_relative_eq!(window.min, -window.max, epsilon = 1e-9);
        // The leptonic top carries the rest of the energy along z
        let e = 1960.0 - 172.5;
        let pz_max = (e * e - 172.5 * 172.5) / (2.0 * e);
        assert_relative_eq!(window.max, pz_max, max_relative = 1e-12);
    }

    #[test]
    fn test_top_z_range_preconditions() {
        let had = Vector3::zeros();
        assert!(leptonic_top_z_range(300.0, (0.0, 0.0), &had, 172.5, 172.5).is_err());
        assert!(leptonic_top_z_range(1960.0, (0.0, 0.0), &had, 0.0, 172.5).is_err());
    }

    // ========================================
    // solve_leptonic_for_top_pt
    // ========================================

    #[test]
    fn test_top_pt_recovers_solution() {
        let side = LeptonicSide::new(
            10.0,
            5.0,
            Vector3::new(30.0, 0.0, 40.0),
            Vector3::new(0.0, 40.0, 30.0),
        );
        let mut ctx = SolverContext::default();
        let sols = solve_leptonic_side(&mut ctx, &side, 172.5, 0.0, 80.4 * 80.4).unwrap();
        assert!(!sols.is_empty());
        for sol in sols.iter() {
            let tops =
                solve_leptonic_for_top_pt(&side.lepton, &sol.b, 172.5, 0.0, 80.4 * 80.4, sol.nu.z)
                    .unwrap();
            assert!(tops
                .iter()
                .any(|t| (t.px - 10.0).abs() < 1e-5 && (t.py - 5.0).abs() < 1e-5));
        }
    }

    #[test]
    fn test_top_pt_unreachable_mass() {
        let tops = solve_leptonic_for_top_pt(
            &Vector3::new(30.0, 0.0, 40.0),
            &Vector3::new(0.0, 40.0, 30.0),
            80.0,
            4.8,
            80.4 * 80.4,
            0.0,
        )
        .unwrap();
        assert!(tops.is_empty());
    }
}
