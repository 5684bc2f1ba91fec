//! Leptonic-side solvers with a massless b quark or a known b momentum.

use super::coefficients::{BetaCoefficients, LeptonicSetup};
use super::fill::{fill_leptonic_solutions, LeptonicCandidate};
use crate::context::{SolverContext, WarningKind};
use crate::solution::{LeptonSideSolution, LeptonicSide, PzWindow};
use nalgebra::Vector3;
use topkin_core::math::distance::pb_distance;
use topkin_core::math::polynomial::positive_quartic_roots;
use topkin_core::math::quadratic::solve_quadratic;
use topkin_core::math::sorting::sort_by_key_f64;
use topkin_core::types::{KinematicsError, Solutions};

/// Solve for the b momentum and neutrino z momentum with the W mass known
/// and a massless b quark.
///
/// The b direction is taken from `side.b`. At most two of the quartic
/// roots are kept: when there are more, the two closest to the measured b
/// magnitude. The kept solutions are ordered by increasing neutrino z
/// momentum. A non-zero `mb` is ignored (with a warning).
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for zero lepton or b momenta,
/// non-positive `mt` or `mwsq`, or `mt² ≤ mwsq`.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_solvers::context::SolverContext;
/// use topkin_solvers::leptonic::solve_leptonic_side;
/// use topkin_solvers::solution::LeptonicSide;
///
/// let side = LeptonicSide::new(
///     10.0,
///     5.0,
///     Vector3::new(30.0, 0.0, 40.0),
///     Vector3::new(0.0, 40.0, 30.0),
/// );
/// let mut ctx = SolverContext::default();
/// let sols = solve_leptonic_side(&mut ctx, &side, 172.5, 0.0, 80.4 * 80.4).unwrap();
/// assert_eq!(sols.len(), 2);
/// assert!(sols[0].nu.z < sols[1].nu.z);
/// ```
pub fn solve_leptonic_side(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
) -> Result<Solutions<LeptonSideSolution, 2>, KinematicsError> {
    const SOURCE: &str = "solve_leptonic_side";
    let setup = LeptonicSetup::new(side, mt, 0.0, mwsq, SOURCE)?;
    KinematicsError::ensure(mt * mt > mwsq, SOURCE, "W mass must be below the top mass")?;
    if mb != 0.0 {
        ctx.warn(SOURCE, || "mass of the b quark is ignored".to_string());
    }

    let [d4, d3, d2, d1, d0] = BetaCoefficients::new(&setup).quartic_at(1.0);
    let roots = positive_quartic_roots(d4, d3, d2, d1, d0)?;
    if roots.is_empty() {
        return Ok(Solutions::new());
    }

    let mut kept: Vec<f64> = roots.to_vec();
    if kept.len() > 2 {
        let mut ranked = kept
            .iter()
            .map(|&pb| Ok((pb, pb_distance(pb, setup.bmag)?)))
            .collect::<Result<Vec<_>, KinematicsError>>()?;
        sort_by_key_f64(&mut ranked, |r| r.1);
        ctx.warn_limited(WarningKind::LeptonicManySolutions, SOURCE, || {
            format!("{} solutions found, using just two", ranked.len())
        });
        kept = ranked.into_iter().take(2).map(|r| r.0).collect();
    }

    let mut candidates = kept
        .into_iter()
        .map(|pb| Ok(LeptonicCandidate::new(pb, setup.neutrino_pz(pb, 1.0)?.0)))
        .collect::<Result<Vec<_>, KinematicsError>>()?;
    sort_by_key_f64(&mut candidates, |c| c.nuz);

    let window = PzWindow::default();
    let filled = fill_leptonic_solutions(side, mt, 0.0, Some(mwsq), &candidates, &window)?;
    Ok(filled.resize::<2>())
}

/// Shared kinematics for a known b momentum.
struct KnownB {
    pb: f64,
    b: Vector3<f64>,
    /// Neutrino transverse momentum.
    nux: f64,
    nuy: f64,
    ee: f64,
}

impl KnownB {
    fn new(side: &LeptonicSide, pb: f64, context: &str) -> Result<Self, KinematicsError> {
        let (cb, _) = side.b_direction(context)?;
        KinematicsError::ensure(pb > 0.0, context, "b momentum must be positive")?;
        let b = cb * pb;
        Ok(Self {
            pb,
            b,
            nux: side.top_px - b.x - side.lepton.x,
            nuy: side.top_py - b.y - side.lepton.y,
            ee: side.lepton.norm(),
        })
    }

    fn nut_squared(&self) -> f64 {
        self.nux * self.nux + self.nuy * self.nuy
    }

    fn record(&self, side: &LeptonicSide, mb: f64, nuz: f64) -> LeptonSideSolution {
        let nu = Vector3::new(self.nux, self.nuy, nuz);
        let w = nu + side.lepton;
        let ew = self.ee + nu.norm();
        let top = w + self.b;
        let et = ew + self.pb.hypot(mb);
        LeptonSideSolution {
            pblep: self.pb,
            b: self.b,
            mb,
            nu,
            mwsq: ew * ew - w.norm_squared(),
            tlepz: top.z,
            mt: (et * et - top.norm_squared()).max(0.0).sqrt(),
            fail: false,
        }
    }
}

/// Solve for the neutrino z momentum with the W mass and the b momentum
/// magnitude known. The b quark is massless; the top mass of each
/// solution is derived.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero b direction, negative
/// `mwsq`, non-positive `pb`, or a lepton without transverse momentum.
pub fn solve_leptonic_by_mwsq(
    side: &LeptonicSide,
    mwsq: f64,
    pb: f64,
) -> Result<Solutions<LeptonSideSolution, 2>, KinematicsError> {
    const CONTEXT: &str = "solve_leptonic_by_mwsq";
    KinematicsError::ensure(mwsq >= 0.0, CONTEXT, "W mass squared must be non-negative")?;
    let known = KnownB::new(side, pb, CONTEXT)?;
    let l = &side.lepton;

    let eesq = l.norm_squared();
    let pwx = known.nux + l.x;
    let pwy = known.nuy + l.y;
    let pwtsq = pwx * pwx + pwy * pwy;
    let pnutsq = known.nut_squared();
    let lzsq = l.z * l.z;
    let tmp = lzsq + mwsq - pnutsq + pwtsq;
    let a = 4.0 * (lzsq - eesq);
    let b = 4.0 * l.z * (tmp - eesq);
    let c = eesq * eesq + tmp * tmp - 2.0 * eesq * (tmp + 2.0 * pnutsq);
    KinematicsError::ensure(a != 0.0, CONTEXT, "lepton must have transverse momentum")?;

    let mut solutions = Solutions::new();
    for nuz in solve_quadratic(b / a, c / a).as_ref() {
        // Squaring admits roots with a negative neutrino energy
        if pwtsq + lzsq + 2.0 * l.z * nuz + mwsq - eesq - pnutsq >= 0.0 {
            let mut sol = known.record(side, 0.0, *nuz);
            sol.mwsq = mwsq;
            solutions.push(sol);
        }
    }
    Ok(solutions)
}

/// Solve for the neutrino z momentum with the top mass and the b momentum
/// magnitude known. The W mass of each solution is derived.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero b direction, non-positive
/// `pb` or `mt`, negative `mb`, or when the quadratic degenerates.
pub fn solve_leptonic_by_pb(
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    pb: f64,
) -> Result<Solutions<LeptonSideSolution, 2>, KinematicsError> {
    const CONTEXT: &str = "solve_leptonic_by_pb";
    KinematicsError::ensure(mt > 0.0, CONTEXT, "top mass must be positive")?;
    KinematicsError::ensure(mb >= 0.0, CONTEXT, "b mass must be non-negative")?;
    let known = KnownB::new(side, pb, CONTEXT)?;
    let l = &side.lepton;

    let pebz = l.z + known.b.z;
    let eeb = known.ee + pb.hypot(mb);
    let pnutsq = known.nut_squared();
    let a0 = side.top_px * side.top_px + side.top_py * side.top_py + pebz * pebz + mt * mt
        - eeb * eeb
        - pnutsq;
    let b0 = 2.0 * pebz;
    let c0 = 2.0 * eeb;
    let a = b0 * b0 - c0 * c0;
    KinematicsError::ensure(a != 0.0, CONTEXT, "lepton plus b system is massless")?;

    let mut solutions = Solutions::new();
    for nuz in solve_quadratic(2.0 * a0 * b0 / a, (a0 * a0 - c0 * c0 * pnutsq) / a).as_ref() {
        if a0 + b0 * nuz >= 0.0 {
            let mut sol = known.record(side, mb, *nuz);
            sol.mt = mt;
            solutions.push(sol);
        }
    }
    Ok(solutions)
}

/// Neutrino with the given polar direction cosine and the transverse
/// momentum fixed by `pb`.
fn neutrino_at_angle(
    side: &LeptonicSide,
    mb: f64,
    pb: f64,
    cos_theta: f64,
    context: &str,
) -> Result<LeptonSideSolution, KinematicsError> {
    let known = KnownB::new(side, pb, context)?;
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    KinematicsError::ensure(
        sin_theta > 0.0,
        context,
        "neutrino direction would be along the beam",
    )?;
    let enu = known.nut_squared().sqrt() / sin_theta;
    let sol = known.record(side, mb, enu * cos_theta);
    KinematicsError::ensure(sol.mt > 0.0, context, "top mass would vanish")?;
    Ok(sol)
}

/// Minimum W mass reachable at a fixed b momentum.
///
/// The minimum is attained when the neutrino has the same polar angle as
/// the lepton. The returned record carries the W mass squared in `mwsq`
/// and the corresponding top mass.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for invalid momenta, a lepton along
/// the beam, or a non-physical result.
pub fn min_leptonic_mwsq_by_pb(
    side: &LeptonicSide,
    mb: f64,
    pb: f64,
) -> Result<LeptonSideSolution, KinematicsError> {
    const CONTEXT: &str = "min_leptonic_mwsq_by_pb";
    KinematicsError::ensure(mb >= 0.0, CONTEXT, "b mass must be non-negative")?;
    let ee = side.lepton_p(CONTEXT)?;
    let sol = neutrino_at_angle(side, mb, pb, side.lepton.z / ee, CONTEXT)?;
    KinematicsError::ensure(sol.mwsq > 0.0, CONTEXT, "W mass would vanish")?;
    Ok(sol)
}

/// Minimum top mass reachable at a fixed b momentum.
///
/// The neutrino is aligned in polar angle with the lepton plus b system.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for invalid momenta or when the
/// lepton plus b system moves along the beam.
pub fn min_leptonic_mt_by_pb(
    side: &LeptonicSide,
    mb: f64,
    pb: f64,
) -> Result<LeptonSideSolution, KinematicsError> {
    const CONTEXT: &str = "min_leptonic_mt_by_pb";
    KinematicsError::ensure(mb >= 0.0, CONTEXT, "b mass must be non-negative")?;
    let ee = side.lepton_p(CONTEXT)?;
    let (cb, _) = side.b_direction(CONTEXT)?;
    let pebz = side.lepton.z + pb * cb.z;
    let eeb = ee + pb.hypot(mb);
    neutrino_at_angle(side, mb, pb, pebz / eeb, CONTEXT)
}
