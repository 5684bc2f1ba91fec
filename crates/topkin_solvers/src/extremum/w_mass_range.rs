//! Range of leptonic W masses compatible with the top mass.
//!
//! The maximum is `(mt − mb)²`. The minimum is where the phase-space
//! Jacobian of the leptonic solution vanishes. It is found by Newton
//! iterations on `(p_b, ν_z, ν_y)` in the frame whose y axis follows the
//! transverse b direction, started from solutions of
//! [`solve_leptonic_side`] at a trial W mass. When Newton does not reach a
//! point below the trial mass, bisection on `mW²` locates the threshold at
//! which [`solve_leptonic_side`] starts to have solutions.

use crate::context::{SolverContext, WarningKind};
use crate::leptonic::solve_leptonic_side;
use crate::solution::{LeptonSideSolution, LeptonicSide, TransverseFrame};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use topkin_core::math::distance::pb_distance;
use topkin_core::math::solvers::{BisectionTolerance, BoundaryBisection, NewtonSystemSolver};
use topkin_core::types::{KinematicsError, Momentum, Solutions};

/// Maximum number of `mW²` halvings in the bisection fallback.
const MAX_BISECTIONS: usize = 200;

/// Relative margin used to check that a trial W mass is not at the edge
/// of the solvable region.
const TRIAL_MARGIN: f64 = 1.01;

/// Result of [`w_mass_range`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WMassRange {
    /// Configuration at the smallest W mass, `None` when no trial W mass
    /// admitted solutions.
    pub min: Option<LeptonSideSolution>,
    /// Largest W mass: only `mwsq = (mt − mb)²` and `mt` are set.
    pub max: LeptonSideSolution,
}

/// Leptonic side expressed in the frame along the transverse b direction.
struct RotatedSide {
    frame: TransverseFrame,
    /// Same measurements, rotated. Its b has no x component.
    local: LeptonicSide,
    ee: f64,
    cby: f64,
    cbz: f64,
    mbsq: f64,
    mtsq: f64,
}

impl RotatedSide {
    fn new(side: &LeptonicSide, mt: f64, mb: f64, context: &str) -> Result<Self, KinematicsError> {
        let frame = TransverseFrame::along(&side.b, context)?;
        let ee = side.lepton_p(context)?;
        let (top_px, top_py) = frame.to_local(side.top_px, side.top_py);
        let (lx, ly) = frame.to_local(side.lepton.x, side.lepton.y);
        let bt = side.b.x.hypot(side.b.y);
        let bmag = bt.hypot(side.b.z);
        Ok(Self {
            frame,
            local: LeptonicSide::new(
                top_px,
                top_py,
                Vector3::new(lx, ly, side.lepton.z),
                Vector3::new(0.0, bt, side.b.z),
            ),
            ee,
            cby: bt / bmag,
            cbz: side.b.z / bmag,
            mbsq: mb * mb,
            mtsq: mt * mt,
        })
    }

    fn nu_px(&self) -> f64 {
        self.local.top_px - self.local.lepton.x
    }

    /// W mass squared at `(ν_z, ν_y)`.
    fn mwsq(&self, nuz: f64, nuy: f64) -> f64 {
        let l = &self.local.lepton;
        let nux = self.nu_px();
        let enu = (nux * nux + nuy * nuy + nuz * nuz).sqrt();
        let (wx, wy, wz) = (self.local.top_px, nuy + l.y, nuz + l.z);
        (self.ee + enu).powi(2) - wx * wx - wy * wy - wz * wz
    }

    /// Residuals and Jacobian of the minimum conditions at `x = (p_b, ν_z, ν_y)`:
    /// vanishing phase-space Jacobian, top mass, and top y momentum.
    fn system(&self, x: &Vector3<f64>) -> (Vector3<f64>, Matrix3<f64>) {
        let (pb, nuz, nuy) = (x[0], x[1], x[2]);
        let (ee, cby, cbz, mbsq) = (self.ee, self.cby, self.cbz, self.mbsq);
        let e_py = self.local.lepton.y;
        let e_pz = self.local.lepton.z;
        let nux = self.nu_px();
        let t_px = self.local.top_px;

        let t_py = nuy + e_py + cby * pb;
        let t_pz = nuz + e_pz + cbz * pb;
        let enu = (nux * nux + nuy * nuy + nuz * nuz).sqrt();
        let eb = (pb * pb + mbsq).sqrt();
        let et = ee + enu + eb;
        let beta = pb / eb;

        let c0 = enu * et * (ee * nuz - e_pz * enu);
        let c1 = enu
            * (cby * (e_pz * nuy - e_py * nuz) * beta
                + beta * beta * (ee * nuz - e_pz * enu)
                + cbz * (-(ee * (cby * nuy + cbz * nuz)) + (cby * e_py + cbz * e_pz) * enu));
        let djac_dpb = c1 + c0 * mbsq / (eb * eb * eb);

        // Shared by the ν_z and ν_y derivatives
        let common = ee * (cbz * nuz * t_pz + cby * (e_py * nuz + nuy * nuz + cbz * nuy * pb))
            + cby * (e_py * nuz - e_pz * nuy) * eb
            - ee * nuz * beta * (ee + eb);

        let d1 = 2.0 * nuz * (cbz * e_pz * t_pz + cby * (e_pz * nuy + e_py * (t_pz - nuz)))
            - (ee * (cby * (e_py + nuy) + cbz * (t_pz + nuz)) + cby * e_py * eb) * enu
            + cbz * e_pz * enu * enu
            + beta
                * (2.0 * ee * nuz * (nuz - e_pz)
                    + (ee * ee - 3.0 * e_pz * nuz) * enu
                    + ee * enu * enu
                    + eb * (ee * enu - 2.0 * e_pz * nuz));
        let djac_dnuz = d1 - nuz * common / enu;

        let e1 = 2.0 * nuy * (cbz * e_pz * t_pz + cby * (e_py * e_pz + e_pz * nuy + cbz * e_py * pb))
            - cby * (ee * (t_pz - e_pz) - e_pz * eb) * enu
            + cby * e_pz * enu * enu
            - nuy * beta * (2.0 * ee * e_pz - 2.0 * ee * nuz + 2.0 * e_pz * eb + 3.0 * e_pz * enu);
        let djac_dnuy = e1 - nuy * common / enu;

        let jacobian_det = enu
            * (beta * (ee * et * nuz - enu * e_pz * et)
                + cbz * (enu * e_pz - ee * nuz) * t_pz
                + cby * (e_pz * et * nuy - e_py * et * nuz + enu * e_py * t_pz - ee * nuy * t_pz));
        let mtsq = et * et - t_px * t_px - t_py * t_py - t_pz * t_pz;

        let residual = Vector3::new(jacobian_det, mtsq - self.mtsq, t_py - self.local.top_py);
        let jacobian = Matrix3::new(
            djac_dpb,
            djac_dnuz,
            djac_dnuy,
            -2.0 * (cby * t_py + cbz * t_pz - beta * et),
            2.0 * (nuz * (ee + eb) / enu - e_pz - cbz * pb),
            2.0 * (nuy * (ee + eb) / enu - e_py - cby * pb),
            cby,
            0.0,
            1.0,
        );
        (residual, jacobian)
    }

    /// Solution record in the lab frame from local quantities.
    fn to_global(&self, side: &LeptonicSide, local: &LeptonSideSolution) -> LeptonSideSolution {
        let cb: Momentum = side.b / side.b.norm();
        let (nux, nuy) = self.frame.to_global(local.nu.x, local.nu.y);
        LeptonSideSolution {
            b: cb * local.pblep,
            nu: Vector3::new(nux, nuy, local.nu.z),
            ..*local
        }
    }
}

/// Solutions of the massless-b leptonic side at `mwsq`, empty for a
/// non-positive `mwsq`.
fn solutions_at(
    ctx: &mut SolverContext,
    rotated: &RotatedSide,
    mt: f64,
    mwsq: f64,
) -> Result<Solutions<LeptonSideSolution, 2>, KinematicsError> {
    if mwsq <= 0.0 {
        return Ok(Solutions::new());
    }
    solve_leptonic_side(ctx, &rotated.local, mt, 0.0, mwsq)
}

/// Outcome of the trial W mass scan.
struct TrialScan {
    /// Largest trial `mW²` without solutions before the feasible run.
    last_infeasible: f64,
    /// First trial of the final run of feasible trials.
    first_feasible: (f64, Solutions<LeptonSideSolution, 2>),
    /// Trial used to start the Newton iterations.
    start: (f64, Solutions<LeptonSideSolution, 2>),
}

fn scan_trials(
    ctx: &mut SolverContext,
    rotated: &RotatedSide,
    mt: f64,
    max_mwsq: f64,
    trial_w_masses: &[f64],
) -> Result<Option<TrialScan>, KinematicsError> {
    let mut last_infeasible = 0.0;
    let mut first_feasible = None;
    let mut start = None;
    let mut consecutive = 0;

    for (index, &mw) in trial_w_masses.iter().enumerate() {
        let mwsq = mw * mw;
        if mwsq * TRIAL_MARGIN >= max_mwsq {
            continue;
        }
        let solutions = solutions_at(ctx, rotated, mt, mwsq)?;
        if solutions.is_empty() {
            consecutive = 0;
            last_infeasible = mwsq;
            first_feasible = None;
            start = None;
            continue;
        }

        consecutive += 1;
        if first_feasible.is_none() {
            first_feasible = Some((mwsq, solutions));
        }
        start = Some((mwsq, solutions));
        if consecutive > 1 {
            break;
        }
        if index + 1 == trial_w_masses.len() {
            // A lone feasible point at the end of the list must survive a
            // slightly higher W mass
            let checked = mwsq * TRIAL_MARGIN;
            let solutions = solutions_at(ctx, rotated, mt, checked)?;
            start = (!solutions.is_empty()).then_some((checked, solutions));
        }
    }

    Ok(match (first_feasible, start) {
        (Some(first_feasible), Some(start)) => Some(TrialScan {
            last_infeasible,
            first_feasible,
            start,
        }),
        _ => None,
    })
}

/// Find the range of leptonic W masses for which the top mass can be
/// reached.
///
/// `trial_w_masses` is a strictly increasing list of non-negative W
/// masses. Trials whose squared mass is within 1% of `(mt − mb)²` are
/// skipped. The scan stops at the second consecutive trial with
/// solutions; the last feasible trial seeds the Newton minimisation.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for an empty, negative or
/// non-increasing trial list, `mt ≤ mb`, a negative `mb`, a zero lepton
/// momentum or a b without transverse momentum;
/// [`KinematicsError::Solver`] when the bisection fallback exceeds its cap.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_solvers::context::SolverContext;
/// use topkin_solvers::extremum::w_mass_range;
/// use topkin_solvers::solution::LeptonicSide;
///
/// let side = LeptonicSide::new(
///     10.0,
///     5.0,
///     Vector3::new(30.0, 0.0, 40.0),
///     Vector3::new(0.0, 40.0, 30.0),
/// );
/// let mut ctx = SolverContext::default();
/// let range = w_mass_range(&mut ctx, &side, 172.5, 0.0, &[40.0, 60.0, 75.0, 80.0]).unwrap();
/// let min = range.min.unwrap();
/// assert!((min.w_mass() - 72.828_941_269).abs() < 1e-6);
/// assert_eq!(range.max.mwsq, 172.5 * 172.5);
/// ```
pub fn w_mass_range(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    trial_w_masses: &[f64],
) -> Result<WMassRange, KinematicsError> {
    const SOURCE: &str = "w_mass_range";
    KinematicsError::ensure(mb >= 0.0, SOURCE, "b mass must be non-negative")?;
    KinematicsError::ensure(mt > mb, SOURCE, "top mass must exceed the b mass")?;
    KinematicsError::ensure(!trial_w_masses.is_empty(), SOURCE, "trial W mass list is empty")?;
    KinematicsError::ensure(trial_w_masses[0] >= 0.0, SOURCE, "trial W masses must be non-negative")?;
    KinematicsError::ensure(
        trial_w_masses.windows(2).all(|w| w[1] > w[0]),
        SOURCE,
        "trial W masses must be strictly increasing",
    )?;
    let rotated = RotatedSide::new(side, mt, mb, SOURCE)?;

    let max_mwsq = (mt - mb) * (mt - mb);
    let max = LeptonSideSolution {
        mwsq: max_mwsq,
        mt,
        ..LeptonSideSolution::default()
    };

    let Some(scan) = scan_trials(ctx, &rotated, mt, max_mwsq, trial_w_masses)? else {
        return Ok(WMassRange { min: None, max });
    };

    // Newton from each starting solution
    let config = ctx.settings().extremum_config();
    let newton = NewtonSystemSolver::<3>::new(config);
    let (start_mwsq, ref starts) = scan.start;
    let mut best: Option<LeptonSideSolution> = None;
    for start in starts.iter() {
        let x0 = Vector3::new(start.pblep, start.nu.z, start.nu.y);
        let outcome = newton.solve(x0, |x| {
            ctx.trace_iteration(SOURCE, || {
                format!("pb = {}, nuPz = {}, nuPy = {}", x[0], x[1], x[2])
            });
            rotated.system(x)
        });
        if !outcome.converged() {
            let precision = outcome.relative_step();
            ctx.warn_limited(WarningKind::WMassIterationLimit, SOURCE, || {
                format!(
                    "iterations stopped ({:?}), relative solution precisions are {:e} {:e} {:e}, requested {:e}",
                    outcome.status, precision[0], precision[1], precision[2], config.tolerance
                )
            });
            continue;
        }

        let (pb, nuz, nuy) = (outcome.point[0], outcome.point[1], outcome.point[2]);
        let mwsq = rotated.mwsq(nuz, nuy);
        if pb > 0.0 && best.map_or(true, |b| mwsq < b.mwsq) {
            let local = LeptonSideSolution {
                pblep: pb,
                b: Vector3::zeros(),
                mb,
                nu: Vector3::new(rotated.nu_px(), nuy, nuz),
                mwsq,
                tlepz: pb * rotated.cbz + nuz + side.lepton.z,
                mt,
                fail: false,
            };
            best = Some(rotated.to_global(side, &local));
        }
    }

    if let Some(min) = best.filter(|b| b.mwsq < start_mwsq) {
        return Ok(WMassRange { min: Some(min), max });
    }

    ctx.warn_limited(WarningKind::WMassNoMinimum, SOURCE, || {
        "iterations did not converge to a true minimum, switching to bisections".to_string()
    });
    let resolution = ctx.settings().w_mass_bisection_resolution;
    let (feasible, payload) = scan.first_feasible;
    let boundary = BoundaryBisection::new(BisectionTolerance::Absolute(resolution), MAX_BISECTIONS)
        .find_boundary(feasible, payload, scan.last_infeasible, |mwsq| {
            let solutions = solutions_at(ctx, &rotated, mt, mwsq)?;
            Ok::<_, KinematicsError>((!solutions.is_empty()).then_some(solutions))
        })?;

    let local = match boundary.payload.as_slice() {
        [only] => *only,
        [first, second, ..] => {
            if 2.0 * (first.pblep - second.pblep).abs() / (first.pblep + second.pblep) < 0.01 {
                first.average(second)
            } else {
                let bmag = side.b.norm();
                if pb_distance(first.pblep, bmag)? < pb_distance(second.pblep, bmag)? {
                    *first
                } else {
                    *second
                }
            }
        }
        [] => {
            return Err(KinematicsError::invalid_input(
                SOURCE,
                "bisection ended without a feasible point",
            ))
        }
    };
    let min = LeptonSideSolution {
        mwsq: boundary.feasible,
        mt,
        mb,
        fail: false,
        ..rotated.to_global(side, &local)
    };
    Ok(WMassRange { min: Some(min), max })
}
