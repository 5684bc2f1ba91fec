//! Local extrema of the neutrino z momentum along the top mass constraint.

use crate::context::{SolverContext, WarningKind};
use crate::solution::{LeptonSideSolution, LeptonicSide};
use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};
use topkin_core::math::solvers::NewtonSystemSolver;
use topkin_core::types::{KinematicsError, SolverError};

/// Kind of a stationary point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakKind {
    /// Local minimum of the neutrino z momentum.
    Minimum,
    /// Local maximum of the neutrino z momentum.
    Maximum,
}

/// A stationary point found by [`nuz_local_peak`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocalPeak {
    /// Minimum or maximum.
    pub kind: PeakKind,
    /// Leptonic configuration at the stationary point. The W mass is
    /// whatever the configuration implies.
    pub solution: LeptonSideSolution,
}

/// Quantities of the two Newton equations at one `(p_b, ν_z)` point.
struct PeakEquations {
    /// Top mass constraint.
    mass: f64,
    /// Stationarity: `∂(mass)/∂p_b` up to a positive factor.
    slope: f64,
    jacobian: Matrix2<f64>,
    /// Second-derivative proxy; positive at a minimum.
    curvature: f64,
}

struct PeakSystem {
    top_px: f64,
    top_py: f64,
    lepton: nalgebra::Vector3<f64>,
    cb: nalgebra::Vector3<f64>,
    ee: f64,
    mtsqt: f64,
}

impl PeakSystem {
    fn neutrino_t(&self, pb: f64) -> (f64, f64) {
        (
            self.top_px - pb * self.cb.x - self.lepton.x,
            self.top_py - pb * self.cb.y - self.lepton.y,
        )
    }

    fn equations(&self, pb: f64, nuz: f64) -> PeakEquations {
        let cb = &self.cb;
        let (nux, nuy) = self.neutrino_t(pb);
        let enu = (nux * nux + nuy * nuy + nuz * nuz).sqrt();
        let nub_proj = cb.x * nux + cb.y * nuy;
        let tz = self.lepton.z + pb * cb.z + nuz;
        let et = self.ee + pb + enu;
        let tmp = (et - cb.z * tz - nub_proj) / enu;
        let cbt_sq = cb.x * cb.x + cb.y * cb.y;

        let d1_dpb = 2.0 * et * (1.0 - nub_proj / enu) - 2.0 * cb.z * tz;
        let d1_dnuz = 2.0 * nuz * et / enu - 2.0 * tz;
        let d2_dpb = cbt_sq * (et + enu) - nub_proj * (tmp + 2.0);
        let d2_dnuz = nuz * (tmp + 1.0) - enu * cb.z;

        let denu_dpb = -nub_proj / enu;
        let d2mass_dpb2 = (d2_dpb - denu_dpb * d1_dpb) / enu;

        PeakEquations {
            mass: et * et - tz * tz - self.mtsqt,
            slope: enu * (et - cb.z * tz) - et * nub_proj,
            jacobian: Matrix2::new(d1_dpb, d1_dnuz, d2_dpb, d2_dnuz),
            curvature: -d2mass_dpb2 / d1_dnuz,
        }
    }
}

/// Find a stationary point of the neutrino z momentum along the curve of
/// fixed top mass in the `(p_b, ν_z)` plane, starting from
/// `(init_pb, init_nuz)`. The b quark is treated as massless.
///
/// Newton iterations run on the top mass equation and the stationarity
/// condition until both relative steps fall below the extremum tolerance.
/// They stop early when the `p_b` step reverses direction while growing
/// more than twice. Returns `None` when the iterations do not converge or
/// end at a non-positive `p_b`.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for zero lepton or b momenta or a
/// non-positive `mt`; [`KinematicsError::Solver`] when the point found has
/// no defined curvature or a non-physical W mass.
pub fn nuz_local_peak(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    init_pb: f64,
    init_nuz: f64,
) -> Result<Option<LocalPeak>, KinematicsError> {
    const SOURCE: &str = "nuz_local_peak";
    let (cb, _) = side.b_direction(SOURCE)?;
    let ee = side.lepton_p(SOURCE)?;
    KinematicsError::ensure(mt > 0.0, SOURCE, "top mass must be positive")?;
    if mb != 0.0 {
        ctx.warn(SOURCE, || "mass of the b quark is ignored".to_string());
    }

    let system = PeakSystem {
        top_px: side.top_px,
        top_py: side.top_py,
        lepton: side.lepton,
        cb,
        ee,
        mtsqt: mt * mt + side.top_px * side.top_px + side.top_py * side.top_py,
    };

    let config = ctx.settings().extremum_config();
    let outcome = NewtonSystemSolver::<2>::new(config)
        .with_oscillation_guard()
        .solve(Vector2::new(init_pb, init_nuz), |x| {
            ctx.trace_iteration(SOURCE, || format!("pb = {}, nuPz = {}", x[0], x[1]));
            let eq = system.equations(x[0], x[1]);
            (Vector2::new(eq.mass, eq.slope), eq.jacobian)
        });

    if !outcome.converged() {
        let precision = outcome.relative_step();
        ctx.warn_limited(WarningKind::NuzPeakNoConvergence, SOURCE, || {
            format!(
                "iterations failed to converge ({:?}), relative solution precisions are {:e} and {:e}, requested {:e}",
                outcome.status, precision[0], precision[1], config.tolerance
            )
        });
        return Ok(None);
    }

    let (pb, nuz) = (outcome.point[0], outcome.point[1]);
    if pb <= 0.0 {
        return Ok(None);
    }

    let eq = system.equations(pb, nuz);
    if eq.curvature == 0.0 || !eq.curvature.is_finite() {
        return Err(SolverError::NumericalInstability(
            "curvature of the top mass constraint is undefined at the stationary point".to_string(),
        )
        .into());
    }
    let kind = if eq.curvature > 0.0 {
        PeakKind::Minimum
    } else {
        PeakKind::Maximum
    };

    let (nux, nuy) = system.neutrino_t(pb);
    let wx = nux + side.lepton.x;
    let wy = nuy + side.lepton.y;
    let wz = nuz + side.lepton.z;
    let ew = ee + (nux * nux + nuy * nuy + nuz * nuz).sqrt();
    let mwsq = ew * ew - wx * wx - wy * wy - wz * wz;
    if mwsq <= 0.0 {
        return Err(SolverError::NumericalInstability(format!(
            "W mass squared {mwsq} at the stationary point is not positive"
        ))
        .into());
    }

    Ok(Some(LocalPeak {
        kind,
        solution: LeptonSideSolution {
            pblep: pb,
            b: cb * pb,
            mb: 0.0,
            nu: nalgebra::Vector3::new(nux, nuy, nuz),
            mwsq,
            tlepz: pb * cb.z + wz,
            mt,
            fail: false,
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SolverSettings, Verbosity};
    use crate::context::MemorySink;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use topkin_core::types::Particle;

    const MT: f64 = 172.5;

    /// An event whose top mass curve folds, giving a local minimum and a
    /// local maximum of the neutrino z momentum.
    fn folded_side() -> LeptonicSide {
        LeptonicSide::new(
            185.0,
            11.0,
            Vector3::new(10.0, -12.0, -71.0),
            Vector3::new(59.0, 11.0, -48.0),
        )
    }

    #[test]
    fn test_finds_minimum() {
        let mut ctx = SolverContext::default();
        let peak = nuz_local_peak(&mut ctx, &folded_side(), MT, 0.0, 100.0, 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(peak.kind, PeakKind::Minimum);
        assert_relative_eq!(peak.solution.pblep, 109.210_538_997_904_9, max_relative = 1e-9);
        assert_relative_eq!(peak.solution.nu.z, 26.521_941_258_253_81, max_relative = 1e-9);
        assert_relative_eq!(peak.solution.mwsq, 15_964.695_538_739_6, max_relative = 1e-9);
    }

    #[test]
    fn test_finds_maximum() {
        let mut ctx = SolverContext::default();
        let peak = nuz_local_peak(&mut ctx, &folded_side(), MT, 0.0, 200.0, 0.0)
            .unwrap()
            .unwrap();
        assert_eq!(peak.kind, PeakKind::Maximum);
        assert_relative_eq!(peak.solution.pblep, 153.043_786_981_546_1, max_relative = 1e-9);
        assert_relative_eq!(peak.solution.nu.z, 26.819_187_471_005_13, max_relative = 1e-9);
    }

    #[test]
    fn test_peak_closes_top_mass() {
        let side = folded_side();
        let mut ctx = SolverContext::default();
        let peak = nuz_local_peak(&mut ctx, &side, MT, 0.0, 120.0, 20.0)
            .unwrap()
            .unwrap();
        let sol = peak.solution;
        let w = Particle::massless(side.lepton) + sol.neutrino();
        assert_relative_eq!(w.mass_squared(), sol.mwsq, max_relative = 1e-9);
        let top = w + sol.b_particle();
        assert_relative_eq!(top.mass(), MT, max_relative = 1e-9);
        assert_relative_eq!(top.momentum().x, side.top_px, epsilon = 1e-9);
        assert_relative_eq!(top.momentum().y, side.top_py, epsilon = 1e-9);
        assert_relative_eq!(top.momentum().z, sol.tlepz, epsilon = 1e-9);
    }

    #[test]
    fn test_no_peak_warns() {
        // Along this curve the neutrino z momentum is monotonic
        let side = LeptonicSide::new(
            10.0,
            5.0,
            Vector3::new(30.0, 0.0, 40.0),
            Vector3::new(0.0, 40.0, 30.0),
        );
        let sink = MemorySink::new();
        let settings = SolverSettings::default().with_verbosity(Verbosity::Warnings);
        let mut ctx = SolverContext::new(settings)
            .unwrap()
            .with_sink(Box::new(sink.clone()));
        let peak = nuz_local_peak(&mut ctx, &side, MT, 0.0, 70.0, 230.0).unwrap();
        assert!(peak.is_none());
        assert_eq!(sink.matching("failed to converge").len(), 1);
    }

    #[test]
    fn test_massive_b_warning() {
        let sink = MemorySink::new();
        let settings = SolverSettings::default().with_verbosity(Verbosity::Basic);
        let mut ctx = SolverContext::new(settings)
            .unwrap()
            .with_sink(Box::new(sink.clone()));
        nuz_local_peak(&mut ctx, &folded_side(), MT, 4.8, 100.0, 0.0).unwrap();
        assert_eq!(sink.matching("mass of the b quark is ignored").len(), 1);
    }

    #[test]
    fn test_rejects_zero_b() {
        let mut side = folded_side();
        side.b = Vector3::zeros();
        let mut ctx = SolverContext::default();
        assert!(nuz_local_peak(&mut ctx, &side, MT, 0.0, 100.0, 0.0).is_err());
    }
}
