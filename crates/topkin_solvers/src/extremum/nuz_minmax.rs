//! Boundary of the neutrino z momenta admitting leptonic solutions.

use crate::context::SolverContext;
use crate::leptonic::solve_leptonic_by_nu_pz;
use crate::solution::{LeptonSideSolution, LeptonicSide};
use topkin_core::math::solvers::{BisectionTolerance, BoundaryBisection};
use topkin_core::types::{KinematicsError, SolverError};

/// Cap on the step doublings and on the bisections.
const MAX_STEPS: usize = 200;

/// Walk from `initial_nuz` in the direction of `initial_step`, doubling
/// the step until [`solve_leptonic_by_nu_pz`] stops finding solutions, then
/// bisect the last step down to the relative `precision`.
///
/// Returns `None` when there are no solutions at `initial_nuz`. Otherwise
/// the solution at the innermost feasible point is returned. When two
/// solutions remain there they are averaged, since they merge at the
/// boundary.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero step or a non-positive
/// precision, [`KinematicsError::Solver`] when either stage hits its cap or
/// more than two solutions survive at the boundary. Errors of
/// [`solve_leptonic_by_nu_pz`] are passed through.
pub fn variable_step_nuz_minmax(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    initial_nuz: f64,
    initial_step: f64,
    precision: f64,
) -> Result<Option<LeptonSideSolution>, KinematicsError> {
    const SOURCE: &str = "variable_step_nuz_minmax";
    KinematicsError::ensure(
        initial_step != 0.0 && initial_step.is_finite(),
        SOURCE,
        "initial step must be non-zero",
    )?;
    KinematicsError::ensure(precision > 0.0, SOURCE, "precision must be positive")?;

    let mut last = solve_leptonic_by_nu_pz(ctx, side, mt, mb, initial_nuz)?;
    if last.is_empty() {
        return Ok(None);
    }

    // Doubling steps until the solutions disappear
    let mut step = initial_step;
    let mut inside = initial_nuz;
    let mut outside = None;
    for _ in 0..MAX_STEPS {
        let next = inside + step;
        step *= 2.0;
        let solutions = solve_leptonic_by_nu_pz(ctx, side, mt, mb, next)?;
        if solutions.is_empty() {
            outside = Some(next);
            break;
        }
        inside = next;
        last = solutions;
    }
    let Some(outside) = outside else {
        return Err(SolverError::MaxIterationsExceeded {
            iterations: MAX_STEPS,
        }
        .into());
    };
    ctx.trace_iteration(SOURCE, || {
        format!("boundary bracketed between {inside} and {outside}")
    });

    let boundary = BoundaryBisection::new(BisectionTolerance::Relative(precision), MAX_STEPS)
        .find_boundary(inside, last, outside, |nuz| {
            let solutions = solve_leptonic_by_nu_pz(ctx, side, mt, mb, nuz)?;
            Ok::<_, KinematicsError>((!solutions.is_empty()).then_some(solutions))
        })?;

    let solution = match boundary.payload.as_slice() {
        [only] => *only,
        [first, second] => {
            let ave_pb = 0.5 * (first.pblep + second.pblep);
            let diff_pb = first.pblep - second.pblep;
            if diff_pb.abs() / (1.0 + ave_pb.abs()) >= 100.0 * precision {
                ctx.warn(SOURCE, || {
                    "pb solutions at the extremum are very different".to_string()
                });
            }
            first.average(second)
        }
        other => {
            return Err(SolverError::NumericalInstability(format!(
                "{} solutions at the neutrino Pz boundary {}",
                other.len(),
                boundary.feasible
            ))
            .into())
        }
    };

    Ok(Some(LeptonSideSolution {
        mt,
        fail: false,
        ..solution
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    const MT: f64 = 172.5;

    fn side() -> LeptonicSide {
        LeptonicSide::new(
            10.0,
            5.0,
            Vector3::new(30.0, 0.0, 40.0),
            Vector3::new(0.0, 40.0, 30.0),
        )
    }

    #[test]
    fn test_upper_boundary() {
        let mut ctx = SolverContext::default();
        let sol = variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 23.07, 50.0, 1e-9)
            .unwrap()
            .unwrap();
        assert_relative_eq!(sol.nu.z, 1427.068_005_295_598_4, max_relative = 1e-4);
        assert!(sol.pblep > 0.0);
        assert!(sol.pblep < 1.0);
        assert_eq!(sol.mt, MT);
        assert!(!sol.fail);
    }

    #[test]
    fn test_lower_boundary() {
        let mut ctx = SolverContext::default();
        let sol = variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 23.07, -10.0, 1e-9)
            .unwrap()
            .unwrap();
        assert_relative_eq!(sol.nu.z, -157.901_338_628_931_74, max_relative = 1e-4);
        assert!(sol.mwsq > 0.0);
        assert!(sol.pblep > 0.0);
    }

    #[test]
    fn test_boundary_is_tight() {
        // Just past the boundary there is nothing left
        let mut ctx = SolverContext::default();
        let sol = variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 23.07, -10.0, 1e-9)
            .unwrap()
            .unwrap();
        let beyond = sol.nu.z - 1e-3 * (1.0 + sol.nu.z.abs());
        assert!(solve_leptonic_by_nu_pz(&mut ctx, &side(), MT, 0.0, beyond)
            .unwrap()
            .is_empty());
        let within = sol.nu.z + 1e-3 * (1.0 + sol.nu.z.abs());
        assert!(!solve_leptonic_by_nu_pz(&mut ctx, &side(), MT, 0.0, within)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_no_solution_at_start() {
        let mut ctx = SolverContext::default();
        let found = variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 5000.0, 10.0, 1e-9).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_rejects_bad_arguments() {
        let mut ctx = SolverContext::default();
        assert!(variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 23.07, 0.0, 1e-9).is_err());
        assert!(variable_step_nuz_minmax(&mut ctx, &side(), MT, 0.0, 23.07, 10.0, 0.0).is_err());
    }
}
