//! Leptonic-side solvers for a massive b quark.
//!
//! The equation of [`coefficients`](super::coefficients) is a quartic in
//! `p_b` once the b velocity `β` is fixed. The iterative solvers alternate
//! between solving that quartic and updating `β = p_b/E_b` until the
//! chosen root stops moving. The brute-force solver eliminates `β` and
//! solves a degree-8 polynomial instead.

use super::coefficients::{BetaCoefficients, LeptonicSetup};
use super::fill::{fill_leptonic_solutions, LeptonicCandidate};
use crate::config::Verbosity;
use crate::context::{DiagnosticLevel, SolverContext, WarningKind};
use crate::solution::{LeptonSideSolution, LeptonicSide, PzWindow};
use topkin_core::math::distance::pb_distance;
use topkin_core::math::polynomial::{positive_quartic_roots, real_polynomial_roots};
use topkin_core::math::sorting::sort_by_key_f64;
use topkin_core::types::{KinematicsError, Solutions};

/// Reference b momentum used to rank brute-force roots when the measured
/// b is an extra-jet placeholder.
const EXTRA_JET_REFERENCE_PB: f64 = 70.0;

/// Relative difference below which a solution matches the measured b.
const MATCH_TOLERANCE: f64 = 1.0e-3;

/// Largest relative miss of the rebuilt `mW²` or `mt²` for which a
/// fixed-point result is still reported.
const MAX_MASS_RESIDUAL: f64 = 1.0e-3;

/// Relative distance below which the two passes found the same root.
const SAME_ROOT_TOLERANCE: f64 = 1.0e-6;

/// Solve the massive-b equation once, at a fixed b velocity.
///
/// Each positive root `p_b` of the quartic at `beta` is kept when the top
/// z momentum computed with the root's own velocity lies in `window`.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for invalid momenta or masses,
/// `(mt − mb)² ≤ mwsq`, or `beta` outside `(0, 1]`.
pub fn solve_leptonic_by_mw_approx(
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    beta: f64,
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    const SOURCE: &str = "solve_leptonic_by_mw_approx";
    let setup = LeptonicSetup::new(side, mt, mb, mwsq, SOURCE)?;
    setup.ensure_reachable(SOURCE)?;
    KinematicsError::ensure(beta > 0.0 && beta <= 1.0, SOURCE, "beta must be in (0, 1]")?;

    let [d4, d3, d2, d1, d0] = BetaCoefficients::new(&setup).quartic_at(beta);
    let mut candidates = Vec::with_capacity(4);
    for &pb in positive_quartic_roots(d4, d3, d2, d1, d0)?.iter() {
        if let Some(nuz) = setup.windowed_neutrino_pz(pb, setup.beta(pb), window)? {
            candidates.push(LeptonicCandidate::new(pb, nuz));
        }
    }
    fill_leptonic_solutions(side, mt, mb, Some(mwsq), &candidates, window)
}

// =============================================================================
// Fixed-point iteration
// =============================================================================

/// Buffered iteration trace of the verbose solver.
#[derive(Debug, Default)]
struct IterationTrace {
    enabled: bool,
    lines: Vec<String>,
}

impl IterationTrace {
    fn record<F: FnOnce() -> String>(&mut self, line: F) {
        if self.enabled {
            self.lines.push(line());
        }
    }
}

/// Outcome of both passes of the fixed-point iteration.
#[derive(Debug, Clone, Copy, Default)]
struct BetaIteration {
    /// Chosen root of each pass, zero when the pass found nothing.
    pb: [f64; 2],
    fail: [bool; 2],
    /// Pass and iteration at which roots disappeared mid-iteration.
    lost_solutions: Option<(usize, usize)>,
    /// Largest number of quartic roots seen in any iteration.
    max_roots: usize,
}

fn pass_name(pass: usize) -> &'static str {
    if pass == 0 {
        "down"
    } else {
        "up"
    }
}

/// Run the two passes: the first follows the lowest root, the second the
/// highest. The second pass only runs if some iteration produced two
/// roots. Starting velocities whose quartic had no roots at the first
/// step are skipped on the second pass.
fn iterate_beta(
    ctx: &mut SolverContext,
    source: &'static str,
    setup: &LeptonicSetup,
    coeffs: &BetaCoefficients,
    call: u64,
    trace: &mut IterationTrace,
) -> Result<BetaIteration, KinematicsError> {
    let start_betas = ctx.settings().start_betas.clone();
    let max_iterations = ctx.settings().max_iterations;
    let tolerance = ctx.settings().leptonic_tolerance;
    let mb = setup.mb;

    ctx.reset_fast_break(start_betas.len());
    let mut out = BetaIteration::default();
    let mut max_kept = 1;

    let mut pass = 0;
    while pass < 2 && pass < max_kept {
        for (istart, &start) in start_betas.iter().enumerate() {
            if out.pb[pass] != 0.0 {
                break;
            }
            if ctx.is_fast_break(istart) {
                continue;
            }

            let mut beta = start;
            let mut relative_shift = 1.0_f64;
            let mut last_pick = 0.0;
            let mut niter = 0;
            while niter < max_iterations {
                let [d4, d3, d2, d1, d0] = coeffs.quartic_at(beta);
                let mut roots = positive_quartic_roots(d4, d3, d2, d1, d0)?.to_vec();
                let found = roots.len();
                out.max_roots = out.max_roots.max(found);
                trace.record(|| {
                    let values: Vec<String> = roots.iter().map(|p| format!(" {p}")).collect();
                    format!(
                        "Iter {} {niter}: beta {beta}, {found} sols{}",
                        pass_name(pass),
                        values.concat()
                    )
                });

                if roots.is_empty() {
                    if niter == 0 {
                        ctx.set_fast_break(istart);
                    } else {
                        out.lost_solutions = Some((pass, niter));
                        ctx.warn_limited(WarningKind::MassiveBNoSolution, source, || {
                            format!(
                                "call {call}: no solutions after {niter} iteration(s), start {istart}"
                            )
                        });
                    }
                    out.pb[pass] = 0.0;
                    break;
                }

                if roots.len() > 2 {
                    // Keep the two roots closest to the momentum implied by
                    // the assumed velocity, or the two highest at beta = 1
                    let mut keyed = Vec::with_capacity(roots.len());
                    for &p in &roots {
                        let key = if beta < 1.0 {
                            pb_distance(p, mb * beta / (1.0 - beta * beta).sqrt())?
                        } else {
                            -p
                        };
                        keyed.push((p, key));
                    }
                    sort_by_key_f64(&mut keyed, |k| k.1);
                    roots = keyed.into_iter().take(2).map(|k| k.0).collect();
                }
                max_kept = max_kept.max(roots.len());
                sort_by_key_f64(&mut roots, |p| *p);

                let pick = if pass == 0 {
                    roots[0]
                } else {
                    roots[roots.len() - 1]
                };
                relative_shift = 2.0 * (pick - out.pb[pass]) / (pick + out.pb[pass]);
                out.pb[pass] = pick;
                let reversed = niter > 0
                    && ((pass == 0 && pick > last_pick) || (pass == 1 && pick < last_pick));
                trace.record(|| {
                    format!("  pick {pick}{}", if reversed { " -OPP-" } else { "" })
                });
                last_pick = pick;

                if relative_shift.abs() < tolerance {
                    if found > 2 {
                        ctx.warn_limited(WarningKind::MassiveBManySolutions, source, || {
                            format!("call {call}: breaking out with {found} solutions")
                        });
                    }
                    trace.record(|| {
                        format!("Iter {} {niter} converged to {pick}", pass_name(pass))
                    });
                    break;
                }

                beta = pick / pick.hypot(mb);
                niter += 1;
            }

            if max_iterations > 1 && niter == max_iterations {
                out.fail[pass] = true;
                ctx.warn_limited(WarningKind::MassiveBIterationLimit, source, || {
                    format!(
                        "call {call}: iteration limit exceeded, relative solution precision is {:e}, requested {tolerance:e}",
                        relative_shift.abs()
                    )
                });
            }
        }
        pass += 1;
    }
    Ok(out)
}

/// Candidates of both passes whose top z momentum lies in `window`.
///
/// A pass that stopped on a point missing the W or top mass by more than
/// [`MAX_MASS_RESIDUAL`] (an unconverged oscillation, or a root of the
/// quartic at a velocity that is not its own) is dropped with a warning.
/// When both passes end on the same root it is reported once.
fn windowed_candidates(
    ctx: &mut SolverContext,
    source: &'static str,
    call: u64,
    setup: &LeptonicSetup,
    iteration: &BetaIteration,
    window: &PzWindow,
) -> Result<Vec<LeptonicCandidate>, KinematicsError> {
    let mut candidates = Vec::with_capacity(2);
    for (&pb, &fail) in iteration.pb.iter().zip(iteration.fail.iter()) {
        if pb <= 0.0 {
            continue;
        }
        let Some(nuz) = setup.windowed_neutrino_pz(pb, setup.beta(pb), window)? else {
            continue;
        };
        let (w_miss, t_miss) = setup.mass_residuals(pb, nuz);
        if !(w_miss <= MAX_MASS_RESIDUAL && t_miss <= MAX_MASS_RESIDUAL) {
            ctx.warn_limited(WarningKind::MassiveBOffShell, source, || {
                format!(
                    "call {call}: dropping p_b = {pb} with relative mass misses {w_miss:e} (W), {t_miss:e} (top)"
                )
            });
            continue;
        }
        if candidates
            .iter()
            .any(|c: &LeptonicCandidate| (c.pb - pb).abs() <= SAME_ROOT_TOLERANCE * pb)
        {
            continue;
        }
        candidates.push(LeptonicCandidate { pb, nuz, fail });
    }
    Ok(candidates)
}

fn massive_setup(
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    source: &str,
) -> Result<LeptonicSetup, KinematicsError> {
    let setup = LeptonicSetup::new(side, mt, mb, mwsq, source)?;
    KinematicsError::ensure(mb > 0.0, source, "b mass must be positive")?;
    setup.ensure_reachable(source)?;
    Ok(setup)
}

/// Solve the leptonic side for a massive b quark by fixed-point iteration
/// on the b velocity.
///
/// Starting velocities come from the context settings. Up to two
/// solutions are found, the low and the high `p_b` branch. A solution
/// whose iteration hit the cap is returned with `fail` set, provided it
/// still reproduces `mW²` and `mt²` to 1e-3; points further off are
/// dropped.
/// Solutions are restricted to `window` and sorted by `mW²`.
///
/// Following two branches means a third root between them is not found.
/// Close to `mt − mb` an event can have three roots;
/// [`solve_leptonic_side_massive_b_brute`] returns all of them.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for invalid momenta, non-positive
/// masses or `(mt − mb)² ≤ mwsq`.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_solvers::context::SolverContext;
/// use topkin_solvers::leptonic::solve_leptonic_side_massive_b;
/// use topkin_solvers::solution::{LeptonicSide, PzWindow};
///
/// let side = LeptonicSide::new(
///     10.0,
///     5.0,
///     Vector3::new(30.0, 0.0, 40.0),
///     Vector3::new(0.0, 40.0, 30.0),
/// );
/// let mut ctx = SolverContext::default();
/// let sols =
///     solve_leptonic_side_massive_b(&mut ctx, &side, 172.5, 4.8, 80.4 * 80.4, &PzWindow::default())
///         .unwrap();
/// assert_eq!(sols.len(), 2);
/// assert!(sols.iter().all(|s| !s.fail && s.mb == 4.8));
/// ```
pub fn solve_leptonic_side_massive_b(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    const SOURCE: &str = "solve_leptonic_side_massive_b";
    let setup = massive_setup(side, mt, mb, mwsq, SOURCE)?;
    ctx.counters_mut().massive_b += 1;
    let call = ctx.call_counts().massive_b;

    let coeffs = BetaCoefficients::new(&setup);
    let mut trace = IterationTrace::default();
    let iteration = iterate_beta(ctx, SOURCE, &setup, &coeffs, call, &mut trace)?;
    let candidates = windowed_candidates(ctx, SOURCE, call, &setup, &iteration, window)?;
    fill_leptonic_solutions(side, mt, mb, Some(mwsq), &candidates, window)
}

/// Same as [`solve_leptonic_side_massive_b`], with an iteration report.
///
/// The trace of every iteration is buffered. It is written out at
/// [`Verbosity::Detailed`](crate::config::Verbosity::Detailed), and at any
/// non-silent verbosity when none of the returned solutions reproduces
/// the measured b momentum to 0.1%; a summary line follows in that case.
///
/// # Errors
///
/// Same as [`solve_leptonic_side_massive_b`].
pub fn solve_leptonic_side_massive_b_verbose(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    const SOURCE: &str = "solve_leptonic_side_massive_b_verbose";
    let setup = massive_setup(side, mt, mb, mwsq, SOURCE)?;
    ctx.counters_mut().massive_b_verbose += 1;
    let call = ctx.call_counts().massive_b_verbose;

    let first_beta = ctx.settings().start_betas.first().copied().unwrap_or(1.0);
    let mut trace = IterationTrace {
        enabled: true,
        lines: vec![format!("p {} m {mb} beta {first_beta}", setup.bmag)],
    };
    let coeffs = BetaCoefficients::new(&setup);
    let iteration = iterate_beta(ctx, SOURCE, &setup, &coeffs, call, &mut trace)?;
    let candidates = windowed_candidates(ctx, SOURCE, call, &setup, &iteration, window)?;

    let matches = candidates
        .iter()
        .any(|c| (2.0 * (c.pb - setup.bmag) / (c.pb + setup.bmag)).abs() < MATCH_TOLERANCE);
    let detailed = ctx.enabled(Verbosity::Detailed);
    let report = !matches && ctx.enabled(Verbosity::Basic);
    if detailed || report {
        for line in trace.lines {
            ctx.emit(DiagnosticLevel::Detail, SOURCE, None, line);
        }
    }
    if report {
        let lost = iteration
            .lost_solutions
            .map_or(0, |(pass, niter)| (pass + 1) * 10_000 + niter);
        let message = format!(
            "call {call}: nsols = {}, nbr = {lost}, max_sols = {}, failflags = {} {}, beta = {}",
            candidates.len(),
            iteration.max_roots,
            u8::from(candidates.first().is_some_and(|c| c.fail)),
            u8::from(candidates.get(1).is_some_and(|c| c.fail)),
            setup.bmag / setup.bmag.hypot(mb),
        );
        ctx.emit(DiagnosticLevel::Warning, SOURCE, None, message);
    }

    fill_leptonic_solutions(side, mt, mb, Some(mwsq), &candidates, window)
}

/// Solve the leptonic side for a massive b quark through the degree-8
/// polynomial obtained by eliminating the b velocity.
///
/// The polynomial coefficients are accumulated in double-double precision.
/// Roots introduced by the elimination are rejected by a sign test on the
/// unsquared equation. If more than four roots survive the `window` cut,
/// the four closest to the measured b magnitude are kept (closest to
/// 70 when the measured b is an extra-jet placeholder).
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for invalid momenta, non-positive
/// masses or `(mt − mb)² ≤ mwsq`;
/// [`KinematicsError::DegeneratePolynomial`] when the polynomial vanishes.
pub fn solve_leptonic_side_massive_b_brute(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    const SOURCE: &str = "solve_leptonic_side_massive_b_brute";
    let setup = massive_setup(side, mt, mb, mwsq, SOURCE)?;
    ctx.counters_mut().massive_b_brute += 1;

    let coeffs = BetaCoefficients::new(&setup);
    let poly = coeffs.eliminated_polynomial();
    if poly[0] == 0.0 {
        return Err(KinematicsError::DegeneratePolynomial { degree: 8 });
    }

    let mut candidates = Vec::new();
    for pb in real_polynomial_roots(&poly)? {
        if pb > 0.0 && coeffs.solves_unsquared(pb) {
            if let Some(nuz) = setup.windowed_neutrino_pz(pb, setup.beta(pb), window)? {
                candidates.push(LeptonicCandidate::new(pb, nuz));
            }
        }
    }

    if candidates.len() > 4 {
        let reference = if setup.b_is_extra_jet() {
            EXTRA_JET_REFERENCE_PB
        } else {
            setup.bmag
        };
        let mut keyed = Vec::with_capacity(candidates.len());
        for c in &candidates {
            keyed.push((*c, pb_distance(c.pb, reference)?));
        }
        sort_by_key_f64(&mut keyed, |k| k.1);
        let found = keyed.len();
        candidates = keyed.into_iter().take(4).map(|k| k.0).collect();
        ctx.warn(SOURCE, || format!("{found} solutions"));
    }

    fill_leptonic_solutions(side, mt, mb, Some(mwsq), &candidates, window)
}

/// Solver used by sampling drivers: the single-shot quartic at `β = 1` for
/// a massless b, the brute-force polynomial otherwise.
///
/// # Errors
///
/// Same as the selected solver.
pub fn solve_leptonic_mc(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    mwsq: f64,
    window: &PzWindow,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    if mb == 0.0 {
        solve_leptonic_by_mw_approx(side, mt, mb, mwsq, 1.0, window)
    } else {
        solve_leptonic_side_massive_b_brute(ctx, side, mt, mb, mwsq, window)
    }
}
