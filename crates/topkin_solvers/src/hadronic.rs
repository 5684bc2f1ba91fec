//! Hadronic-side solver.
//!
//! The hadronic top decays to a b quark and a W that decays to a light
//! quark pair. Jet directions are well measured while their energies are
//! not, so the solver keeps the three directions and finds the momentum
//! magnitudes that reproduce the W and top masses. The split of the W
//! momentum between the two light quarks is a free parameter: the solver
//! takes `param = ln(p_q / p_qbar)` from the caller.
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use topkin_solvers::hadronic::solve_hadronic_w;
//! use topkin_solvers::solution::QuarkJet;
//!
//! let q = QuarkJet::massless(Vector3::new(30.0, 0.0, 0.0));
//! let qbar = QuarkJet::massless(Vector3::new(0.0, 45.0, 0.0));
//! // Perpendicular massless jets with equal momenta: mW² = 2p²
//! let (pq, pqbar) = solve_hadronic_w(&q, &qbar, 80.0 * 80.0, 0.0).unwrap().unwrap();
//! assert!((pq - 80.0 / 2.0_f64.sqrt()).abs() < 1e-9);
//! assert!((pq - pqbar).abs() < 1e-12);
//! ```

use crate::solution::{HadronSideSolution, HadronicSide, QuarkJet};
use topkin_core::math::distance::pb_distance;
use topkin_core::math::quadratic::solve_quadratic;
use topkin_core::types::{KinematicsError, Momentum, Solutions};

fn unit(momentum: &Momentum, context: &str, what: &str) -> Result<(Momentum, f64), KinematicsError> {
    let magnitude = momentum.norm();
    KinematicsError::ensure(
        magnitude > 0.0 && magnitude.is_finite(),
        context,
        what,
    )?;
    Ok((momentum / magnitude, magnitude))
}

/// Solve for the light-quark momentum magnitudes `(p_q, p_qbar)` given the
/// jet directions, their masses and the W mass squared.
///
/// `param` is `ln(p_q / p_qbar)`. For massive quarks the W mass condition
/// is a quadratic in `p_qbar²`; when both roots are admissible the one
/// closer (summed log-distance) to the measured magnitudes is used, and a
/// jet with an extra-jet placeholder magnitude does not vote.
///
/// Returns `None` when no positive solution exists.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero jet momentum, negative
/// masses, `mwsq ≤ (m_q + m_qbar)²`, collinear jets, or two placeholder
/// jets.
pub fn solve_hadronic_w(
    q: &QuarkJet,
    qbar: &QuarkJet,
    mwsq: f64,
    param: f64,
) -> Result<Option<(f64, f64)>, KinematicsError> {
    const CONTEXT: &str = "solve_hadronic_w";
    let (cq, qmag) = unit(&q.momentum, CONTEXT, "quark momentum must be non-zero")?;
    let (cqbar, qbarmag) = unit(&qbar.momentum, CONTEXT, "antiquark momentum must be non-zero")?;
    let (mq, mqbar) = (q.mass, qbar.mass);
    KinematicsError::ensure(mq >= 0.0 && mqbar >= 0.0, CONTEXT, "quark masses must be non-negative")?;
    KinematicsError::ensure(
        mwsq > (mq + mqbar) * (mq + mqbar),
        CONTEXT,
        "W mass must exceed the sum of the quark masses",
    )?;
    let cos_qqbar = cq.dot(&cqbar);
    KinematicsError::ensure(1.0 - cos_qqbar > 0.0, CONTEXT, "quark jets must not be collinear")?;
    let q_is_extra = q.is_extra_jet();
    let qbar_is_extra = qbar.is_extra_jet();
    KinematicsError::ensure(
        !(q_is_extra && qbar_is_extra),
        CONTEXT,
        "at most one light jet may be a placeholder",
    )?;

    let ratio = param.exp();
    if mq == 0.0 && mqbar == 0.0 {
        let product = mwsq / 2.0 / (1.0 - cos_qqbar);
        return Ok(Some(((product * ratio).sqrt(), (product / ratio).sqrt())));
    }

    let half_mdiff = (mwsq - mq * mq - mqbar * mqbar) / 2.0;
    let a = ratio * ratio * (1.0 - cos_qqbar * cos_qqbar);
    let b = mq * mq - 2.0 * cos_qqbar * half_mdiff * ratio + mqbar * mqbar * ratio * ratio;
    let c = mq * mq * mqbar * mqbar - half_mdiff * half_mdiff;

    let good: Vec<f64> = solve_quadratic(b / a, c / a)
        .as_ref()
        .iter()
        .filter(|&&psq| psq > 0.0)
        .map(|psq| psq.sqrt())
        .collect();

    let pqbar = match good.as_slice() {
        [] => return Ok(None),
        [only] => *only,
        [first, second, ..] => {
            let distance = |p: f64| -> Result<f64, KinematicsError> {
                let dq = if q_is_extra { 0.0 } else { pb_distance(p * ratio, qmag)? };
                let dqbar = if qbar_is_extra { 0.0 } else { pb_distance(p, qbarmag)? };
                Ok(dq + dqbar)
            };
            if distance(*first)? < distance(*second)? {
                *first
            } else {
                *second
            }
        }
    };
    Ok(Some((pqbar * ratio, pqbar)))
}

/// Solve the hadronic side: light-quark magnitudes from
/// [`solve_hadronic_w`], then the b magnitude from the top mass.
///
/// With `Δ = (mt² − mW² − m_b²)/2` the b momentum solves
/// `(p_W² + mW² − (ĉ_b·p_W)²)p² − 2Δ(ĉ_b·p_W)p + (p_W² + mW²)m_b² − Δ² = 0`,
/// and a root is admissible when `p > 0` and `Δ + (ĉ_b·p_W)p > 0`. When
/// both roots are admissible only the one closer to the measured b
/// magnitude is returned, unless the b jet is a placeholder.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for the preconditions of
/// [`solve_hadronic_w`], a zero b momentum, a negative b mass, or
/// `(mt − m_b)² ≤ mW²`.
pub fn solve_hadronic_side(
    side: &HadronicSide,
    mt: f64,
    mwsq: f64,
    param: f64,
) -> Result<Solutions<HadronSideSolution, 2>, KinematicsError> {
    const CONTEXT: &str = "solve_hadronic_side";
    let mb = side.b.mass;
    KinematicsError::ensure(mb >= 0.0, CONTEXT, "b mass must be non-negative")?;
    KinematicsError::ensure(
        (mt - mb) * (mt - mb) > mwsq,
        CONTEXT,
        "W mass must be below mt - mb",
    )?;
    let (cb, bmag) = unit(&side.b.momentum, CONTEXT, "b momentum must be non-zero")?;

    let mut solutions = Solutions::new();
    let Some((pq, pqbar)) = solve_hadronic_w(&side.q, &side.qbar, mwsq, param)? else {
        return Ok(solutions);
    };
    let cq = side.q.momentum.normalize();
    let cqbar = side.qbar.momentum.normalize();

    let pw = cq * pq + cqbar * pqbar;
    let pwsq = pw.norm_squared();
    let cb_pw = cb.dot(&pw);
    let delta = (mt * mt - mwsq - mb * mb) / 2.0;
    let a = pwsq + mwsq - cb_pw * cb_pw;
    let b = -2.0 * delta * cb_pw;
    let c = (pwsq + mwsq) * mb * mb - delta * delta;

    let mut good: Vec<f64> = solve_quadratic(b / a, c / a)
        .as_ref()
        .iter()
        .copied()
        .filter(|&p| p > 0.0 && delta + cb_pw * p > 0.0)
        .collect();
    if good.len() == 2 && !side.b.is_extra_jet() {
        let keep = if pb_distance(good[0], bmag)? > pb_distance(good[1], bmag)? {
            good[1]
        } else {
            good[0]
        };
        good = vec![keep];
    }

    for pb in good {
        solutions.push(HadronSideSolution {
            q_p: pq,
            q: cq * pq,
            qbar_p: pqbar,
            qbar: cqbar * pqbar,
            b_p: pb,
            b: cb * pb,
            mq: side.q.mass,
            mqbar: side.qbar.mass,
            mb,
            is_valid: true,
        });
    }
    Ok(solutions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use topkin_core::types::Particle;

    fn event(mq: f64, mb: f64) -> (HadronicSide, f64, f64, f64) {
        let q = Particle::new(Vector3::new(40.0, 10.0, 5.0), mq).unwrap();
        let qbar = Particle::new(Vector3::new(-10.0, 30.0, 20.0), mq).unwrap();
        let b = Particle::new(Vector3::new(20.0, -30.0, 50.0), mb).unwrap();
        let w = q + qbar;
        let top = w + b;
        let side = HadronicSide {
            q: QuarkJet::new(*q.momentum(), mq),
            qbar: QuarkJet::new(*qbar.momentum(), mq),
            b: QuarkJet::new(*b.momentum(), mb),
        };
        let param = (q.p() / qbar.p()).ln();
        (side, top.mass(), w.mass_squared(), param)
    }

    // ========================================
    // W Stage
    // ========================================

    #[test]
    fn test_w_massless_recovers_magnitudes() {
        let (side, _, mwsq, param) = event(0.0, 4.8);
        let (pq, pqbar) = solve_hadronic_w(&side.q, &side.qbar, mwsq, param)
            .unwrap()
            .unwrap();
        assert_relative_eq!(pq, side.q.momentum.norm(), max_relative = 1e-12);
        assert_relative_eq!(pqbar, side.qbar.momentum.norm(), max_relative = 1e-12);
    }

    #[test]
    fn test_w_massive_recovers_magnitudes() {
        let (side, _, mwsq, param) = event(1.5, 4.8);
        let (pq, pqbar) = solve_hadronic_w(&side.q, &side.qbar, mwsq, param)
            .unwrap()
            .unwrap();
        assert_relative_eq!(pq, side.q.momentum.norm(), max_relative = 1e-9);
        assert_relative_eq!(pqbar, side.qbar.momentum.norm(), max_relative = 1e-9);
    }

    #[test]
    fn test_w_preconditions() {
        let q = QuarkJet::massless(Vector3::new(10.0, 0.0, 0.0));
        let parallel = QuarkJet::massless(Vector3::new(25.0, 0.0, 0.0));
        assert!(solve_hadronic_w(&q, &parallel, 6400.0, 0.0).is_err());

        let heavy = QuarkJet::new(Vector3::new(0.0, 1.0, 0.0), 50.0);
        assert!(solve_hadronic_w(&heavy, &heavy, 6400.0, 0.0).is_err());

        let zero = QuarkJet::massless(Vector3::zeros());
        assert!(solve_hadronic_w(&q, &zero, 6400.0, 0.0).is_err());

        let extra_a = QuarkJet::massless(Vector3::new(1.0, 0.0, 0.0));
        let extra_b = QuarkJet::massless(Vector3::new(0.0, 0.0, 1.0));
        assert!(solve_hadronic_w(&extra_a, &extra_b, 6400.0, 0.0).is_err());
    }

    // ========================================
    // Full Side
    // ========================================

    #[test]
    fn test_side_round_trip() {
        for (mq, mb) in [(0.0, 0.0), (0.0, 4.8), (1.5, 4.8)] {
            let (side, mt, mwsq, param) = event(mq, mb);
            let sols = solve_hadronic_side(&side, mt, mwsq, param).unwrap();
            assert_eq!(sols.len(), 1);
            let sol = sols[0];
            assert!(sol.is_valid);
            assert_relative_eq!(sol.b_p, side.b.momentum.norm(), max_relative = 1e-9);
            let top = sol.top_particle().unwrap();
            assert_relative_eq!(top.mass(), mt, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_side_unreachable_top_mass() {
        let (side, _, mwsq, param) = event(0.0, 4.8);
        assert!(solve_hadronic_side(&side, 50.0, mwsq, param).is_err());
    }

    #[test]
    fn test_side_placeholder_b_keeps_both_roots() {
        let (mut side, mt, mwsq, param) = event(0.0, 4.8);
        let full = solve_hadronic_side(&side, mt, mwsq, param).unwrap();
        side.b.momentum = side.b.momentum.normalize();
        let sols = solve_hadronic_side(&side, mt, mwsq, param).unwrap();
        assert!(sols.len() >= full.len());
        assert!(sols
            .iter()
            .any(|s| (s.b_p - full[0].b_p).abs() < 1e-9 * full[0].b_p));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(200))]

            #[test]
            fn test_w_mass_is_reproduced(
                theta in 0.2..3.0_f64,
                param in -1.5..1.5_f64,
                mwsq in 1000.0..10000.0_f64,
            ) {
                let q = QuarkJet::massless(Vector3::new(20.0, 0.0, 0.0));
                let qbar = QuarkJet::massless(Vector3::new(20.0 * theta.cos(), 20.0 * theta.sin(), 0.0));
                let (pq, pqbar) = solve_hadronic_w(&q, &qbar, mwsq, param).unwrap().unwrap();
                let w = Particle::massless(q.momentum.normalize() * pq)
                    + Particle::massless(qbar.momentum.normalize() * pqbar);
                prop_assert!((w.mass_squared() - mwsq).abs() < 1e-8 * mwsq);
                prop_assert!(((pq / pqbar).ln() - param).abs() < 1e-10);
            }
        }
    }
}
