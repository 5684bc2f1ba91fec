//! Leptonic side with the neutrino z momentum known.
//!
//! The transverse plane is rotated so that the b direction lies in the
//! y'z half-plane. The neutrino x' momentum then follows from momentum
//! balance alone and the remaining equation is in the b momentum only.

use super::fill::{fill_leptonic_solutions, LeptonicCandidate};
use crate::context::SolverContext;
use crate::solution::{LeptonSideSolution, LeptonicSide, PzWindow, TransverseFrame};
use topkin_core::math::distance::pb_distance;
use topkin_core::math::polynomial::{positive_quartic_roots, real_polynomial_roots};
use topkin_core::math::quadratic::solve_quadratic_general;
use topkin_core::math::sorting::sort_by_key_f64;
use topkin_core::types::{KinematicsError, Solutions};

const SOURCE: &str = "solve_leptonic_by_nu_pz";

/// Kinematics in the rotated frame.
struct RotatedInputs {
    tpx: f64,
    tpy: f64,
    epx: f64,
    epy: f64,
    epz: f64,
    ee: f64,
    cby: f64,
    cbz: f64,
    bmag: f64,
    mtsq: f64,
    nupz: f64,
}

impl RotatedInputs {
    fn new(side: &LeptonicSide, mt: f64, nupz: f64) -> Result<Self, KinematicsError> {
        let ee = side.lepton_p(SOURCE)?;
        let frame = TransverseFrame::along(&side.b, SOURCE)?;
        KinematicsError::ensure(mt > 0.0, SOURCE, "top mass must be positive")?;
        let (tpx, tpy) = frame.to_local(side.top_px, side.top_py);
        let (epx, epy) = frame.to_local(side.lepton.x, side.lepton.y);
        let bmag = side.b.norm();
        Ok(Self {
            tpx,
            tpy,
            epx,
            epy,
            epz: side.lepton.z,
            ee,
            cby: side.b.x.hypot(side.b.y) / bmag,
            cbz: side.b.z / bmag,
            bmag,
            mtsq: mt * mt,
            nupz,
        })
    }

    fn nupx(&self) -> f64 {
        self.tpx - self.epx
    }

    /// b along the beam-transverse plane: the top energy is known and the
    /// equation is at most quadratic.
    fn transverse_b_roots(&self, mb: f64) -> Vec<f64> {
        let tpz = self.epz + self.nupz;
        let top_e = (self.tpx * self.tpx + self.tpy * self.tpy + tpz * tpz + self.mtsq).sqrt();
        let nub_e = top_e - self.ee;
        let nub_py = self.tpy - self.epy;
        let nupxsq = self.nupx() * self.nupx();
        let nupzsq = self.nupz * self.nupz;

        if mb == 0.0 {
            let p = (nub_e * nub_e - nub_py * nub_py - nupxsq - nupzsq) / (nub_e - nub_py) / 2.0;
            return if p > 0.0 && p < nub_e {
                vec![p]
            } else {
                Vec::new()
            };
        }

        let mbsq = mb * mb;
        let tmp = nub_py * nub_py + nupxsq + nupzsq;
        let tmp2 = tmp - nub_e * nub_e;
        let a = 4.0 * (nub_e * nub_e - nub_py * nub_py);
        let b = 4.0 * nub_py * (tmp2 - mbsq);
        let c = 2.0 * mbsq * (tmp + nub_e * nub_e) - mbsq * mbsq - tmp2 * tmp2;
        solve_quadratic_general(a, b, c)
            .as_ref()
            .iter()
            .copied()
            .filter(|&p| p > 0.0 && tmp2 - mbsq - 2.0 * nub_py * p < 0.0)
            .collect()
    }
}

/// Coefficients `c_ij` of `pⁱ·βʲ` in the general-direction equation.
/// Those not stored here vanish.
struct NuPzCoefficients {
    c04: f64,
    c13: f64,
    c14: f64,
    c22: f64,
    c23: f64,
    c24: f64,
    c31: f64,
    c32: f64,
    c33: f64,
    c34: f64,
    c40: f64,
    c42: f64,
    c44: f64,
}

impl NuPzCoefficients {
    #[rustfmt::skip]
    fn new(r: &RotatedInputs) -> Self {
        let (tpx, tpy, epx, epy, epz) = (r.tpx, r.tpy, r.epx, r.epy, r.epz);
        let (ee, cby, cbz, mtsq, nupz) = (r.ee, r.cby, r.cbz, r.mtsq, r.nupz);
        let nupx = r.nupx();
        let nupxsq = nupx * nupx;
        let nupzsq = nupz * nupz;
        let tpxsq = tpx * tpx;
        let tpysq = tpy * tpy;
        let epxsq = epx * epx;
        let epysq = epy * epy;
        let epzsq = epz * epz;
        let cbysq = cby * cby;
        let cbzsq = cbz * cbz;

        let c04 = -epxsq * epxsq + 2.0 * epxsq * mtsq - mtsq * mtsq - nupxsq * nupxsq
            + 2.0 * epxsq * nupxsq + 4.0 * epzsq * nupxsq + 2.0 * mtsq * nupxsq
            + 4.0 * epxsq * epz * nupz - 4.0 * epz * mtsq * nupz + 4.0 * epz * nupxsq * nupz
            + 4.0 * epxsq * nupzsq - tpxsq * tpxsq + 2.0 * epxsq * tpxsq - 2.0 * mtsq * tpxsq
            + 2.0 * nupxsq * tpxsq - 4.0 * epz * nupz * tpxsq
            + 4.0 * epysq * (epzsq + mtsq + 2.0 * epz * nupz + nupzsq + tpxsq)
            - 4.0 * epxsq * epy * tpy - 8.0 * epy * epzsq * tpy - 4.0 * epy * mtsq * tpy
            + 4.0 * epy * nupxsq * tpy - 8.0 * epy * epz * nupz * tpy - 4.0 * epy * tpxsq * tpy
            + 4.0 * epxsq * tpysq + 4.0 * epzsq * tpysq;
        let c13 = 4.0 * ee * (-epxsq + mtsq + nupxsq + 2.0 * epz * nupz + 2.0 * nupzsq + tpxsq
            - 2.0 * epy * tpy + 2.0 * tpysq);
        let c14 = 4.0 * (cbz * (epz + nupz)
            * (epxsq + 2.0 * epysq - mtsq + nupxsq - 2.0 * epz * nupz - tpxsq - 2.0 * epy * tpy)
            + cby * (epy - tpy)
                * (epxsq + 2.0 * epzsq + mtsq - nupxsq + 2.0 * epz * nupz + tpxsq
                    + 2.0 * epy * tpy));
        let c22 = 2.0 * (-3.0 * epxsq - 2.0 * epysq - 2.0 * epzsq + mtsq + nupxsq
            + 2.0 * epz * nupz + 2.0 * nupzsq + tpxsq - 2.0 * epy * tpy + 2.0 * tpysq);
        let c23 = 8.0 * ee * (cbz * (epz + nupz) + cby * (epy - tpy));
        let c24 = 2.0 * (4.0 * cby * cbz * (epz + nupz) * (epy - tpy)
            + cbzsq * (epxsq + 2.0 * epysq - 2.0 * epzsq - mtsq + nupxsq - 6.0 * epz * nupz
                - 2.0 * nupzsq - tpxsq - 2.0 * epy * tpy)
            + cbysq * (epxsq - 2.0 * epysq + 2.0 * epzsq + mtsq - nupxsq + 2.0 * epz * nupz
                + tpxsq + 6.0 * epy * tpy - 2.0 * tpysq));
        let c31 = -4.0 * ee;
        let c32 = 4.0 * (cbz * (epz + nupz) + cby * (epy - tpy));
        let c33 = 4.0 * ee;
        let c34 = 4.0 * (cbysq - cbzsq) * (cbz * (epz + nupz) + cby * (tpy - epy));
        let c44 = -(cbysq - cbzsq) * (cbysq - cbzsq);

        Self { c04, c13, c14, c22, c23, c24, c31, c32, c33, c34, c40: -1.0, c42: 2.0, c44 }
    }

    /// Quartic at `β = 1`, leading coefficient first.
    fn massless_quartic(&self) -> [f64; 5] {
        [
            self.c40 + self.c42 + self.c44,
            self.c31 + self.c32 + self.c33 + self.c34,
            self.c22 + self.c23 + self.c24,
            self.c13 + self.c14,
            self.c04,
        ]
    }

    /// Degree-8 polynomial with `β = p/√(p² + m_b²)` eliminated, leading
    /// coefficient first.
    #[rustfmt::skip]
    fn massive_polynomial(&self, mb: f64) -> [f64; 9] {
        let Self { c04, c13, c14, c22, c23, c24, c31, c32, c34, c40, c42, c44, .. } = *self;
        let mbsq = mb * mb;
        let mbquad = mbsq * mbsq;
        let sqrp8 = c40 + c42 + c44;
        let sum3234 = c32 + c34;
        let tmp1 = c22 + c24 + (2.0 * c40 + c42) * mbsq;

        let p0 = sqrp8 * sqrp8;
        let p1 = 2.0 * sum3234 * sqrp8;
        let p2 = sum3234 * sum3234 + 2.0 * sqrp8 * tmp1;
        let p3 = 2.0 * ((c22 + c24) * sum3234 + c14 * sqrp8
            + (3.0 * c32 * c40 + 2.0 * c34 * c40 + 2.0 * c32 * c42 + c34 * c42 + c32 * c44) * mbsq);
        let p4 = c22 * c22 - c23 * c23 + c24 * c24 + 2.0 * c14 * sum3234 + 2.0 * c04 * sqrp8
            + (2.0 * c32 * c32 + 2.0 * c32 * c34 + 4.0 * c24 * c40 + 2.0 * c24 * c42) * mbsq
            + (6.0 * c40 * c40 + 6.0 * c40 * c42 + c42 * c42 + 2.0 * c40 * c44) * mbquad
            + 2.0 * c22 * (c24 + (3.0 * c40 + 2.0 * c42 + c44) * mbsq);
        let p5 = 2.0 * (c04 * sum3234 - c13 * c23
            + (2.0 * c22 * c32 - c23 * c31 + c24 * c32 + c22 * c34) * mbsq
            + (3.0 * c32 * c40 + c34 * c40 + c32 * c42) * mbquad
            + c14 * tmp1);
        let p6 = c14 * c14 - c13 * c13 + 2.0 * c04 * (c22 + c24)
            + mbsq * (2.0 * c22 * c22 - c23 * c23 + 2.0 * c22 * c24 - 2.0 * c13 * c31
                + 2.0 * c14 * c32 + 4.0 * c04 * c40 + 2.0 * c04 * c42)
            + mbquad * (c32 * c32 - c31 * c31 + 6.0 * c22 * c40 + 2.0 * c24 * c40
                + 2.0 * c22 * c42)
            + mbsq * mbquad * 2.0 * c40 * (2.0 * c40 + c42);
        let p7 = 2.0 * (c04 * (c14 + c32 * mbsq)
            + mbsq * (c14 * (c22 + c40 * mbsq) - c13 * c23
                + mbsq * (c22 * c32 - c23 * c31 + c32 * c40 * mbsq)));
        let p8 = c04 * (c04 + 2.0 * mbsq * (c22 + c40 * mbsq))
            + mbsq * (-c13 * c13 - 2.0 * c13 * c31 * mbsq
                + mbsq * (c22 * c22 + (2.0 * c22 * c40 - c31 * c31) * mbsq + c40 * c40 * mbquad));

        [p0, p1, p2, p3, p4, p5, p6, p7, p8]
    }

    /// Sign test separating the roots of the unsquared massive equation
    /// from those introduced by squaring.
    fn solves_unsquared(&self, p: f64, mbsq: f64) -> bool {
        let ebsq = p * p + mbsq;
        let even = self.c04
            + p * (self.c14 + p * (self.c24 + p * (self.c34 + p * self.c44)))
            + ((self.c22 + p * (self.c32 + self.c42 * p)) + self.c40 * ebsq) * ebsq;
        let odd = self.c13 + self.c23 * p + self.c31 * mbsq;
        even * odd < 0.0
    }
}

/// Solve for the b momentum with the neutrino z momentum known.
///
/// The b quark may be massive. For a massless b a quartic is solved and
/// roots that would need a top energy below the visible energy are
/// rejected; for a massive b a degree-8 polynomial is solved and at most
/// four roots are kept, those closest to the measured b magnitude. A b
/// direction perpendicular to the beam has a closed form.
///
/// The W mass of each solution is computed and the solutions are sorted
/// by it.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for a zero lepton momentum, a b
/// without transverse momentum, non-positive `mt` or negative `mb`.
pub fn solve_leptonic_by_nu_pz(
    ctx: &mut SolverContext,
    side: &LeptonicSide,
    mt: f64,
    mb: f64,
    nu_pz: f64,
) -> Result<Solutions<LeptonSideSolution, 4>, KinematicsError> {
    KinematicsError::ensure(mb >= 0.0, SOURCE, "b mass must be non-negative")?;
    let inputs = RotatedInputs::new(side, mt, nu_pz)?;

    let roots = if inputs.cbz == 0.0 {
        inputs.transverse_b_roots(mb)
    } else if mb == 0.0 {
        massless_roots(&inputs)?
    } else {
        massive_roots(ctx, &inputs, mb)?
    };

    let candidates: Vec<LeptonicCandidate> = roots
        .into_iter()
        .map(|pb| LeptonicCandidate::new(pb, nu_pz))
        .collect();
    fill_leptonic_solutions(side, mt, mb, None, &candidates, &PzWindow::default())
}

fn massless_roots(r: &RotatedInputs) -> Result<Vec<f64>, KinematicsError> {
    let [d4, d3, d2, d1, d0] = NuPzCoefficients::new(r).massless_quartic();
    let roots = positive_quartic_roots(d4, d3, d2, d1, d0)?;

    let nupxsq = r.nupx() * r.nupx();
    let topsq = r.mtsq + r.tpx * r.tpx + r.tpy * r.tpy;
    Ok(roots
        .iter()
        .copied()
        .filter(|&pb| {
            let tpz = r.cbz * pb + r.nupz + r.epz;
            let nupy = r.tpy - r.cby * pb - r.epy;
            let enusq = nupxsq + nupy * nupy + r.nupz * r.nupz;
            topsq + tpz * tpz - pb * pb - r.ee * r.ee - enusq - 2.0 * pb * r.ee > 0.0
        })
        .collect())
}

fn massive_roots(
    ctx: &mut SolverContext,
    r: &RotatedInputs,
    mb: f64,
) -> Result<Vec<f64>, KinematicsError> {
    let coeffs = NuPzCoefficients::new(r);
    let mbsq = mb * mb;
    let mut roots: Vec<f64> = real_polynomial_roots(&coeffs.massive_polynomial(mb))?
        .into_iter()
        .filter(|&p| p > 0.0 && coeffs.solves_unsquared(p, mbsq))
        .collect();

    if roots.len() > 4 {
        let found = roots.len();
        let mut ranked = roots
            .iter()
            .map(|&p| Ok((p, pb_distance(p, r.bmag)?)))
            .collect::<Result<Vec<_>, KinematicsError>>()?;
        sort_by_key_f64(&mut ranked, |x| x.1);
        roots = ranked.into_iter().take(4).map(|x| x.0).collect();
        ctx.warn(SOURCE, || format!("{found} solutions"));
    }
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leptonic::{solve_leptonic_side, solve_leptonic_side_massive_b};
    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use topkin_core::types::Particle;

    const MW: f64 = 80.4;
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
    fn test_massless_round_trip() {
        let s = side();
        let mut ctx = SolverContext::default();
        let reference = solve_leptonic_side(&mut ctx, &s, MT, 0.0, MW * MW).unwrap();
        assert_eq!(reference.len(), 2);
        for r in reference.iter() {
            let sols = solve_leptonic_by_nu_pz(&mut ctx, &s, MT, 0.0, r.nu.z).unwrap();
            assert_eq!(sols.len(), 1);
            assert_relative_eq!(sols[0].pblep, r.pblep, max_relative = 1e-8);
            assert_relative_eq!(sols[0].mwsq, MW * MW, max_relative = 1e-6);
            assert_eq!(sols[0].nu.z, r.nu.z);
        }
    }

    #[test]
    fn test_massive_round_trip() {
        let s = side();
        let mb = 4.8;
        let mut ctx = SolverContext::default();
        let reference =
            solve_leptonic_side_massive_b(&mut ctx, &s, MT, mb, MW * MW, &PzWindow::default())
                .unwrap();
        assert_eq!(reference.len(), 2);
        for r in reference.iter() {
            let sols = solve_leptonic_by_nu_pz(&mut ctx, &s, MT, mb, r.nu.z).unwrap();
            let matched = sols
                .iter()
                .find(|x| (x.pblep - r.pblep).abs() < 1e-6 * r.pblep)
                .expect("reference b momentum is among the roots");
            assert_relative_eq!(matched.mwsq, MW * MW, max_relative = 1e-6);
            let top = Particle::massless(s.lepton) + matched.neutrino() + matched.b_particle();
            assert_relative_eq!(top.mass(), MT, max_relative = 1e-8);
        }
    }

    #[test]
    fn test_sorted_by_w_mass() {
        let s = side();
        let mut ctx = SolverContext::default();
        for nuz in [-150.0, -20.0, 0.0, 50.0, 300.0] {
            let sols = solve_leptonic_by_nu_pz(&mut ctx, &s, MT, 4.8, nuz).unwrap();
            assert!(sols.len() <= 4);
            for pair in sols.windows(2) {
                assert!(pair[0].mwsq <= pair[1].mwsq);
            }
        }
    }

    #[test]
    fn test_transverse_b() {
        // b perpendicular to the beam uses the closed forms
        let s = LeptonicSide::new(
            10.0,
            5.0,
            Vector3::new(30.0, 0.0, 40.0),
            Vector3::new(0.0, 50.0, 0.0),
        );
        let mut ctx = SolverContext::default();
        for mb in [0.0, 4.8] {
            let sols = solve_leptonic_by_nu_pz(&mut ctx, &s, MT, mb, 30.0).unwrap();
            assert!(!sols.is_empty());
            for sol in sols.iter() {
                let top = Particle::massless(s.lepton) + sol.neutrino() + sol.b_particle();
                assert_relative_eq!(top.mass(), MT, max_relative = 1e-9);
                assert_relative_eq!(sol.b.z, 0.0);
            }
        }
    }

    #[test]
    fn test_requires_transverse_b_direction() {
        let mut s = side();
        s.b = Vector3::new(0.0, 0.0, 10.0);
        let mut ctx = SolverContext::default();
        assert!(solve_leptonic_by_nu_pz(&mut ctx, &s, MT, 0.0, 1.0).is_err());
        assert!(solve_leptonic_by_nu_pz(&mut ctx, &side(), MT, -1.0, 1.0).is_err());
    }
}
