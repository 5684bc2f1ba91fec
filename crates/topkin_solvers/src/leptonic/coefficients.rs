//! Shared setup of the leptonic-side equations.
//!
//! Eliminating the neutrino from the top and W mass constraints leaves one
//! equation in the b momentum magnitude `p` and the b velocity `β`:
//!
//! ```text
//! Σ_i (β²·c_i2 + β·c_i1 + c_i0) · pⁱ = 0,   i = 0..=4
//! ```
//!
//! At fixed `β` this is a quartic in `p`. For a massless b (`β = 1`) it is
//! the exact massless equation. For a massive b, substituting
//! `β = p/√(p² + m_b²)` and squaring gives a degree-8 polynomial.

use crate::solution::{LeptonicSide, PzWindow};
use topkin_core::math::double_double::DoubleDouble;
use topkin_core::types::{KinematicsError, Momentum, SolverError};

/// Normalised leptonic-side inputs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LeptonicSetup {
    pub(crate) side: LeptonicSide,
    pub(crate) pl: f64,
    pub(crate) bmag: f64,
    /// Unit b direction.
    pub(crate) cb: Momentum,
    pub(crate) mt: f64,
    pub(crate) mb: f64,
    pub(crate) mwsq: f64,
    /// `mt² − mb² − mW²`
    pub(crate) mdiffsq: f64,
}

impl LeptonicSetup {
    pub(crate) fn new(
        side: &LeptonicSide,
        mt: f64,
        mb: f64,
        mwsq: f64,
        context: &str,
    ) -> Result<Self, KinematicsError> {
        let pl = side.lepton_p(context)?;
        let (cb, bmag) = side.b_direction(context)?;
        KinematicsError::ensure(mt > 0.0, context, "top mass must be positive")?;
        KinematicsError::ensure(mb >= 0.0, context, "b mass must be non-negative")?;
        KinematicsError::ensure(mwsq > 0.0, context, "W mass squared must be positive")?;
        Ok(Self {
            side: *side,
            pl,
            bmag,
            cb,
            mt,
            mb,
            mwsq,
            mdiffsq: mt * mt - mb * mb - mwsq,
        })
    }

    /// Require `(mt − mb)² > mW²`.
    pub(crate) fn ensure_reachable(&self, context: &str) -> Result<(), KinematicsError> {
        let gap = self.mt - self.mb;
        KinematicsError::ensure(
            gap * gap > self.mwsq,
            context,
            "W mass must be below mt - mb",
        )
    }

    /// `(ν_z, top p_z)` for b momentum `pb` moving with velocity `beta`.
    ///
    /// # Errors
    ///
    /// `SolverError::NumericalInstability` when the b and lepton z
    /// directions make the W z momentum undetermined (`β·ĉ_bz = ĉ_lz`).
    pub(crate) fn neutrino_pz(&self, pb: f64, beta: f64) -> Result<(f64, f64), KinematicsError> {
        let l = &self.side.lepton;
        let cb = &self.cb;
        let denom = beta * cb.z - l.z / self.pl;
        if denom == 0.0 {
            return Err(SolverError::NumericalInstability(
                "W z momentum is undetermined for this b direction".to_string(),
            )
            .into());
        }
        let pwx = self.side.top_px - pb * cb.x;
        let pwy = self.side.top_py - pb * cb.y;
        let pwz = ((l.x * pwx + l.y * pwy + self.mwsq / 2.0) / self.pl
            - beta * (self.mdiffsq / pb / 2.0 + cb.x * pwx + cb.y * pwy))
            / denom;
        Ok((pwz - l.z, pwz + pb * cb.z))
    }

    /// `ν_z` for `pb` when the resulting top p_z lies in `window`.
    pub(crate) fn windowed_neutrino_pz(
        &self,
        pb: f64,
        beta: f64,
        window: &PzWindow,
    ) -> Result<Option<f64>, KinematicsError> {
        let (nuz, top_pz) = self.neutrino_pz(pb, beta)?;
        Ok(window.contains(top_pz).then_some(nuz))
    }

    /// Relative misses `(|ΔmW²|/mW², |Δmt²|/mt²)` of the W and top masses
    /// rebuilt from the b momentum `pb` and the neutrino z momentum `nuz`.
    pub(crate) fn mass_residuals(&self, pb: f64, nuz: f64) -> (f64, f64) {
        let l = self.side.lepton;
        let b = self.cb * pb;
        let nu = Momentum::new(
            self.side.top_px - b.x - l.x,
            self.side.top_py - b.y - l.y,
            nuz,
        );
        let w = l + nu;
        let ew = self.pl + nu.norm();
        let mwsq = ew * ew - w.norm_squared();
        let top = w + b;
        let et = ew + pb.hypot(self.mb);
        let mtsq = et * et - top.norm_squared();
        let target_mtsq = self.mt * self.mt;
        (
            (mwsq - self.mwsq).abs() / self.mwsq,
            (mtsq - target_mtsq).abs() / target_mtsq,
        )
    }

    /// Velocity of a b quark with momentum `pb`.
    #[inline]
    pub(crate) fn beta(&self, pb: f64) -> f64 {
        pb / pb.hypot(self.mb)
    }

    /// True when the b momentum is the unit-magnitude extra-jet sentinel.
    pub(crate) fn b_is_extra_jet(&self) -> bool {
        crate::solution::is_extra_jet_magnitude(self.bmag)
    }
}

/// The non-zero `c_ij` coefficients (power `i` of `p`, power `j` of `β`)
/// accumulated in double-double precision.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BetaCoefficients {
    c4b0: DoubleDouble,
    c4b1: DoubleDouble,
    c4b2: DoubleDouble,
    c3b0: DoubleDouble,
    c3b1: DoubleDouble,
    c3b2: DoubleDouble,
    c2b0: DoubleDouble,
    c2b1: DoubleDouble,
    c2b2: DoubleDouble,
    c1b1: DoubleDouble,
    c1b2: DoubleDouble,
    c0b2: DoubleDouble,
    mbsq: DoubleDouble,
}

impl BetaCoefficients {
    pub(crate) fn new(setup: &LeptonicSetup) -> Self {
        let dd = DoubleDouble::from;
        let l = &setup.side.lepton;
        let b = &setup.side.b;
        let (top_px, top_py) = (setup.side.top_px, setup.side.top_py);
        let (mt, mb, mwsq) = (setup.mt, setup.mb, setup.mwsq);

        let pl = (dd(l.x).square() + dd(l.y).square() + dd(l.z).square()).sqrt();
        let (clx, cly, clz) = (dd(l.x) / pl, dd(l.y) / pl, dd(l.z) / pl);
        let bmag = (dd(b.x).square() + dd(b.y).square() + dd(b.z).square()).sqrt();
        let (cbx, cby, cbz) = (dd(b.x) / bmag, dd(b.y) / bmag, dd(b.z) / bmag);
        let mbsq = DoubleDouble::product(mb, mb);

        let cblt = cbx * clx + cby * cly;
        let sbzsq = cbx.square() + cby.square();
        let top_pbt = cbx * top_px + cby * top_py;
        let top_plt = clx * top_px + cly * top_py;
        let clzsq = clz.square();
        let slzsq = 1.0 - clzsq;
        let mwsq_over_pl = mwsq / pl;
        let t1 = dd(mwsq) + DoubleDouble::product(top_px, top_px)
            + DoubleDouble::product(top_py, top_py);
        let t2 = mwsq_over_pl * 0.5 + top_plt;
        let cbltsq = cblt.square();
        let cbzsq = cbz.square();
        let mdiffsq = DoubleDouble::product(mt, mt) - mbsq - mwsq;
        let t3 = cbz * mwsq_over_pl - 2.0 * clz * top_pbt;
        let cbz_clz = cbz * clz;

        let c4b0 = -4.0 * (cbltsq + clzsq * sbzsq);
        let c4b1 = 8.0 * (cblt + cbz_clz) * sbzsq;
        let c4b2 = 4.0
            * (cbltsq * cbzsq - cbz * (cbz + 2.0 * cblt * clz) * sbzsq
                - sbzsq.square() * slzsq);
        let c3b0 = 8.0 * (cblt * t2 + clzsq * top_pbt);
        let c3b1 = -8.0 * (sbzsq * t2 + (cblt + 2.0 * cbz_clz) * top_pbt);
        let c3b2 = 8.0
            * ((cbz_clz - cbzsq * (cblt + cbz_clz)) * t2
                + (1.0 + cblt * cbz_clz - clzsq * sbzsq) * top_pbt);
        let c2b0 = -mwsq_over_pl.square() - 4.0 * (clzsq * t1 + top_plt * (mwsq_over_pl + top_plt));
        let c2b1 = 4.0 * (mwsq_over_pl * top_pbt - cblt * mdiffsq)
            + 8.0 * (cbz_clz * t1 + top_pbt * top_plt);
        let c2b2 = 4.0 * mdiffsq * (cblt * cbz_clz + sbzsq * slzsq) + t3.square()
            - 4.0 * top_pbt.square()
            + 4.0 * cbzsq * top_plt * (mwsq_over_pl + top_plt)
            - 4.0 * cbz * (cbz * t1 + 2.0 * clz * top_pbt * top_plt);
        let c1b1 = 2.0 * mdiffsq * (mwsq_over_pl + 2.0 * top_plt);
        let c1b2 = 2.0
            * mdiffsq
            * (-(cbz_clz * mwsq_over_pl) - 2.0 * (slzsq * top_pbt + cbz_clz * top_plt));
        let c0b2 = -(mdiffsq.square() * slzsq);

        Self {
            c4b0,
            c4b1,
            c4b2,
            c3b0,
            c3b1,
            c3b2,
            c2b0,
            c2b1,
            c2b2,
            c1b1,
            c1b2,
            c0b2,
            mbsq,
        }
    }

    /// Quartic in `p` at fixed `β`, leading coefficient first.
    pub(crate) fn quartic_at(&self, beta: f64) -> [f64; 5] {
        let betasq = beta * beta;
        let d4 = self.c4b2 * betasq + self.c4b1 * beta + self.c4b0;
        let d3 = self.c3b2 * betasq + self.c3b1 * beta + self.c3b0;
        let d2 = self.c2b2 * betasq + self.c2b1 * beta + self.c2b0;
        let d1 = self.c1b2 * betasq + self.c1b1 * beta;
        let d0 = self.c0b2 * betasq;
        [d4.to_f64(), d3.to_f64(), d2.to_f64(), d1.to_f64(), d0.to_f64()]
    }

    /// Coefficients of the β-free part once `β² = p²/(p² + m_b²)` is
    /// substituted and the equation is multiplied by `(p² + m_b²)/p²`.
    /// The β-odd part then reads `√(p² + m_b²)·Σ c_i1·pⁱ⁻¹`.
    fn even_parts(&self) -> [DoubleDouble; 5] {
        let m = self.mbsq;
        [
            self.c0b2 + self.c2b0 * m,
            self.c1b2 + self.c3b0 * m,
            self.c2b2 + self.c4b0 * m + self.c2b0,
            self.c3b2 + self.c3b0,
            self.c4b2 + self.c4b0,
        ]
    }

    /// Degree-8 polynomial in `p` with `β` eliminated, leading coefficient
    /// first. Its roots contain the massive-b solutions together with the
    /// spurious roots of the squared equation.
    pub(crate) fn eliminated_polynomial(&self) -> [f64; 9] {
        let [c0i0, c1i0, c2i0, c3i0, c4i0] = self.even_parts();
        let (c1b1, c2b1, c3b1, c4b1) = (self.c1b1, self.c2b1, self.c3b1, self.c4b1);
        let mbsq = self.mbsq;

        let p8 = c0i0.square() - c1b1.square() * mbsq;
        let p7 = 2.0 * c0i0 * c1i0 - 2.0 * c1b1 * c2b1 * mbsq;
        let p6 = c1i0.square() - c1b1.square() + 2.0 * c0i0 * c2i0
            - c2b1.square() * mbsq
            - 2.0 * c1b1 * c3b1 * mbsq;
        let p5 = 2.0
            * (c1i0 * c2i0 + c0i0 * c3i0 - c2b1 * c3b1 * mbsq - c1b1 * (c2b1 + c4b1 * mbsq));
        let p4 = c2i0.square() - c2b1.square() - 2.0 * c1b1 * c3b1
            + 2.0 * c1i0 * c3i0
            + 2.0 * c0i0 * c4i0
            - c3b1.square() * mbsq
            - 2.0 * c2b1 * c4b1 * mbsq;
        let p3 = -2.0
            * (c2b1 * c3b1 - c2i0 * c3i0 + c1b1 * c4b1 - c1i0 * c4i0 + c3b1 * c4b1 * mbsq);
        let p2 = c3i0.square() - c3b1.square() - 2.0 * c2b1 * c4b1
            + 2.0 * c2i0 * c4i0
            - c4b1.square() * mbsq;
        let p1 = 2.0 * (c3i0 * c4i0 - c3b1 * c4b1);
        let p0 = (c4i0 - c4b1) * (c4i0 + c4b1);

        [p0, p1, p2, p3, p4, p5, p6, p7, p8].map(DoubleDouble::to_f64)
    }

    /// True when `p` solves the unsquared equation, that is when the
    /// β-even and β-odd parts have opposite signs.
    pub(crate) fn solves_unsquared(&self, pb: f64) -> bool {
        let [c0i0, c1i0, c2i0, c3i0, c4i0] = self.even_parts();
        let even = c0i0 + pb * (c1i0 + pb * (c2i0 + pb * (c3i0 + pb * c4i0)));
        let odd = self.c1b1 + pb * (self.c2b1 + pb * (self.c3b1 + pb * self.c4b1));
        (even * odd).to_f64() < 0.0
    }
}
