//! Neutrino z momentum closest to the W and top mass peaks.

use crate::solution::LeptonicSide;
use serde::{Deserialize, Serialize};
use topkin_core::math::polynomial::checked_quartic_roots;
use topkin_core::math::sorting::sort_by_key_f64;
use topkin_core::types::{KinematicsError, SolverError};

/// Penalty added to the distance of a candidate whose top energy exceeds
/// the beam energy.
const BEAM_ENERGY_PENALTY: f64 = 1.0e5;

/// Resonance peaks the candidates are compared with.
///
/// The half widths are in mass squared units, as in a Breit-Wigner
/// propagator `1/((m² − M²)² + (MΓ)²)`, so `w_hwhm` is typically `mW·ΓW`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassPeaks {
    /// W pole mass.
    pub mw: f64,
    /// Top pole mass.
    pub mt: f64,
    /// W propagator half width (mass squared units).
    pub w_hwhm: f64,
    /// Top propagator half width (mass squared units).
    pub t_hwhm: f64,
}

/// Result of [`best_leptonic_nuz`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestNuz {
    /// Selected neutrino z momentum.
    pub nuz: f64,
    /// Its distance from the peaks.
    pub distance: f64,
    /// W mass at the selected point.
    pub mw: f64,
    /// Top mass at the selected point.
    pub mt: f64,
    /// Number of stationary points of the distance that were found.
    pub stationary_points: usize,
}

/// Lepton, b and neutrino transverse momenta of one event.
struct Event {
    ee: f64,
    lepton: [f64; 3],
    nu_t: (f64, f64),
    /// Energy and momentum of the lepton + b system.
    eb_e: f64,
    eb_p: [f64; 3],
    mebsq: f64,
}

impl Event {
    /// Distance from the peaks together with the W and top masses.
    fn distance(&self, peaks: &MassPeaks, nuz: f64, ecms: f64) -> (f64, f64, f64) {
        let (nux, nuy) = self.nu_t;
        let [lx, ly, lz] = self.lepton;
        let [px, py, pz] = self.eb_p;
        let enu = (nux * nux + nuy * nuy + nuz * nuz).sqrt();
        let mwsq = 2.0 * (self.ee * enu - lx * nux - ly * nuy - lz * nuz);
        let mtsq = self.mebsq + 2.0 * (self.eb_e * enu - px * nux - py * nuy - pz * nuz);
        let dmw = (mwsq - peaks.mw * peaks.mw) / peaks.w_hwhm;
        let dmt = (mtsq - peaks.mt * peaks.mt) / peaks.t_hwhm;
        let mut distance = dmw.hypot(dmt);
        if enu + self.eb_e > ecms / 2.0 {
            distance += BEAM_ENERGY_PENALTY;
        }
        (distance, mwsq.max(0.0).sqrt(), mtsq.max(0.0).sqrt())
    }
}

/// Choose the neutrino z momentum at which the leptonic W and top masses
/// are closest to their peaks.
///
/// The top transverse momentum and the b momentum are fixed, so the
/// neutrino transverse momentum is known. The distance
/// `hypot((mW² − MW²)/w_hwhm, (mt² − MT²)/t_hwhm)` is a function of `ν_z`
/// alone, and its stationary points are the real roots of a quartic after
/// squaring. Roots introduced by the squaring are dropped. Candidates whose
/// top energy `E_ν + E_l + E_b` exceeds `ecms/2` get a large distance
/// penalty. `nu_pz_ref` is always a candidate, so a stationary point beyond
/// the available energy loses to it.
///
/// # Errors
///
/// [`KinematicsError::InvalidInput`] for non-positive widths, a negative
/// `mb` or a zero lepton momentum; [`KinematicsError::DegeneratePolynomial`]
/// when the quartic degenerates; [`KinematicsError::Solver`] when no
/// stationary point survives.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_solvers::extremum::{best_leptonic_nuz, MassPeaks};
/// use topkin_solvers::solution::LeptonicSide;
///
/// let side = LeptonicSide::new(
///     10.0,
///     5.0,
///     Vector3::new(30.0, 0.0, 40.0),
///     Vector3::new(0.0, 40.0, 30.0),
/// );
/// let peaks = MassPeaks { mw: 80.4, mt: 172.5, w_hwhm: 167.6, t_hwhm: 258.8 };
/// let best = best_leptonic_nuz(&side, 0.0, &peaks, 0.0, 1960.0).unwrap();
/// assert!(best.distance < 20.0);
/// ```
pub fn best_leptonic_nuz(
    side: &LeptonicSide,
    mb: f64,
    peaks: &MassPeaks,
    nu_pz_ref: f64,
    ecms: f64,
) -> Result<BestNuz, KinematicsError> {
    const SOURCE: &str = "best_leptonic_nuz";
    KinematicsError::ensure(
        peaks.w_hwhm > 0.0 && peaks.t_hwhm > 0.0,
        SOURCE,
        "propagator widths must be positive",
    )?;
    KinematicsError::ensure(mb >= 0.0, SOURCE, "b mass must be non-negative")?;
    let ee = side.lepton_p(SOURCE)?;

    let l = side.lepton;
    let b = side.b;
    let nu_t = (side.top_px - l.x - b.x, side.top_py - l.y - b.y);
    let eb = (b.norm_squared() + mb * mb).sqrt();
    let event = Event {
        ee,
        lepton: [l.x, l.y, l.z],
        nu_t,
        eb_e: ee + eb,
        eb_p: [l.x + b.x, l.y + b.y, l.z + b.z],
        mebsq: mb * mb + 2.0 * (ee * eb - l.dot(&b)),
    };

    let (nux, nuy) = nu_t;
    let [ebx, eby, ebz] = event.eb_p;
    let mw0sq = peaks.mw * peaks.mw / 2.0;
    let mt0sq = (peaks.mt * peaks.mt - event.mebsq) / 2.0;
    let hwsq = peaks.w_hwhm * peaks.w_hwhm;
    let htsq = peaks.t_hwhm * peaks.t_hwhm;

    let tmpb = mt0sq + ebx * nux + eby * nuy;
    let tmpc = mw0sq + l.x * nux + l.y * nuy;
    let tmpd = nux * nux + nuy * nuy;

    let c2 = -event.eb_e * ebz * hwsq - ee * htsq * l.z;
    let c11 = (ee * ee + l.z * l.z) * htsq + (event.eb_e * event.eb_e + ebz * ebz) * hwsq;
    let c10 = ebz * hwsq * tmpb + htsq * l.z * tmpc;
    let c01 = -event.eb_e * hwsq * tmpb - ee * htsq * tmpc;

    let a4 = 4.0 * c2 * c2 - c11 * c11;
    let a3 = -2.0 * c10 * c11 + 4.0 * c01 * c2;
    let a2 = c01 * c01 - c10 * c10 + a4 * tmpd;
    let a1 = -2.0 * (c10 * c11 - c01 * c2) * tmpd;
    let a0 = tmpd * (c2 * c2 * tmpd - c10 * c10);

    let mut candidates: Vec<BestNuz> = checked_quartic_roots(a4, a3, a2, a1, a0)?
        .iter()
        .copied()
        .filter(|&nuz| {
            // Stationarity before squaring: lside = rside
            let enu = (tmpd + nuz * nuz).sqrt();
            let lside = c2 * (enu * enu + nuz * nuz) + c01 * nuz;
            let rside = -(c11 * nuz + c10) * enu;
            (lside - rside).abs() <= (lside + rside).abs()
        })
        .map(|nuz| {
            let (distance, mw, mt) = event.distance(peaks, nuz, ecms);
            BestNuz {
                nuz,
                distance,
                mw,
                mt,
                stationary_points: 0,
            }
        })
        .collect();

    let stationary_points = candidates.len();
    if stationary_points == 0 {
        return Err(SolverError::NumericalInstability(
            "distance from the mass peaks has no stationary point".to_string(),
        )
        .into());
    }

    let (distance, mw, mt) = event.distance(peaks, nu_pz_ref, ecms);
    candidates.push(BestNuz {
        nuz: nu_pz_ref,
        distance,
        mw,
        mt,
        stationary_points: 0,
    });
    sort_by_key_f64(&mut candidates, |c| c.distance);

    Ok(BestNuz {
        stationary_points,
        ..candidates[0]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Vector3;

    fn peaks() -> MassPeaks {
        MassPeaks {
            mw: 80.4,
            mt: 172.5,
            w_hwhm: 80.4 * 2.085,
            t_hwhm: 172.5 * 1.5,
        }
    }

    fn side() -> LeptonicSide {
        LeptonicSide::new(
            10.0,
            5.0,
            Vector3::new(30.0, 0.0, 40.0),
            Vector3::new(0.0, 40.0, 30.0),
        )
    }

    #[test]
    fn test_exact_solution_has_zero_distance() {
        // b momentum of an exact solution at the peak masses
        let pb = 70.245_703_451_083_32;
        let side = LeptonicSide {
            b: Vector3::new(0.0, 0.8, 0.6) * pb,
            ..side()
        };
        let best = best_leptonic_nuz(&side, 0.0, &peaks(), 0.0, 1960.0).unwrap();
        assert_relative_eq!(best.nuz, 230.956_448_276_521_2, max_relative = 1e-7);
        assert!(best.distance < 1e-6);
        assert_relative_eq!(best.mw, 80.4, max_relative = 1e-9);
        assert_relative_eq!(best.mt, 172.5, max_relative = 1e-9);
        assert_eq!(best.stationary_points, 3);
    }

    #[test]
    fn test_closest_stationary_point() {
        let best = best_leptonic_nuz(&side(), 0.0, &peaks(), 0.0, 1960.0).unwrap();
        assert_relative_eq!(best.nuz, 352.009_285_235_156_6, max_relative = 1e-8);
        assert_relative_eq!(best.distance, 13.427_164_661_527_72, max_relative = 1e-7);
        assert_relative_eq!(best.mw, 92.033_970_077_065_44, max_relative = 1e-8);
        assert_relative_eq!(best.mt, 167.871_048_727_871_7, max_relative = 1e-8);
        assert_eq!(best.stationary_points, 3);
    }

    #[test]
    fn test_reference_wins_beyond_beam_energy() {
        // Every stationary point needs more energy than a 150 GeV beam has
        let best = best_leptonic_nuz(&side(), 0.0, &peaks(), 20.0, 300.0).unwrap();
        assert_eq!(best.nuz, 20.0);
        assert_relative_eq!(best.distance, 67.031_799_166_195_2, max_relative = 1e-9);
        assert_relative_eq!(best.mw, 64.031_242_374_328_49, max_relative = 1e-9);
        assert_relative_eq!(best.mt, 113.137_084_989_847_6, max_relative = 1e-9);
    }

    #[test]
    fn test_penalty_applies_to_all() {
        let pb = 70.245_703_451_083_32;
        let side = LeptonicSide {
            b: Vector3::new(0.0, 0.8, 0.6) * pb,
            ..side()
        };
        let best = best_leptonic_nuz(&side, 0.0, &peaks(), 0.0, 300.0).unwrap();
        assert!(best.distance >= BEAM_ENERGY_PENALTY);
        assert_relative_eq!(best.nuz, 230.956_448_276_521_2, max_relative = 1e-7);
    }

    #[test]
    fn test_rejects_bad_widths() {
        let mut bad = peaks();
        bad.t_hwhm = 0.0;
        assert!(best_leptonic_nuz(&side(), 0.0, &bad, 0.0, 1960.0).is_err());
        assert!(best_leptonic_nuz(&side(), -1.0, &peaks(), 0.0, 1960.0).is_err());
    }
}
