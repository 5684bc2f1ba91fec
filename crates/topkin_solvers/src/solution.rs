//! Solver inputs and solution records.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use topkin_core::types::{KinematicsError, Momentum, Particle};

// =============================================================================
// Inputs
// =============================================================================

/// Measured quantities on the leptonic side of the event.
///
/// The top transverse momentum is a hypothesis; the lepton momentum is
/// measured; only the direction of `b` enters the massless-b solvers, its
/// magnitude is used to rank competing solutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeptonicSide {
    /// Top x momentum.
    pub top_px: f64,
    /// Top y momentum.
    pub top_py: f64,
    /// Charged lepton momentum.
    pub lepton: Momentum,
    /// Measured b jet momentum.
    pub b: Momentum,
}

impl LeptonicSide {
    /// Bundle the leptonic-side measurements.
    pub fn new(top_px: f64, top_py: f64, lepton: Momentum, b: Momentum) -> Self {
        Self {
            top_px,
            top_py,
            lepton,
            b,
        }
    }

    /// Same measurements with a different top transverse momentum.
    pub fn with_top_pt(&self, top_px: f64, top_py: f64) -> Self {
        Self {
            top_px,
            top_py,
            ..*self
        }
    }

    /// Unit vector along `b`.
    pub(crate) fn b_direction(&self, context: &str) -> Result<(Momentum, f64), KinematicsError> {
        let bmag = self.b.norm();
        KinematicsError::ensure(
            bmag > 0.0 && bmag.is_finite(),
            context,
            "b momentum must be non-zero",
        )?;
        Ok((self.b / bmag, bmag))
    }

    /// Lepton momentum magnitude, which must be positive.
    pub(crate) fn lepton_p(&self, context: &str) -> Result<f64, KinematicsError> {
        let pl = self.lepton.norm();
        KinematicsError::ensure(
            pl > 0.0 && pl.is_finite(),
            context,
            "lepton momentum must be non-zero",
        )?;
        Ok(pl)
    }
}

/// A measured light or b quark jet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuarkJet {
    /// Measured momentum. Only the direction is used by the solvers.
    pub momentum: Momentum,
    /// Mass hypothesis.
    pub mass: f64,
}

impl QuarkJet {
    /// A jet with the given momentum and mass hypothesis.
    pub fn new(momentum: Momentum, mass: f64) -> Self {
        Self { momentum, mass }
    }

    /// Massless jet.
    pub fn massless(momentum: Momentum) -> Self {
        Self::new(momentum, 0.0)
    }

    /// Jets with unit momentum magnitude stand in for jets that were not
    /// reconstructed; their magnitude carries no information.
    pub fn is_extra_jet(&self) -> bool {
        is_extra_jet_magnitude(self.momentum.norm())
    }
}

pub(crate) fn is_extra_jet_magnitude(p: f64) -> bool {
    (p - 1.0).abs() < 1.0e-3
}

/// The three jets of the hadronic top decay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HadronicSide {
    /// Quark from the W.
    pub q: QuarkJet,
    /// Antiquark from the W.
    pub qbar: QuarkJet,
    /// b quark.
    pub b: QuarkJet,
}

// =============================================================================
// Solution Records
// =============================================================================

/// One solution of a leptonic-side solver.
///
/// The default value is the all-zero record used for unfilled slots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeptonSideSolution {
    /// b momentum magnitude; positive for a filled record.
    pub pblep: f64,
    /// b momentum.
    pub b: Momentum,
    /// b mass used by the solver.
    pub mb: f64,
    /// Neutrino momentum.
    pub nu: Momentum,
    /// Squared W mass.
    pub mwsq: f64,
    /// Top z momentum.
    pub tlepz: f64,
    /// Top mass.
    pub mt: f64,
    /// Set when an iterative solver stopped at its iteration cap.
    pub fail: bool,
}

impl Default for LeptonSideSolution {
    fn default() -> Self {
        Self {
            pblep: 0.0,
            b: Vector3::zeros(),
            mb: 0.0,
            nu: Vector3::zeros(),
            mwsq: 0.0,
            tlepz: 0.0,
            mt: 0.0,
            fail: false,
        }
    }
}

impl LeptonSideSolution {
    /// True for a filled record.
    pub fn is_valid(&self) -> bool {
        self.pblep > 0.0
    }

    /// W mass, or zero for a non-physical squared mass.
    pub fn w_mass(&self) -> f64 {
        self.mwsq.max(0.0).sqrt()
    }

    /// The b quark as a particle.
    pub fn b_particle(&self) -> Particle {
        Particle::new(self.b, self.mb).unwrap_or_else(|_| Particle::massless(self.b))
    }

    /// The neutrino as a massless particle.
    pub fn neutrino(&self) -> Particle {
        Particle::massless(self.nu)
    }

    /// Field-wise average of two records. The top mass is taken from `self`.
    pub(crate) fn average(&self, other: &Self) -> Self {
        Self {
            pblep: 0.5 * (self.pblep + other.pblep),
            b: 0.5 * (self.b + other.b),
            mb: 0.5 * (self.mb + other.mb),
            nu: 0.5 * (self.nu + other.nu),
            mwsq: 0.5 * (self.mwsq + other.mwsq),
            tlepz: 0.5 * (self.tlepz + other.tlepz),
            mt: self.mt,
            fail: false,
        }
    }
}

/// One solution of the hadronic-side solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HadronSideSolution {
    /// Quark momentum magnitude.
    pub q_p: f64,
    /// Quark momentum.
    pub q: Momentum,
    /// Antiquark momentum magnitude.
    pub qbar_p: f64,
    /// Antiquark momentum.
    pub qbar: Momentum,
    /// b momentum magnitude.
    pub b_p: f64,
    /// b momentum.
    pub b: Momentum,
    /// Quark mass.
    pub mq: f64,
    /// Antiquark mass.
    pub mqbar: f64,
    /// b mass.
    pub mb: f64,
    /// Set for a filled record.
    pub is_valid: bool,
}

impl Default for HadronSideSolution {
    fn default() -> Self {
        Self {
            q_p: 0.0,
            q: Vector3::zeros(),
            qbar_p: 0.0,
            qbar: Vector3::zeros(),
            b_p: 0.0,
            b: Vector3::zeros(),
            mq: 0.0,
            mqbar: 0.0,
            mb: 0.0,
            is_valid: false,
        }
    }
}

impl HadronSideSolution {
    /// Build a valid record from three particles.
    pub fn from_particles(q: &Particle, qbar: &Particle, b: &Particle) -> Self {
        Self {
            q_p: q.p(),
            q: *q.momentum(),
            qbar_p: qbar.p(),
            qbar: *qbar.momentum(),
            b_p: b.p(),
            b: *b.momentum(),
            mq: q.mass(),
            mqbar: qbar.mass(),
            mb: b.mass(),
            is_valid: true,
        }
    }

    /// Four-vector sum of the three quarks.
    ///
    /// # Errors
    ///
    /// [`KinematicsError::InvalidInput`] for an unfilled record or a
    /// negative mass.
    pub fn top_particle(&self) -> Result<Particle, KinematicsError> {
        KinematicsError::ensure(
            self.is_valid,
            "HadronSideSolution::top_particle",
            "record does not hold a solution",
        )?;
        let q = Particle::new(self.q, self.mq)?;
        let qbar = Particle::new(self.qbar, self.mqbar)?;
        let b = Particle::new(self.b, self.mb)?;
        Ok(b + (q + qbar))
    }
}

/// Candidate top transverse momentum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TopPt {
    /// x component.
    pub px: f64,
    /// y component.
    pub py: f64,
}

// =============================================================================
// Top Pz Window
// =============================================================================

/// Open interval of admissible leptonic top z momenta.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PzWindow {
    /// Exclusive lower bound.
    pub min: f64,
    /// Exclusive upper bound.
    pub max: f64,
}

impl Default for PzWindow {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl PzWindow {
    /// Window `(min, max)`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Window accepting every finite value.
    pub fn unbounded() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// Strict containment.
    #[inline]
    pub fn contains(&self, pz: f64) -> bool {
        self.min < pz && pz < self.max
    }
}

// =============================================================================
// Rotated Frame
// =============================================================================

/// Transverse frame whose y' axis points along the transverse b direction.
///
/// In this frame the b direction lies in the y'z half-plane, so the x'
/// momentum balance no longer involves the b momentum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TransverseFrame {
    x_axis: (f64, f64),
    y_axis: (f64, f64),
}

impl TransverseFrame {
    pub(crate) fn along(b: &Momentum, context: &str) -> Result<Self, KinematicsError> {
        let bt = b.x.hypot(b.y);
        KinematicsError::ensure(
            bt > 0.0 && bt.is_finite(),
            context,
            "b transverse momentum must be non-zero",
        )?;
        let y_axis = (b.x / bt, b.y / bt);
        // y' × z
        let x_axis = (y_axis.1, -y_axis.0);
        Ok(Self { x_axis, y_axis })
    }

    /// Components `(x', y')` of a transverse vector.
    pub(crate) fn to_local(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.x_axis.0 * x + self.x_axis.1 * y,
            self.y_axis.0 * x + self.y_axis.1 * y,
        )
    }

    /// Global `(x, y)` of a vector with local components `(x', y')`.
    pub(crate) fn to_global(&self, xp: f64, yp: f64) -> (f64, f64) {
        (
            self.x_axis.0 * xp + self.y_axis.0 * yp,
            self.x_axis.1 * xp + self.y_axis.1 * yp,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_records_are_zero() {
        let l = LeptonSideSolution::default();
        assert!(!l.is_valid());
        assert_eq!(l.nu, Vector3::zeros());
        let h = HadronSideSolution::default();
        assert!(!h.is_valid);
        assert!(h.top_particle().is_err());
    }

    #[test]
    fn test_hadron_record_round_trip() {
        let q = Particle::massless(Vector3::new(40.0, 10.0, 5.0));
        let qbar = Particle::massless(Vector3::new(-10.0, 35.0, 20.0));
        let b = Particle::new(Vector3::new(20.0, -30.0, 60.0), 4.8).unwrap();
        let h = HadronSideSolution::from_particles(&q, &qbar, &b);
        assert!(h.is_valid);
        assert_relative_eq!(h.q_p, q.p());
        let top = h.top_particle().unwrap();
        let expected = b + (q + qbar);
        assert_relative_eq!(top.mass(), expected.mass(), epsilon = 1e-12);
        assert_relative_eq!(top.momentum().z, 85.0, epsilon = 1e-12);
    }

    #[test]
    fn test_window_is_open() {
        let w = PzWindow::new(-10.0, 10.0);
        assert!(w.contains(0.0));
        assert!(!w.contains(10.0));
        assert!(!w.contains(-10.0));
        assert!(PzWindow::default().contains(1.0e300));
        assert!(!PzWindow::default().contains(f64::NAN));
    }

    #[test]
    fn test_frame_round_trip() {
        let frame = TransverseFrame::along(&Vector3::new(3.0, 4.0, 7.0), "test").unwrap();
        // b itself has no x' component
        let (bx, by) = frame.to_local(3.0, 4.0);
        assert_relative_eq!(bx, 0.0, epsilon = 1e-14);
        assert_relative_eq!(by, 5.0, epsilon = 1e-14);

        let (xp, yp) = frame.to_local(-2.0, 9.0);
        let (x, y) = frame.to_global(xp, yp);
        assert_relative_eq!(x, -2.0, epsilon = 1e-13);
        assert_relative_eq!(y, 9.0, epsilon = 1e-13);
    }

    #[test]
    fn test_frame_requires_transverse_b() {
        assert!(TransverseFrame::along(&Vector3::new(0.0, 0.0, 5.0), "test").is_err());
    }

    #[test]
    fn test_average() {
        let a = LeptonSideSolution {
            pblep: 10.0,
            mwsq: 100.0,
            mt: 172.5,
            fail: true,
            ..Default::default()
        };
        let b = LeptonSideSolution {
            pblep: 20.0,
            mwsq: 300.0,
            mt: 0.0,
            ..Default::default()
        };
        let avg = a.average(&b);
        assert_eq!(avg.pblep, 15.0);
        assert_eq!(avg.mwsq, 200.0);
        assert_eq!(avg.mt, 172.5);
        assert!(!avg.fail);
    }

    #[test]
    fn test_extra_jet_flag() {
        assert!(QuarkJet::massless(Vector3::new(0.0, 0.6, 0.8)).is_extra_jet());
        assert!(!QuarkJet::massless(Vector3::new(0.0, 6.0, 8.0)).is_extra_jet());
    }
}
