//! Relativistic particle four-vectors.

use super::KinematicsError;
use nalgebra::Vector3;
use std::ops::Add;

/// Three-momentum alias used throughout the workspace.
pub type Momentum = Vector3<f64>;

/// An on-shell particle: three-momentum plus non-negative mass.
///
/// The energy is derived as `√(|p|² + m²)`. Values are immutable; four-vector
/// sums produce new particles whose mass is the invariant mass of the system.
///
/// # Examples
///
/// ```
/// use nalgebra::Vector3;
/// use topkin_core::types::Particle;
///
/// let lepton = Particle::massless(Vector3::new(30.0, 0.0, 40.0));
/// assert_eq!(lepton.energy(), 50.0);
///
/// let b = Particle::new(Vector3::new(0.0, 40.0, 30.0), 4.8).unwrap();
/// let system = lepton + b;
/// assert!(system.mass() > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Particle {
    momentum: Momentum,
    mass: f64,
}

impl Particle {
    /// Create a particle, rejecting negative or non-finite masses.
    ///
    /// # Errors
    ///
    /// Returns [`KinematicsError::InvalidInput`] if `mass < 0` or any
    /// component is not finite.
    pub fn new(momentum: Momentum, mass: f64) -> Result<Self, KinematicsError> {
        KinematicsError::ensure(
            mass.is_finite() && mass >= 0.0,
            "Particle::new",
            "mass must be finite and non-negative",
        )?;
        KinematicsError::ensure(
            momentum.iter().all(|c| c.is_finite()),
            "Particle::new",
            "momentum components must be finite",
        )?;
        Ok(Self { momentum, mass })
    }

    /// Create a massless particle.
    pub fn massless(momentum: Momentum) -> Self {
        Self {
            momentum,
            mass: 0.0,
        }
    }

    /// Create a particle from Cartesian components.
    pub fn from_components(px: f64, py: f64, pz: f64, mass: f64) -> Result<Self, KinematicsError> {
        Self::new(Vector3::new(px, py, pz), mass)
    }

    /// Three-momentum.
    #[inline]
    pub fn momentum(&self) -> &Momentum {
        &self.momentum
    }

    /// Rest mass.
    #[inline]
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Squared rest mass.
    #[inline]
    pub fn mass_squared(&self) -> f64 {
        self.mass * self.mass
    }

    /// Momentum magnitude `|p|`.
    #[inline]
    pub fn p(&self) -> f64 {
        self.momentum.norm()
    }

    /// Transverse momentum `√(px² + py²)`.
    #[inline]
    pub fn pt(&self) -> f64 {
        self.momentum.x.hypot(self.momentum.y)
    }

    /// Energy `√(|p|² + m²)`.
    #[inline]
    pub fn energy(&self) -> f64 {
        (self.momentum.norm_squared() + self.mass * self.mass).sqrt()
    }
}

impl Add for Particle {
    type Output = Particle;

    /// Four-vector sum. The mass of the result is the invariant mass of the
    /// pair, clamped at zero against rounding.
    fn add(self, rhs: Particle) -> Particle {
        let energy = self.energy() + rhs.energy();
        let momentum = self.momentum + rhs.momentum;
        let msq = (energy - momentum.norm()) * (energy + momentum.norm());
        Particle {
            momentum,
            mass: msq.max(0.0).sqrt(),
        }
    }
}

/// Squared invariant mass `(ΣE)² − |Σp|²` of a set of particles.
///
/// Unlike chained [`Particle`] sums, the result is not clamped and may be
/// slightly negative for nearly collinear massless inputs.
pub fn invariant_mass_squared(particles: &[Particle]) -> f64 {
    let energy: f64 = particles.iter().map(Particle::energy).sum();
    let momentum = particles
        .iter()
        .fold(Vector3::zeros(), |acc, p| acc + p.momentum);
    energy * energy - momentum.norm_squared()
}
