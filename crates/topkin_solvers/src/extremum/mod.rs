//! Extremum searches on the leptonic side.
//!
//! These drivers use the leptonic solvers as an oracle:
//!
//! - [`nuz_local_peak`]: stationary points of the neutrino z momentum
//!   along the top mass constraint (massless b)
//! - [`w_mass_range`]: smallest and largest leptonic W mass compatible
//!   with the top mass
//! - [`variable_step_nuz_minmax`]: boundary of the neutrino z momenta for
//!   which [`solve_leptonic_by_nu_pz`](crate::leptonic::solve_leptonic_by_nu_pz)
//!   has solutions
//! - [`best_leptonic_nuz`]: neutrino z momentum closest to the W and top
//!   mass peaks at a fixed top transverse momentum

mod best_nuz;
mod local_peak;
mod nuz_minmax;
mod w_mass_range;

pub use best_nuz::{best_leptonic_nuz, BestNuz, MassPeaks};
pub use local_peak::{nuz_local_peak, LocalPeak, PeakKind};
pub use nuz_minmax::variable_step_nuz_minmax;
pub use w_mass_range::{w_mass_range, WMassRange};
