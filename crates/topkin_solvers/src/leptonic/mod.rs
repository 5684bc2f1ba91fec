//! Leptonic-side solvers.
//!
//! The leptonic top decays to a b quark and a W that decays to a charged
//! lepton and an unmeasured neutrino. Given the lepton momentum, the b
//! direction and the top transverse momentum, these solvers find the b
//! momentum magnitude and the neutrino momentum that satisfy the mass
//! constraints.
//!
//! | Known besides the directions | b mass | Solver |
//! |---|---|---|
//! | `mt`, `mW²` | ignored | [`solve_leptonic_side`] |
//! | `mW²`, `p_b` | 0 | [`solve_leptonic_by_mwsq`] |
//! | `mt`, `p_b` | any | [`solve_leptonic_by_pb`] |
//! | `mt`, `ν_z` | any | [`solve_leptonic_by_nu_pz`] |
//! | `mt`, `mW²` | > 0 | [`solve_leptonic_side_massive_b`], [`solve_leptonic_side_massive_b_verbose`], [`solve_leptonic_side_massive_b_brute`] |
//! | `mt`, `mW²`, fixed `β` | any | [`solve_leptonic_by_mw_approx`] |
//!
//! Every solver returns `Ok` with an empty set when no physical solution
//! exists, and [`KinematicsError::InvalidInput`](topkin_core::types::KinematicsError::InvalidInput)
//! for invalid input.

mod bounds;
mod by_nu_pz;
pub(crate) mod coefficients;
mod fill;
mod massive_b;
mod massless;

pub use bounds::{leptonic_top_z_range, max_lepton_pt, solve_leptonic_for_top_pt};
pub use by_nu_pz::solve_leptonic_by_nu_pz;
pub use fill::{fill_leptonic_solutions, LeptonicCandidate};
pub use massive_b::{
    solve_leptonic_by_mw_approx, solve_leptonic_mc, solve_leptonic_side_massive_b,
    solve_leptonic_side_massive_b_brute, solve_leptonic_side_massive_b_verbose,
};
pub use massless::{
    min_leptonic_mt_by_pb, min_leptonic_mwsq_by_pb, solve_leptonic_by_mwsq, solve_leptonic_by_pb,
    solve_leptonic_side,
};
