//! Dynamics computations: spatial algebra, CRBA, RNE, ABA, sparse factorization.
//!
//! This module groups the recursive algorithms that operate on the
//! articulated rigid body tree.

pub(crate) mod aba;
pub(crate) mod crba;
pub(crate) mod factor;
pub(crate) mod rne;
pub(crate) mod spatial;

pub use aba::forward_dynamics;
pub use crba::composite_rigid_body_algorithm;
pub use factor::factor_ltdl;
pub use rne::{inverse_dynamics, nonlinear_effects};
pub use spatial::{
    SpatialMatrix, SpatialTransform, SpatialVector, compute_body_spatial_inertia, join, skew,
    spatial_cross_force, spatial_cross_motion, split,
};
