//! Contact-constrained dynamics for articulated rigid-body trees.
//!
//! This crate computes joint accelerations and normal contact forces (or
//! post-impact velocities and impulses) for a kinematic tree from
//! [`sim_core`] subject to bilateral point constraints:
//!
//! ```text
//! H q̈ + C = τ + Gᵀ f        (equations of motion)
//! G q̈ + γ = 0               (normal accelerations reach their targets)
//! ```
//!
//! where `G` is the contact Jacobian (one row `nᵢᵀ J_p` per constraint) and
//! `f` the constraint forces along the normals.
//!
//! # Solvers
//!
//! | Function | System | Notes |
//! |----------|--------|-------|
//! | [`forward_dynamics_contacts_lagrangian`] | `(nv + m)²` KKT | any pivoting [`LinearSolver`] |
//! | [`forward_dynamics_contacts_lagrangian_sparse`] | `m²` via tree-sparse `LᵀDL` | cheap for deep trees |
//! | [`forward_dynamics_contacts`] | `m²` via test forces | no joint-space matrix |
//! | [`compute_contact_impulses_lagrangian`] | `(nv + m)²` KKT, velocity level | inelastic impacts |
//!
//! # Example
//!
//! ```
//! use nalgebra::Vector3;
//! use sim_contact::{ConstraintSet, forward_dynamics_contacts_lagrangian};
//! use sim_core::Model;
//!
//! // A 2 kg box resting on the ground.
//! let model = Model::floating_box(2.0, Vector3::new(0.1, 0.1, 0.1));
//! let mut data = model.make_data();
//! let body = model.body_id("box").ok_or("model has no body named \"box\"")?;
//!
//! let mut cs = ConstraintSet::new();
//! cs.add_constraint(body, Vector3::new(0.0, 0.0, -0.1), Vector3::z(), Some("ground"), 0.0);
//! cs.bind(&model);
//!
//! let zeros = vec![0.0; model.nv];
//! let mut qddot = vec![0.0; model.nv];
//! forward_dynamics_contacts_lagrangian(&model, &mut data, &zeros, &zeros, &zeros, &mut cs, &mut qddot)?;
//! assert!((cs.force()[0] - 2.0 * 9.81).abs() < 1e-9);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Contract
//!
//! Misuse (adding after [`ConstraintSet::bind`], binding twice, solving an
//! unbound set, mismatched vector lengths) panics. Numerical trouble
//! (singular or indefinite systems, non-finite results) is reported as a
//! [`ConstraintError`] and leaves the outputs untouched.

#![doc(html_root_url = "https://docs.rs/sim-contact/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,
    clippy::too_many_arguments,  // Solver signatures mirror the core algorithms
    clippy::doc_markdown,
    clippy::suboptimal_flops,
)]

mod config;
mod constraint_set;
mod error;
mod jacobian;
mod lagrangian;
mod linear_solver;
mod method;
mod sparse;
mod test_force;

pub use config::ContactSolverConfig;
pub use constraint_set::ConstraintSet;
pub use error::ConstraintError;
pub use jacobian::calc_contact_jacobian;
pub use lagrangian::{compute_contact_impulses_lagrangian, forward_dynamics_contacts_lagrangian};
pub use linear_solver::LinearSolver;
pub use method::ForwardDynamicsMethod;
pub use sparse::forward_dynamics_contacts_lagrangian_sparse;
pub use test_force::{
    forward_dynamics_acceleration_deltas, forward_dynamics_apply_constraint_forces, forward_dynamics_contacts,
};
