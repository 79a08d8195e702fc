//! Articulated rigid-body dynamics core.
//!
//! This crate provides the Model/Data architecture and the recursive
//! algorithms on a kinematic tree that the contact solvers in `sim-contact`
//! build on. It follows Featherstone's spatial-vector formulation in body
//! coordinates, with the tree stored as a parent-index arena:
//!
//! - [`Model`] is static (built once with [`Model::add_body`])
//! - [`Data`] is dynamic (per-body transforms, velocities, articulated terms)
//! - Every algorithm takes `(&Model, &mut Data, ...)` and documents which
//!   `Data` fields it reads and writes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Model                               │
//! │  Static: parent indices, joints, X_tree, body inertias      │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Data                               │
//! │  Dynamic: X_λ, X_base, v, c, a, IA, pA, U, D⁻¹, u, L^T D L  │
//! │  Written by kinematics, RNEA, CRBA, ABA, factor_ltdl        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use sim_core::{Model, forward_dynamics};
//!
//! let model = Model::n_link_pendulum(3, 1.0, 1.0);
//! let mut data = model.make_data();
//!
//! let q = [0.3, -0.2, 0.1];
//! let qdot = [0.0; 3];
//! let tau = [0.0; 3];
//! let mut qddot = [0.0; 3];
//! forward_dynamics(&model, &mut data, &q, &qdot, &tau, &mut qddot, None)?;
//! # Ok::<(), sim_core::StepError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/sim-core/0.7.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,       // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,           // mul_add style changes aren't always clearer
    clippy::neg_cmp_op_on_partial_ord,  // !(x > 0.0) is intentional for NaN rejection
    clippy::too_many_arguments,         // Algorithm signatures mirror the textbook
    clippy::doc_markdown,               // Not all technical terms need backticks
)]

// Core type definitions (enums, Body, Model, Data)
pub mod types;

// Linear algebra utilities (Cholesky, LU, Gaussian elimination, sparse solve)
pub mod linalg;

// Dynamics computations (spatial algebra, CRBA, RNE, ABA, factorization)
pub mod dynamics;

// Forward kinematics and point queries
pub mod kinematics;

// Point Jacobians
pub mod jacobian;

pub use dynamics::{
    SpatialMatrix, SpatialTransform, SpatialVector, composite_rigid_body_algorithm, factor_ltdl,
    forward_dynamics, inverse_dynamics, nonlinear_effects,
};
pub use jacobian::calc_point_jacobian;
pub use kinematics::{
    calc_base_to_body_coordinates, calc_body_to_base_coordinates, calc_point_acceleration,
    calc_point_velocity, update_kinematics, update_kinematics_custom,
};
pub use linalg::{solve_d, solve_l, solve_lt, solve_lt_batch, solve_ltdl};
pub use types::{Body, Data, Joint, JointType, Model, STANDARD_GRAVITY, StepError};
