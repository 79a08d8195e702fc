//! Run-time selection of the acceleration-level formulation.

use std::fmt;

use sim_core::{Data, Model};

use crate::constraint_set::ConstraintSet;
use crate::error::ConstraintError;
use crate::lagrangian::forward_dynamics_contacts_lagrangian;
use crate::sparse::forward_dynamics_contacts_lagrangian_sparse;
use crate::test_force::forward_dynamics_contacts;

/// Formulation used to compute constrained accelerations.
///
/// All three produce the same accelerations and forces for well-posed
/// constraints; they differ in cost and in which [`LinearSolver`] variants
/// they accept.
///
/// [`LinearSolver`]: crate::LinearSolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ForwardDynamicsMethod {
    /// Dense `(nv + m)`-square KKT system.
    #[default]
    Lagrangian,
    /// Tree-sparse `LᵀDL` elimination to an `m × m` system.
    LagrangianSparse,
    /// Test forces through the articulated-body terms, `m × m` system.
    TestForces,
}

impl ForwardDynamicsMethod {
    /// All formulations, in declaration order.
    pub const ALL: [Self; 3] = [Self::Lagrangian, Self::LagrangianSparse, Self::TestForces];
}

impl fmt::Display for ForwardDynamicsMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lagrangian => "lagrangian",
            Self::LagrangianSparse => "lagrangian-sparse",
            Self::TestForces => "test-forces",
        })
    }
}

impl ConstraintSet {
    /// Constrained forward dynamics with the chosen formulation.
    ///
    /// # Errors
    ///
    /// Whatever the selected solver reports; see
    /// [`forward_dynamics_contacts_lagrangian`],
    /// [`forward_dynamics_contacts_lagrangian_sparse`] and
    /// [`forward_dynamics_contacts`].
    ///
    /// # Panics
    ///
    /// Panics if the set is not bound to `model` or a vector's length differs from `nv`.
    pub fn forward_dynamics(
        &mut self,
        method: ForwardDynamicsMethod,
        model: &Model,
        data: &mut Data,
        q: &[f64],
        qdot: &[f64],
        tau: &[f64],
        qddot: &mut [f64],
    ) -> Result<(), ConstraintError> {
        match method {
            ForwardDynamicsMethod::Lagrangian => {
                forward_dynamics_contacts_lagrangian(model, data, q, qdot, tau, self, qddot)
            }
            ForwardDynamicsMethod::LagrangianSparse => {
                forward_dynamics_contacts_lagrangian_sparse(model, data, q, qdot, tau, self, qddot)
            }
            ForwardDynamicsMethod::TestForces => forward_dynamics_contacts(model, data, q, qdot, tau, self, qddot),
        }
    }

    /// Post-impact velocities; see
    /// [`compute_contact_impulses_lagrangian`](crate::compute_contact_impulses_lagrangian).
    ///
    /// # Errors
    ///
    /// Singular or non-finite impulse systems.
    pub fn compute_impulses(
        &mut self,
        model: &Model,
        data: &mut Data,
        q: &[f64],
        qdot_minus: &[f64],
        qdot_plus: &mut [f64],
    ) -> Result<(), ConstraintError> {
        crate::lagrangian::compute_contact_impulses_lagrangian(model, data, q, qdot_minus, self, qdot_plus)
    }
}
