//! Recursive Newton-Euler algorithm for inverse dynamics.
//!
//! Computes the joint forces `τ = H(q) q̈ + C(q, q̇)` that produce a given
//! acceleration. Called with `q̈ = 0` it yields the bias vector `C` (gravity,
//! Coriolis and centrifugal terms) used by the Lagrangian contact solvers.

use nalgebra::Vector3;

use crate::dynamics::spatial::{SpatialVector, join, spatial_cross_force};
use crate::kinematics::{dof_block, scatter_dof_block, update_kinematics_custom};
use crate::types::{Data, Model};

/// Recursive Newton-Euler inverse dynamics.
///
/// `f_ext`, when given, holds one external spatial force per body, expressed
/// in base coordinates about the base origin.
///
/// Writes `x_lambda`, `x_base`, `v`, `c`, `a` (with the gravity offset
/// `a[0] = −g`) and `f`; the result goes to `tau`.
///
/// Reference: Featherstone, "Rigid Body Dynamics Algorithms", Table 5.1
///
/// # Panics
///
/// Panics if a vector's length differs from `nv`, or `f_ext` from `nbody`.
pub fn inverse_dynamics(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    qddot: &[f64],
    tau: &mut [f64],
    f_ext: Option<&[SpatialVector]>,
) {
    assert_eq!(tau.len(), model.nv, "tau must have nv entries");
    assert_eq!(qddot.len(), model.nv, "qddot must have nv entries");
    if let Some(f_ext) = f_ext {
        assert_eq!(f_ext.len(), model.nbody, "f_ext must have one entry per body");
    }

    update_kinematics_custom(model, data, Some(q), Some(qdot), None);

    // Gravity enters as a fictitious base acceleration.
    data.a[0] = join(&Vector3::zeros(), &(-model.gravity));

    for i in 1..model.nbody {
        let parent = model.body_parent[i];
        let a_j = data.s[i] * dof_block(qddot, model.body_dof_adr[i], model.body_dof_num[i]);
        data.a[i] = data.x_lambda[i].apply(&data.a[parent]) + a_j + data.c[i];

        let inertia = &model.body_inertia[i];
        data.f[i] = inertia * data.a[i] + spatial_cross_force(data.v[i], inertia * data.v[i]);
        if let Some(f_ext) = f_ext {
            data.f[i] -= data.x_base[i].apply_adjoint(&f_ext[i]);
        }
    }

    for i in (1..model.nbody).rev() {
        let tau_i = data.s[i].transpose() * data.f[i];
        scatter_dof_block(tau, model.body_dof_adr[i], model.body_dof_num[i], &tau_i);

        let parent = model.body_parent[i];
        if parent != 0 {
            let f_parent = data.x_lambda[i].apply_transpose(&data.f[i]);
            data.f[parent] += f_parent;
        }
    }
}

/// Bias forces `C(q, q̇)`: inverse dynamics with zero acceleration.
pub fn nonlinear_effects(model: &Model, data: &mut Data, q: &[f64], qdot: &[f64], c: &mut [f64]) {
    let zero = vec![0.0; model.nv];
    inverse_dynamics(model, data, q, qdot, &zero, c, None);
}
