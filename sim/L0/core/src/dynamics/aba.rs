//! Articulated Body Algorithm for forward dynamics.
//!
//! O(n) computation of `q̈ = H⁻¹ (τ − C)` over the parent-index arena. The
//! articulated-body intermediates (`ia`, `ua`, `dinv`, `u`, `c`) remain in
//! [`Data`] afterwards so that later passes can propagate additional forces
//! without repeating the inertia recursion.

use nalgebra::{Matrix3, Vector3};

use crate::dynamics::spatial::{SpatialVector, join, spatial_cross_force};
use crate::kinematics::{dof_block, scatter_dof_block, update_kinematics_custom};
use crate::types::{Data, Model, StepError};

/// Smallest joint-space articulated inertia accepted as invertible.
const MIN_PIVOT: f64 = 1e-15;

/// Invert the leading `n × n` block of a joint-space inertia, zero elsewhere.
fn invert_dof_block(d: &Matrix3<f64>, n: usize) -> Option<Matrix3<f64>> {
    match n {
        0 => Some(Matrix3::zeros()),
        1 => {
            let d0 = d[(0, 0)];
            (d0.abs() > MIN_PIVOT).then(|| {
                let mut out = Matrix3::zeros();
                out[(0, 0)] = 1.0 / d0;
                out
            })
        }
        _ => {
            let mut block = Matrix3::identity();
            block.view_mut((0, 0), (n, n)).copy_from(&d.view((0, 0), (n, n)));
            let inv = block.try_inverse()?;
            let mut out = Matrix3::zeros();
            out.view_mut((0, 0), (n, n)).copy_from(&inv.view((0, 0), (n, n)));
            out.iter().all(|x| x.is_finite()).then_some(out)
        }
    }
}

/// Articulated Body Algorithm.
///
/// `f_ext`, when given, holds one external spatial force per body in base
/// coordinates about the base origin.
///
/// Writes `x_lambda`, `x_base`, `v`, `c`, `ia`, `pa`, `ua`, `dinv`, `u` and
/// `a` (with the gravity offset `a[0] = −g`); the result goes to `qddot`.
///
/// Reference: Featherstone, "Rigid Body Dynamics Algorithms", Table 7.1
///
/// # Errors
///
/// [`StepError::SingularArticulatedInertia`] when a joint's `Sᵀ IA S` cannot
/// be inverted (e.g. a massless leaf body on a moving joint).
///
/// # Panics
///
/// Panics if a vector's length differs from `nv`, or `f_ext` from `nbody`.
#[allow(clippy::similar_names)]
pub fn forward_dynamics(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    tau: &[f64],
    qddot: &mut [f64],
    f_ext: Option<&[SpatialVector]>,
) -> Result<(), StepError> {
    assert_eq!(tau.len(), model.nv, "tau must have nv entries");
    assert_eq!(qddot.len(), model.nv, "qddot must have nv entries");
    if let Some(f_ext) = f_ext {
        assert_eq!(f_ext.len(), model.nbody, "f_ext must have one entry per body");
    }

    update_kinematics_custom(model, data, Some(q), Some(qdot), None);

    // Pass 1: rigid-body inertia and bias force per body.
    for i in 1..model.nbody {
        data.ia[i] = model.body_inertia[i];
        data.pa[i] = spatial_cross_force(data.v[i], data.ia[i] * data.v[i]);
        if let Some(f_ext) = f_ext {
            data.pa[i] -= data.x_base[i].apply_adjoint(&f_ext[i]);
        }
    }

    // Pass 2: articulated inertias, leaves to root.
    for i in (1..model.nbody).rev() {
        let n = model.body_dof_num[i];
        data.ua[i] = data.ia[i] * data.s[i];
        let d = data.s[i].transpose() * data.ua[i];
        data.dinv[i] = invert_dof_block(&d, n).ok_or_else(|| {
            tracing::warn!(body = i, "singular articulated inertia");
            StepError::SingularArticulatedInertia { body: i }
        })?;
        data.u[i] = dof_block(tau, model.body_dof_adr[i], n) - data.s[i].transpose() * data.pa[i];

        let parent = model.body_parent[i];
        if parent != 0 {
            let ud = data.ua[i] * data.dinv[i];
            let ia_art = data.ia[i] - ud * data.ua[i].transpose();
            let pa_art = data.pa[i] + ia_art * data.c[i] + ud * data.u[i];

            let x = data.x_lambda[i].to_matrix();
            let ia_parent = x.transpose() * ia_art * x;
            data.ia[parent] += ia_parent;
            let pa_parent = data.x_lambda[i].apply_transpose(&pa_art);
            data.pa[parent] += pa_parent;
        }
    }

    // Pass 3: accelerations, root to leaves.
    data.a[0] = join(&Vector3::zeros(), &(-model.gravity));
    for i in 1..model.nbody {
        let parent = model.body_parent[i];
        let a_prime = data.x_lambda[i].apply(&data.a[parent]) + data.c[i];
        let qdd_i = data.dinv[i] * (data.u[i] - data.ua[i].transpose() * a_prime);
        data.a[i] = a_prime + data.s[i] * qdd_i;
        scatter_dof_block(qddot, model.body_dof_adr[i], model.body_dof_num[i], &qdd_i);
    }

    Ok(())
}
