//! Test-force (Delassus operator) formulation.
//!
//! Builds the constraint-space operator column by column: a unit probe force
//! is applied at each contact and its effect on every contact's normal
//! acceleration is measured through the articulated-body terms that one full
//! ABA pass leaves in [`Data`]. No joint-space matrix is formed.
//!
//! ## Algorithm Overview
//!
//! 1. `q̈₀` from ABA without constraint forces
//! 2. `aᵢ = nᵢ · p̈ᵢ(q̈₀) − targetᵢ`
//! 3. For each contact, probe with `−nᵢ` and propagate the response
//!    (two O(n) sweeps reusing `IA`, `U`, `D⁻¹`)
//! 4. `K[i, j] = n_j · (p̈_j(q̈₀ + Δq̈ᵢ) − p̈_j(q̈₀))`
//! 5. Solve `K f = a`, then rerun the bias and acceleration sweeps of ABA
//!    with the resulting forces
//!
//! Reference: Kokkevis, "Practical Physics for Articulated Characters" (2004)

use nalgebra::Vector3;
use sim_core::dynamics::{join, spatial_cross_force};
use sim_core::{
    Data, Model, SpatialVector, calc_body_to_base_coordinates, calc_point_acceleration, forward_dynamics,
    update_kinematics_custom,
};
use tracing::{debug, trace};

use crate::constraint_set::ConstraintSet;
use crate::error::ConstraintError;

/// Forward dynamics with contacts via test forces.
///
/// Same inputs and outputs as
/// [`forward_dynamics_contacts_lagrangian`](crate::forward_dynamics_contacts_lagrangian).
/// Afterwards `cs.qddot_0()`, `cs.point_accel_0()`, `cs.k()` and
/// `cs.f_ext_constraints()` describe the solve; `data` holds the
/// articulated-body state of the final pass.
///
/// # Errors
///
/// - [`ConstraintError::UnsupportedSolver`] for [`LinearSolver::Llt`](crate::LinearSolver::Llt)
///   (the operator is negative definite)
/// - [`ConstraintError::Dynamics`] if the articulated-body recursion fails
/// - any failure of the constraint-space solve
///
/// `qddot` and `cs.force()` are untouched on error.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or a vector's length differs from `nv`.
pub fn forward_dynamics_contacts(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    tau: &[f64],
    cs: &mut ConstraintSet,
    qddot: &mut [f64],
) -> Result<(), ConstraintError> {
    cs.assert_bound_to(model);
    assert_eq!(tau.len(), model.nv, "tau must have nv entries");
    assert_eq!(qddot.len(), model.nv, "qddot must have nv entries");
    let m = cs.len();
    let solver = cs.linear_solver();
    let tolerance = cs.config().singular_tolerance;
    debug!(nv = model.nv, constraints = m, %solver, "contact forward dynamics (test forces)");
    if solver.requires_positive_definite() {
        return Err(ConstraintError::UnsupportedSolver {
            solver,
            system: "test-force constraint-space system",
        });
    }

    cs.f_ext_constraints.fill(SpatialVector::zeros());
    forward_dynamics(model, data, q, qdot, tau, cs.qddot_0.as_mut_slice(), None)?;

    // Unconstrained contact accelerations.
    update_kinematics_custom(model, data, None, None, Some(cs.qddot_0.as_slice()));
    for i in 0..m {
        let accel =
            calc_point_acceleration(model, data, q, qdot, cs.qddot_0.as_slice(), cs.body[i], &cs.point[i], false);
        cs.point_accel_0[i] = accel;
        cs.a[i] = cs.normal[i].dot(&accel) - cs.acceleration[i];
    }

    // One probe per contact fills one row of K.
    for i in 0..m {
        let (body, normal) = (cs.body[i], cs.normal[i]);
        let p = calc_body_to_base_coordinates(model, data, q, body, &cs.point[i], false);
        let f_t = join(&p.cross(&(-normal)), &(-normal));
        cs.f_t[i] = f_t;

        forward_dynamics_acceleration_deltas(model, data, cs, body, &f_t);
        cs.qddot_t += &cs.qddot_0;

        update_kinematics_custom(model, data, None, None, Some(cs.qddot_t.as_slice()));
        for j in 0..m {
            let accel =
                calc_point_acceleration(model, data, q, qdot, cs.qddot_t.as_slice(), cs.body[j], &cs.point[j], false);
            cs.k[(i, j)] = cs.normal[j].dot(&(accel - cs.point_accel_0[j]));
        }
    }
    trace!(k = %cs.k, a = ?cs.a.as_slice(), "test-force system");

    solver.solve(&cs.k, &cs.a, &mut cs.lambda, tolerance)?;
    cs.force.copy_from_slice(cs.lambda.as_slice());

    for i in 0..m {
        let body = cs.body[i];
        let applied = cs.f_t[i] * cs.force[i];
        cs.f_ext_constraints[body] -= applied;
    }

    forward_dynamics_apply_constraint_forces(model, data, tau, cs, qddot);
    Ok(())
}

/// Joint acceleration response to a spatial force `f_t` on `body`.
///
/// `f_t` is in base coordinates about the base origin. Only the propagation
/// terms of the last [`forward_dynamics`] call are read from `data`
/// (`x_lambda`, `x_base`, `s`, `ua`, `dinv`); velocity, gravity and joint
/// torques play no part. The result goes to `cs.qddot_t`; `cs.d_pa`,
/// `cs.d_u` and `cs.d_a` hold the per-body intermediates.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or `body` is not a valid non-world body.
pub fn forward_dynamics_acceleration_deltas(
    model: &Model,
    data: &Data,
    cs: &mut ConstraintSet,
    body: usize,
    f_t: &SpatialVector,
) {
    cs.assert_bound_to(model);
    assert!(body > 0 && body < model.nbody, "body {body} out of range 1..{}", model.nbody);

    cs.d_pa.fill(SpatialVector::zeros());
    cs.d_u.fill(Vector3::zeros());
    cs.d_pa[body] = -data.x_base[body].apply_adjoint(f_t);

    // Only ancestors of `body` see the force on the way up.
    let mut i = body;
    while i != 0 {
        cs.d_u[i] = -(data.s[i].transpose() * cs.d_pa[i]);
        let parent = model.body_parent[i];
        if parent != 0 {
            let pa_art = cs.d_pa[i] + data.ua[i] * data.dinv[i] * cs.d_u[i];
            let moved = data.x_lambda[i].apply_transpose(&pa_art);
            cs.d_pa[parent] += moved;
        }
        i = parent;
    }

    cs.d_a[0] = SpatialVector::zeros();
    for i in 1..model.nbody {
        let parent = model.body_parent[i];
        let a_prime = data.x_lambda[i].apply(&cs.d_a[parent]);
        let qdd_i = data.dinv[i] * (cs.d_u[i] - data.ua[i].transpose() * a_prime);
        cs.d_a[i] = a_prime + data.s[i] * qdd_i;

        let (adr, n) = (model.body_dof_adr[i], model.body_dof_num[i]);
        cs.qddot_t.rows_mut(adr, n).copy_from(&qdd_i.rows(0, n));
    }
}

/// Final ABA sweeps with the constraint forces in `cs.f_ext_constraints`.
///
/// Reuses the articulated inertias and joint terms (`ia`, `ua`, `dinv`, `c`)
/// of the last [`forward_dynamics`] call at the same `(q, q̇)`; rewrites
/// `pa`, `u` and `a` and the result goes to `qddot`.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or a vector's length differs from `nv`.
pub fn forward_dynamics_apply_constraint_forces(
    model: &Model,
    data: &mut Data,
    tau: &[f64],
    cs: &ConstraintSet,
    qddot: &mut [f64],
) {
    cs.assert_bound_to(model);
    assert_eq!(tau.len(), model.nv, "tau must have nv entries");
    assert_eq!(qddot.len(), model.nv, "qddot must have nv entries");

    for i in 1..model.nbody {
        let inertia = &model.body_inertia[i];
        data.pa[i] = spatial_cross_force(data.v[i], inertia * data.v[i])
            - data.x_base[i].apply_adjoint(&cs.f_ext_constraints[i]);
    }

    for i in (1..model.nbody).rev() {
        let (adr, n) = (model.body_dof_adr[i], model.body_dof_num[i]);
        let mut tau_i = Vector3::zeros();
        tau_i.rows_mut(0, n).copy_from_slice(&tau[adr..adr + n]);
        data.u[i] = tau_i - data.s[i].transpose() * data.pa[i];

        let parent = model.body_parent[i];
        if parent != 0 {
            let ud = data.ua[i] * data.dinv[i];
            let ia_art = data.ia[i] - ud * data.ua[i].transpose();
            let pa_art = data.pa[i] + ia_art * data.c[i] + ud * data.u[i];
            let moved = data.x_lambda[i].apply_transpose(&pa_art);
            data.pa[parent] += moved;
        }
    }

    data.a[0] = join(&Vector3::zeros(), &(-model.gravity));
    for i in 1..model.nbody {
        let parent = model.body_parent[i];
        let a_prime = data.x_lambda[i].apply(&data.a[parent]) + data.c[i];
        let qdd_i = data.dinv[i] * (data.u[i] - data.ua[i].transpose() * a_prime);
        data.a[i] = a_prime + data.s[i] * qdd_i;

        let (adr, n) = (model.body_dof_adr[i], model.body_dof_num[i]);
        qddot[adr..adr + n].copy_from_slice(&qdd_i.as_slice()[..n]);
    }
}
