//! Dense Lagrangian (KKT) formulation for accelerations and impulses.
//!
//! Both solvers assemble the saddle-point system
//!
//! ```text
//! ┌       ┐ ┌   ┐   ┌   ┐
//! │ H  Gᵀ │ │ x │ = │ b │
//! │ G  0  │ │ λ │   │ d │
//! └       ┘ └   ┘   └   ┘
//! ```
//!
//! with `x = q̈`, `b = τ − C`, `d = −γ` at the acceleration level and
//! `x = q̇⁺`, `b = H q̇⁻`, `d = v⁺` at the velocity level. Constraint forces
//! (impulses) are `−λ`.

use nalgebra::Vector3;
use sim_core::{
    Data, Model, calc_point_acceleration, composite_rigid_body_algorithm, inverse_dynamics,
    update_kinematics_custom,
};
use tracing::{debug, trace};

use crate::constraint_set::ConstraintSet;
use crate::error::ConstraintError;
use crate::jacobian::fill_contact_jacobian;

/// Fill `cs.c`, `cs.h`, `cs.g` and `cs.gamma` for the state `(q, q̇)`.
///
/// `γᵢ = nᵢ · p̈ᵢ(q̈ = 0) − targetᵢ`, so that `G q̈ = −γ` enforces the
/// target normal accelerations. Consecutive constraints on the same body and
/// point share one point-acceleration evaluation.
pub(crate) fn compute_constrained_system(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    cs: &mut ConstraintSet,
) {
    // C(q, q̇) also refreshes positions and velocities for everything below.
    inverse_dynamics(model, data, q, qdot, cs.qddot_zero.as_slice(), cs.c.as_mut_slice(), None);
    composite_rigid_body_algorithm(model, data, q, &mut cs.h, false);

    let contacts = (&cs.body[..], &cs.point[..], &cs.normal[..]);
    fill_contact_jacobian(model, data, q, contacts, &mut cs.point_jac, &mut cs.g, false);

    update_kinematics_custom(model, data, None, None, Some(cs.qddot_zero.as_slice()));
    let mut prev: Option<(usize, Vector3<f64>, Vector3<f64>)> = None;
    for i in 0..cs.len() {
        let (body, point) = (cs.body[i], cs.point[i]);
        let accel = match prev {
            Some((b, p, accel)) if b == body && p == point => accel,
            _ => {
                calc_point_acceleration(model, data, q, qdot, cs.qddot_zero.as_slice(), body, &point, false)
            }
        };
        prev = Some((body, point, accel));
        cs.gamma[i] = cs.normal[i].dot(&accel) - cs.acceleration[i];
    }
}

/// Copy `[[H, Gᵀ], [G, 0]]` into `cs.a_kkt`.
fn assemble_kkt_matrix(cs: &mut ConstraintSet, nv: usize) {
    let m = cs.len();
    cs.a_kkt.fill(0.0);
    cs.a_kkt.view_mut((0, 0), (nv, nv)).copy_from(&cs.h);
    cs.a_kkt.view_mut((nv, 0), (m, nv)).copy_from(&cs.g);
    cs.a_kkt.view_mut((0, nv), (nv, m)).tr_copy_from(&cs.g);
}

fn solve_kkt(cs: &mut ConstraintSet) -> Result<(), ConstraintError> {
    let solver = cs.linear_solver();
    let tolerance = cs.config().singular_tolerance;
    trace!(a = %cs.a_kkt, b = ?cs.b_kkt.as_slice(), "KKT system");
    solver.solve(&cs.a_kkt, &cs.b_kkt, &mut cs.x_kkt, tolerance)
}

/// Forward dynamics with contacts via the dense KKT system.
///
/// Writes the constrained accelerations to `qddot` and the constraint
/// forces to `cs.force()`. Works with every [`LinearSolver`] except
/// [`LinearSolver::Llt`], which fails on the indefinite KKT matrix.
///
/// [`LinearSolver`]: crate::LinearSolver
/// [`LinearSolver::Llt`]: crate::LinearSolver::Llt
///
/// # Errors
///
/// A [`ConstraintError`] if the KKT system is singular (e.g. redundant or
/// contradictory constraints) or the solution is not finite. `qddot` and
/// `cs.force()` are untouched in that case.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or a vector's length differs from `nv`.
pub fn forward_dynamics_contacts_lagrangian(
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
    let (nv, m) = (model.nv, cs.len());
    debug!(nv, constraints = m, solver = %cs.linear_solver(), "contact forward dynamics (dense Lagrangian)");

    compute_constrained_system(model, data, q, qdot, cs);

    assemble_kkt_matrix(cs, nv);
    for k in 0..nv {
        cs.b_kkt[k] = tau[k] - cs.c[k];
    }
    for i in 0..m {
        cs.b_kkt[nv + i] = -cs.gamma[i];
    }

    solve_kkt(cs)?;

    qddot.copy_from_slice(&cs.x_kkt.as_slice()[..nv]);
    for (f, x) in cs.force.iter_mut().zip(cs.x_kkt.iter().skip(nv)) {
        *f = -x;
    }
    Ok(())
}

/// Post-impact velocities for a perfectly inelastic impact.
///
/// Solves `[[H, Gᵀ], [G, 0]] [q̇⁺; Λ] = [H q̇⁻; v⁺]` at configuration `q`,
/// writing `q̇⁺` to `qdot_plus` and the impulses `−Λ` to `cs.impulse()`.
///
/// # Errors
///
/// A [`ConstraintError`] if the system is singular or the solution is not
/// finite. `qdot_plus` and `cs.impulse()` are untouched in that case.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or a vector's length differs from `nv`.
pub fn compute_contact_impulses_lagrangian(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot_minus: &[f64],
    cs: &mut ConstraintSet,
    qdot_plus: &mut [f64],
) -> Result<(), ConstraintError> {
    cs.assert_bound_to(model);
    assert_eq!(qdot_minus.len(), model.nv, "qdot_minus must have nv entries");
    assert_eq!(qdot_plus.len(), model.nv, "qdot_plus must have nv entries");
    let (nv, m) = (model.nv, cs.len());
    debug!(nv, constraints = m, solver = %cs.linear_solver(), "contact impulses (dense Lagrangian)");

    composite_rigid_body_algorithm(model, data, q, &mut cs.h, true);
    let contacts = (&cs.body[..], &cs.point[..], &cs.normal[..]);
    fill_contact_jacobian(model, data, q, contacts, &mut cs.point_jac, &mut cs.g, false);

    assemble_kkt_matrix(cs, nv);
    cs.z.copy_from_slice(qdot_minus);
    cs.h.mul_to(&cs.z, &mut cs.b_kkt.rows_mut(0, nv));
    for i in 0..m {
        cs.b_kkt[nv + i] = cs.v_plus[i];
    }

    solve_kkt(cs)?;

    qdot_plus.copy_from_slice(&cs.x_kkt.as_slice()[..nv]);
    for (p, x) in cs.impulse.iter_mut().zip(cs.x_kkt.iter().skip(nv)) {
        *p = -x;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::linear_solver::LinearSolver;
    use sim_core::{STANDARD_GRAVITY, calc_point_velocity};

    #[test]
    fn resting_box_carries_its_weight() {
        let mass = 3.0;
        let model = Model::floating_box(mass, Vector3::new(0.2, 0.2, 0.2));
        let mut data = model.make_data();
        let box_id = model.body_id("box").unwrap();
        let zeros = vec![0.0; model.nv];

        let mut cs = ConstraintSet::new();
        cs.add_constraint(box_id, Vector3::new(0.0, 0.0, -0.2), Vector3::z(), None, 0.0);
        cs.bind(&model);

        let mut qddot = vec![0.0; model.nv];
        forward_dynamics_contacts_lagrangian(&model, &mut data, &zeros, &zeros, &zeros, &mut cs, &mut qddot)
            .unwrap();
        assert_relative_eq!(cs.force()[0], mass * STANDARD_GRAVITY, epsilon = 1e-9);
        for &a in &qddot {
            assert_relative_eq!(a, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn gamma_captures_target_and_velocity_terms() {
        // Spinning pendulum: centripetal tip acceleration ω² l points at the pivot.
        let model = Model::n_link_pendulum(1, 1.0, 1.0);
        let mut data = model.make_data();
        let omega = 2.0;
        let mut cs = ConstraintSet::new();
        cs.add_constraint(1, Vector3::new(0.0, 0.0, -1.0), Vector3::z(), None, 0.5);
        cs.bind(&model);

        compute_constrained_system(&model, &mut data, &[0.0], &[omega], &mut cs);
        assert_relative_eq!(cs.gamma()[0], omega * omega - 0.5, epsilon = 1e-12);
        // Hanging straight down: no gravity torque, no velocity product torque.
        assert_relative_eq!(cs.c()[0], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn impulse_stops_falling_box() {
        let mass = 2.0;
        let model = Model::floating_box(mass, Vector3::new(0.1, 0.1, 0.1));
        let mut data = model.make_data();
        let box_id = model.body_id("box").unwrap();
        let q = vec![0.0; model.nv];
        let qdot_minus = [0.3, 0.0, -1.5, 0.0, 0.0, 0.0];

        let mut cs = ConstraintSet::new();
        cs.add_constraint(box_id, Vector3::zeros(), Vector3::z(), None, 0.0);
        cs.bind(&model);

        let mut qdot_plus = vec![0.0; model.nv];
        compute_contact_impulses_lagrangian(&model, &mut data, &q, &qdot_minus, &mut cs, &mut qdot_plus).unwrap();

        assert_relative_eq!(qdot_plus[0], 0.3, epsilon = 1e-12);
        assert_relative_eq!(qdot_plus[2], 0.0, epsilon = 1e-12);
        assert_relative_eq!(cs.impulse()[0], mass * 1.5, epsilon = 1e-9);

        let v = calc_point_velocity(&model, &mut data, &q, &qdot_plus, box_id, &Vector3::zeros(), true);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cholesky_fails_on_kkt() {
        let model = Model::n_link_pendulum(2, 1.0, 1.0);
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.add_constraint(2, Vector3::new(0.0, 0.0, -1.0), Vector3::x(), None, 0.0);
        cs.set_linear_solver(LinearSolver::Llt);
        cs.bind(&model);

        let mut qddot = [9.0; 2];
        let err = forward_dynamics_contacts_lagrangian(
            &model, &mut data, &[0.2, 0.1], &[0.0, 0.0], &[0.0, 0.0], &mut cs, &mut qddot,
        )
        .unwrap_err();
        assert_eq!(err, ConstraintError::NotPositiveDefinite { solver: LinearSolver::Llt });
        assert_eq!(qddot, [9.0; 2]);
    }

    #[test]
    #[should_panic(expected = "must be bound")]
    fn unbound_set_panics() {
        let model = Model::n_link_pendulum(1, 1.0, 1.0);
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        let mut qddot = [0.0];
        let _ = forward_dynamics_contacts_lagrangian(&model, &mut data, &[0.0], &[0.0], &[0.0], &mut cs, &mut qddot);
    }
}
