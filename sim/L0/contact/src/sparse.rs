//! Branch-sparse Lagrangian formulation.
//!
//! Eliminates `q̈` from the KKT system with the tree-sparse factor
//! `H = Lᵀ D L` and solves the reduced constraint-space system instead:
//!
//! ```text
//! Y = L⁻ᵀ Gᵀ,   z = L⁻ᵀ (τ − C)
//! K = Yᵀ D⁻¹ Y  (= G H⁻¹ Gᵀ)
//! a = −γ − Yᵀ D⁻¹ z
//! K f = a
//! q̈ = L⁻¹ D⁻¹ L⁻ᵀ (τ − C + Gᵀ f)
//! ```
//!
//! The triangular solves only touch each DOF's ancestors, so the work
//! outside the final `m × m` solve scales with tree depth rather than `nv²`.

use sim_core::{Data, Model, factor_ltdl, solve_lt, solve_lt_batch, solve_ltdl};
use tracing::{debug, trace};

use crate::constraint_set::ConstraintSet;
use crate::error::ConstraintError;
use crate::lagrangian::compute_constrained_system;

/// Forward dynamics with contacts via the reduced sparse-factor system.
///
/// Same inputs and outputs as
/// [`forward_dynamics_contacts_lagrangian`](crate::forward_dynamics_contacts_lagrangian).
/// Overwrites the LᵀDL factor held in `data`.
///
/// # Errors
///
/// - [`ConstraintError::UnsupportedSolver`] for [`LinearSolver::Llt`](crate::LinearSolver::Llt)
/// - [`ConstraintError::Dynamics`] if `H` has a non-positive pivot
/// - any failure of the reduced solve (singular `K`, non-finite result)
///
/// `qddot` and `cs.force()` are untouched on error.
///
/// # Panics
///
/// Panics if `cs` is not bound to `model` or a vector's length differs from `nv`.
pub fn forward_dynamics_contacts_lagrangian_sparse(
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
    let solver = cs.linear_solver();
    let tolerance = cs.config().singular_tolerance;
    debug!(nv = model.nv, constraints = cs.len(), %solver, "contact forward dynamics (sparse Lagrangian)");
    if solver.requires_positive_definite() {
        return Err(ConstraintError::UnsupportedSolver {
            solver,
            system: "reduced constraint-space system",
        });
    }

    compute_constrained_system(model, data, q, qdot, cs);
    factor_ltdl(model, data, &cs.h)?;

    // Y = L⁻ᵀ Gᵀ, then D⁻¹ Y row by row.
    cs.g.transpose_to(&mut cs.y);
    solve_lt_batch(model, data, &mut cs.y);
    cs.y_scaled.copy_from(&cs.y);
    for (i, &d_inv) in data.qld_diag_inv.iter().enumerate() {
        let mut row = cs.y_scaled.row_mut(i);
        row *= d_inv;
    }

    // z = L⁻ᵀ (τ − C)
    for (k, z) in cs.z.iter_mut().enumerate() {
        *z = tau[k] - cs.c[k];
    }
    solve_lt(model, data, &mut cs.z);

    cs.y.tr_mul_to(&cs.y_scaled, &mut cs.k);
    cs.y_scaled.tr_mul_to(&cs.z, &mut cs.a);
    cs.a.neg_mut();
    cs.a -= &cs.gamma;
    trace!(k = %cs.k, a = ?cs.a.as_slice(), "reduced system");

    solver.solve(&cs.k, &cs.a, &mut cs.lambda, tolerance)?;

    // q̈ = H⁻¹ (τ − C + Gᵀ f)
    cs.g.tr_mul_to(&cs.lambda, &mut cs.z);
    for (k, z) in cs.z.iter_mut().enumerate() {
        *z += tau[k] - cs.c[k];
    }
    solve_ltdl(model, data, &mut cs.z);

    qddot.copy_from_slice(cs.z.as_slice());
    cs.force.copy_from_slice(cs.lambda.as_slice());
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::lagrangian::forward_dynamics_contacts_lagrangian;
    use crate::linear_solver::LinearSolver;
    use approx::assert_relative_eq;
    use nalgebra::{DMatrix, Vector3};
    use sim_core::composite_rigid_body_algorithm;

    fn two_feet(model: &Model) -> ConstraintSet {
        let mut cs = ConstraintSet::new();
        for foot in ["left_foot", "right_foot"] {
            let id = model.body_id(foot).unwrap();
            cs.add_constraint(id, Vector3::new(0.05, 0.0, 0.0), Vector3::z(), None, 0.0);
        }
        cs.bind(model);
        cs
    }

    #[test]
    fn reduced_operator_is_g_hinv_gt() {
        let model = Model::branched_tree();
        let mut data = model.make_data();
        let nv = model.nv;
        let q: Vec<f64> = (0..nv).map(|i| 0.2 * (i as f64).sin()).collect();
        let zeros = vec![0.0; nv];
        let mut cs = two_feet(&model);

        let mut qddot = vec![0.0; nv];
        forward_dynamics_contacts_lagrangian_sparse(&model, &mut data, &q, &zeros, &zeros, &mut cs, &mut qddot)
            .unwrap();

        let mut h = DMatrix::zeros(nv, nv);
        composite_rigid_body_algorithm(&model, &mut data, &q, &mut h, true);
        let h_inv = h.try_inverse().unwrap();
        let expected = cs.g() * h_inv * cs.g().transpose();
        assert_relative_eq!(*cs.k(), expected, epsilon = 1e-10, max_relative = 1e-9);
    }

    #[test]
    fn matches_dense_kkt() {
        let model = Model::branched_tree();
        let mut data = model.make_data();
        let nv = model.nv;
        let q: Vec<f64> = (0..nv).map(|i| 0.1 * (i as f64 + 1.0).cos()).collect();
        let qdot: Vec<f64> = (0..nv).map(|i| 0.3 - 0.05 * i as f64).collect();
        let tau: Vec<f64> = (0..nv).map(|i| 0.5 * (i as f64).sin()).collect();

        let mut dense = two_feet(&model);
        let mut qddot_dense = vec![0.0; nv];
        forward_dynamics_contacts_lagrangian(&model, &mut data, &q, &qdot, &tau, &mut dense, &mut qddot_dense)
            .unwrap();

        let mut sparse = two_feet(&model);
        let mut qddot_sparse = vec![0.0; nv];
        forward_dynamics_contacts_lagrangian_sparse(&model, &mut data, &q, &qdot, &tau, &mut sparse, &mut qddot_sparse)
            .unwrap();

        for k in 0..nv {
            assert_relative_eq!(qddot_sparse[k], qddot_dense[k], epsilon = 1e-9, max_relative = 1e-9);
        }
        for i in 0..2 {
            assert_relative_eq!(sparse.force()[i], dense.force()[i], epsilon = 1e-9, max_relative = 1e-9);
        }
    }

    #[test]
    fn cholesky_is_unsupported() {
        let model = Model::n_link_pendulum(2, 1.0, 1.0);
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.add_constraint(2, Vector3::zeros(), Vector3::x(), None, 0.0);
        cs.set_linear_solver(LinearSolver::Llt);
        cs.bind(&model);

        let mut qddot = [0.0; 2];
        let err = forward_dynamics_contacts_lagrangian_sparse(
            &model, &mut data, &[0.3, 0.0], &[0.0; 2], &[0.0; 2], &mut cs, &mut qddot,
        )
        .unwrap_err();
        assert!(matches!(err, ConstraintError::UnsupportedSolver { solver: LinearSolver::Llt, .. }));
    }
}
