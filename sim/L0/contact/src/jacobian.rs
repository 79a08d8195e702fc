//! Contact Jacobian assembly.
//!
//! Row `i` of the contact Jacobian `G` maps joint velocities to the normal
//! velocity of contact `i`: `Gᵢ = nᵢᵀ · J_p(bodyᵢ, pointᵢ)`.

use nalgebra::{DMatrix, Vector3};
use sim_core::{Data, Model, calc_point_jacobian, update_kinematics_custom};

use crate::constraint_set::ConstraintSet;

/// Compute the contact Jacobian of `cs` into `g` (`len × nv`).
///
/// With `update_kinematics`, positions are recomputed from `q`; otherwise
/// the stored transforms in `data` are used. Consecutive constraints on the
/// same body and point share one point Jacobian.
///
/// # Panics
///
/// Panics if `g` is not `cs.len() × nv`.
pub fn calc_contact_jacobian(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    cs: &ConstraintSet,
    g: &mut DMatrix<f64>,
    update_kinematics: bool,
) {
    let mut point_jac = DMatrix::zeros(3, model.nv);
    fill_contact_jacobian(
        model,
        data,
        q,
        cs.contacts(),
        &mut point_jac,
        g,
        update_kinematics,
    );
}

/// Constraint definitions as parallel slices: body, point, normal.
pub(crate) type Contacts<'a> = (&'a [usize], &'a [Vector3<f64>], &'a [Vector3<f64>]);

/// Contact Jacobian over borrowed definitions, using `point_jac` (3 × nv) as
/// scratch so callers can pass disjoint fields of a [`ConstraintSet`].
pub(crate) fn fill_contact_jacobian(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    (body, point, normal): Contacts<'_>,
    point_jac: &mut DMatrix<f64>,
    g: &mut DMatrix<f64>,
    update_kinematics: bool,
) {
    assert_eq!(
        g.shape(),
        (body.len(), model.nv),
        "contact Jacobian must be n_constraints × nv"
    );
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), None, None);
    }

    let mut prev: Option<(usize, Vector3<f64>)> = None;
    for i in 0..body.len() {
        if prev != Some((body[i], point[i])) {
            calc_point_jacobian(model, data, q, body[i], &point[i], point_jac, false);
            prev = Some((body[i], point[i]));
        }
        for j in 0..model.nv {
            g[(i, j)] = point_jac.column(j).dot(&normal[i]);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;
    use sim_core::calc_point_velocity;

    #[test]
    fn rows_project_point_velocity_on_normal() {
        let model = Model::branched_tree();
        let mut data = model.make_data();
        let q: Vec<f64> = (0..model.nv).map(|i| 0.15 * (i as f64 + 0.5).cos()).collect();
        let qdot: Vec<f64> = (0..model.nv).map(|i| 0.4 - 0.1 * i as f64).collect();
        let left = model.body_id("left_foot").unwrap();
        let right = model.body_id("right_shin").unwrap();

        let mut cs = ConstraintSet::new();
        let n = Vector3::new(0.2, -0.1, 1.0).normalize();
        cs.add_constraint(left, Vector3::new(0.05, 0.0, -0.02), Vector3::z(), None, 0.0);
        cs.add_constraint(left, Vector3::new(0.05, 0.0, -0.02), Vector3::x(), None, 0.0);
        cs.add_constraint(right, Vector3::new(0.0, 0.0, -0.4), n, None, 0.0);
        cs.bind(&model);

        let mut g = DMatrix::zeros(3, model.nv);
        calc_contact_jacobian(&model, &mut data, &q, &cs, &mut g, true);
        let gv = &g * DVector::from_column_slice(&qdot);

        for i in 0..cs.len() {
            let v = calc_point_velocity(&model, &mut data, &q, &qdot, cs.body(i), &cs.point(i), true);
            assert_relative_eq!(gv[i], cs.normal(i).dot(&v), epsilon = 1e-12);
        }
    }

    #[test]
    fn empty_set_yields_empty_jacobian() {
        let model = Model::n_link_pendulum(2, 1.0, 1.0);
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.bind(&model);
        let mut g = DMatrix::zeros(0, 2);
        calc_contact_jacobian(&model, &mut data, &[0.0, 0.0], &cs, &mut g, true);
    }

    #[test]
    #[should_panic(expected = "n_constraints × nv")]
    fn wrong_shape_is_rejected() {
        let model = Model::n_link_pendulum(2, 1.0, 1.0);
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.add_constraint(2, Vector3::zeros(), Vector3::z(), None, 0.0);
        cs.bind(&model);
        let mut g = DMatrix::zeros(2, 2);
        calc_contact_jacobian(&model, &mut data, &[0.0, 0.0], &cs, &mut g, true);
    }
}
