//! Point Jacobians.
//!
//! Walks the kinematic chain from a body to the root, accumulating each
//! joint's contribution to the velocity of a body-fixed point.

use nalgebra::{DMatrix, Vector3};

use crate::dynamics::split;
use crate::kinematics::{calc_body_to_base_coordinates, update_kinematics_custom};
use crate::types::{Data, Model};

/// Compute the 3×nv linear-velocity Jacobian of a body-fixed point, base coordinates.
///
/// Each column of a joint on the path to the root is the motion subspace
/// column expressed in base coordinates and shifted to the point:
/// `v_o + ω × p`, where `[ω; v_o] = X_baseⁱ⁻¹ · S_k`. Columns of DOFs not
/// on the path stay zero.
///
/// With `update_kinematics`, positions are recomputed from `q`; otherwise
/// the stored `x_base` is used and `q` is ignored.
///
/// # Panics
///
/// Panics if `g` is not `3 × nv`.
pub fn calc_point_jacobian(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    body: usize,
    point: &Vector3<f64>,
    g: &mut DMatrix<f64>,
    update_kinematics: bool,
) {
    assert_eq!(g.shape(), (3, model.nv), "point Jacobian must be 3 × nv");
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), None, None);
    }

    let p = calc_body_to_base_coordinates(model, data, q, body, point, false);
    g.fill(0.0);

    let mut current = body;
    while current != 0 {
        let adr = model.body_dof_adr[current];
        for k in 0..model.body_dof_num[current] {
            let col = data.s[current].column(k).into_owned();
            let (w, v_o) = split(&data.x_base[current].inverse_apply(&col));
            let v_p = v_o + w.cross(&p);
            for r in 0..3 {
                g[(r, adr + k)] = v_p[r];
            }
        }
        current = model.body_parent[current];
    }
}
