//! Forward kinematics and point queries.
//!
//! Positions, velocities and accelerations are propagated root-to-leaf over
//! the parent-index arena. Point queries return vectors in base (world)
//! coordinates for points given in body coordinates.

use nalgebra::Vector3;

use crate::dynamics::{SpatialVector, spatial_cross_motion, split};
use crate::types::{Data, Model};

/// Gather the joint block `x[adr..adr + n]` into a zero-padded 3-vector.
#[inline]
pub(crate) fn dof_block(x: &[f64], adr: usize, n: usize) -> Vector3<f64> {
    let mut out = Vector3::zeros();
    for k in 0..n {
        out[k] = x[adr + k];
    }
    out
}

/// Scatter the first `n` entries of `block` into `x[adr..adr + n]`.
#[inline]
pub(crate) fn scatter_dof_block(x: &mut [f64], adr: usize, n: usize, block: &Vector3<f64>) {
    for k in 0..n {
        x[adr + k] = block[k];
    }
}

/// Update all kinematic quantities for the given state.
///
/// Equivalent to [`update_kinematics_custom`] with every argument present.
pub fn update_kinematics(model: &Model, data: &mut Data, q: &[f64], qdot: &[f64], qddot: &[f64]) {
    update_kinematics_custom(model, data, Some(q), Some(qdot), Some(qddot));
}

/// Update selected kinematic quantities.
///
/// - `q`: writes `x_lambda`, `x_base`.
/// - `qdot`: writes `v`, `c` (reads `x_lambda`).
/// - `qddot`: writes `a` with a zero base acceleration, so `a` holds pure
///   kinematic accelerations without the gravity offset (reads `x_lambda`, `c`).
///
/// Passing `qddot` without `qdot` uses the `c` terms of the last velocity
/// update.
///
/// # Panics
///
/// Panics if a supplied vector's length differs from `nv`.
pub fn update_kinematics_custom(
    model: &Model,
    data: &mut Data,
    q: Option<&[f64]>,
    qdot: Option<&[f64]>,
    qddot: Option<&[f64]>,
) {
    if let Some(q) = q {
        assert_eq!(q.len(), model.nv, "q must have nv entries");
        for i in 1..model.nbody {
            let parent = model.body_parent[i];
            let adr = model.body_dof_adr[i];
            let n = model.body_dof_num[i];
            let x_j = model.body_jnt_type[i].joint_transform(&model.body_jnt_axis[i], &q[adr..adr + n]);
            data.x_lambda[i] = x_j * model.body_xtree[i];
            data.x_base[i] = data.x_lambda[i] * data.x_base[parent];
        }
    }

    if let Some(qdot) = qdot {
        assert_eq!(qdot.len(), model.nv, "qdot must have nv entries");
        data.v[0] = SpatialVector::zeros();
        for i in 1..model.nbody {
            let parent = model.body_parent[i];
            let v_j = data.s[i] * dof_block(qdot, model.body_dof_adr[i], model.body_dof_num[i]);
            data.v[i] = data.x_lambda[i].apply(&data.v[parent]) + v_j;
            data.c[i] = spatial_cross_motion(data.v[i], v_j);
        }
    }

    if let Some(qddot) = qddot {
        assert_eq!(qddot.len(), model.nv, "qddot must have nv entries");
        data.a[0] = SpatialVector::zeros();
        for i in 1..model.nbody {
            let parent = model.body_parent[i];
            let a_j = data.s[i] * dof_block(qddot, model.body_dof_adr[i], model.body_dof_num[i]);
            data.a[i] = data.x_lambda[i].apply(&data.a[parent]) + data.c[i] + a_j;
        }
    }
}

/// Position of a body-fixed point in base coordinates.
///
/// With `update_kinematics`, positions are recomputed from `q` first;
/// otherwise `q` is ignored and the stored `x_base` is used.
#[must_use]
pub fn calc_body_to_base_coordinates(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    body: usize,
    point: &Vector3<f64>,
    update_kinematics: bool,
) -> Vector3<f64> {
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), None, None);
    }
    let x = &data.x_base[body];
    x.e.transpose() * point + x.r
}

/// Express a base-coordinate point in the frame of `body`.
#[must_use]
pub fn calc_base_to_body_coordinates(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    body: usize,
    point_base: &Vector3<f64>,
    update_kinematics: bool,
) -> Vector3<f64> {
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), None, None);
    }
    let x = &data.x_base[body];
    x.e * (point_base - x.r)
}

/// Velocity of a body-fixed point, base coordinates.
#[must_use]
pub fn calc_point_velocity(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    body: usize,
    point: &Vector3<f64>,
    update_kinematics: bool,
) -> Vector3<f64> {
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), Some(qdot), None);
    }
    let p = calc_body_to_base_coordinates(model, data, q, body, point, false);
    let (w, v_o) = split(&data.x_base[body].inverse_apply(&data.v[body]));
    v_o + w.cross(&p)
}

/// Classical (non-spatial) acceleration of a body-fixed point, base coordinates.
///
/// Reads `v` and `a`; `a` must hold kinematic accelerations (base acceleration
/// zero), as written by [`update_kinematics_custom`] with `qddot`. With
/// `update_kinematics`, all three levels are recomputed from the arguments.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn calc_point_acceleration(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    qdot: &[f64],
    qddot: &[f64],
    body: usize,
    point: &Vector3<f64>,
    update_kinematics: bool,
) -> Vector3<f64> {
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), Some(qdot), Some(qddot));
    }
    let x = data.x_base[body];
    let p = x.e.transpose() * point + x.r;
    let (w, v_o) = split(&x.inverse_apply(&data.v[body]));
    let (dw, a_o) = split(&x.inverse_apply(&data.a[body]));
    a_o + dw.cross(&p) + w.cross(&(v_o + w.cross(&p)))
}
