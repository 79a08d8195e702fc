//! Composite Rigid Body Algorithm for mass matrix computation.
//!
//! Implements CRBA (Featherstone Chapter 6) to build the joint-space inertia
//! matrix `H` from body spatial inertias.

use nalgebra::{DMatrix, Matrix6x3};

use crate::kinematics::update_kinematics_custom;
use crate::types::{Data, Model};

/// Composite Rigid Body Algorithm: build the joint-space inertia matrix.
///
/// ## Algorithm Overview
///
/// 1. Initialize composite inertias from body spatial inertias
/// 2. Backward pass: `Ic[parent] += X_λᵀ · Ic[child] · X_λ`
/// 3. For each joint, `F = Ic · S`; walk `F` up the chain to fill the
///    off-diagonal blocks
///
/// Reads `x_lambda` and `s`; writes `crb_inertia`. With `update_kinematics`
/// the transforms are recomputed from `q` first.
///
/// Reference: Featherstone, "Rigid Body Dynamics Algorithms", Table 6.2
///
/// # Panics
///
/// Panics if `h` is not `nv × nv`.
#[allow(clippy::similar_names, clippy::needless_range_loop)]
pub fn composite_rigid_body_algorithm(
    model: &Model,
    data: &mut Data,
    q: &[f64],
    h: &mut DMatrix<f64>,
    update_kinematics: bool,
) {
    assert_eq!(h.shape(), (model.nv, model.nv), "mass matrix must be nv × nv");
    if update_kinematics {
        update_kinematics_custom(model, data, Some(q), None, None);
    }

    h.fill(0.0);
    if model.nv == 0 {
        return;
    }

    // ============================================================
    // Phase 1: composite inertias, leaves to root
    // ============================================================
    data.crb_inertia.copy_from_slice(&model.body_inertia);
    for i in (1..model.nbody).rev() {
        let parent = model.body_parent[i];
        if parent != 0 {
            let x = data.x_lambda[i].to_matrix();
            let shifted = x.transpose() * data.crb_inertia[i] * x;
            data.crb_inertia[parent] += shifted;
        }
    }

    // ============================================================
    // Phase 2: fill H from composite inertias
    // ============================================================
    for i in 1..model.nbody {
        let ni = model.body_dof_num[i];
        if ni == 0 {
            continue;
        }
        let adr_i = model.body_dof_adr[i];

        let mut f: Matrix6x3<f64> = data.crb_inertia[i] * data.s[i];
        let diag = data.s[i].transpose() * f;
        for a in 0..ni {
            for b in 0..ni {
                h[(adr_i + a, adr_i + b)] = diag[(a, b)];
            }
        }

        let mut j = i;
        while model.body_parent[j] != 0 {
            for col in 0..3 {
                let moved = data.x_lambda[j].apply_transpose(&f.column(col).into_owned());
                f.set_column(col, &moved);
            }
            j = model.body_parent[j];

            let nj = model.body_dof_num[j];
            let adr_j = model.body_dof_adr[j];
            let block = f.transpose() * data.s[j];
            for a in 0..ni {
                for b in 0..nj {
                    h[(adr_i + a, adr_j + b)] = block[(a, b)];
                    h[(adr_j + b, adr_i + a)] = block[(a, b)];
                }
            }
        }
    }
}
