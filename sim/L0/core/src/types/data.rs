//! Data struct definition and allocation.
//!
//! [`Data`] holds every per-body quantity the recursive algorithms compute:
//! kinematic transforms, spatial velocities and accelerations, and the
//! articulated-body intermediates that the contact solvers reuse. One `Data`
//! is created per simulation environment via [`Model::make_data`].

use nalgebra::{Matrix3, Matrix6x3, Vector3};

use super::model::Model;
use crate::dynamics::{SpatialMatrix, SpatialTransform, SpatialVector};

/// Per-body recursive state (mutable counterpart to [`Model`]).
///
/// All arrays are pre-allocated by [`Model::make_data`]; no algorithm in this
/// crate resizes them. Fields are overwritten in place, so an algorithm's
/// outputs are only valid until the next algorithm that writes the same
/// fields runs. Each algorithm documents its read/write set.
///
/// Multi-DOF quantities use fixed 6×3 / 3×3 blocks padded with zeros beyond
/// the joint's DOF count.
#[derive(Debug, Clone)]
pub struct Data {
    // ==================== Kinematics ====================
    /// Parent → body transform `X_λ(i) = X_J · X_tree`.
    pub x_lambda: Vec<SpatialTransform>,
    /// Base (world) → body transform.
    pub x_base: Vec<SpatialTransform>,
    /// Joint motion subspace in body coordinates.
    pub s: Vec<Matrix6x3<f64>>,
    /// Body spatial velocity, body coordinates.
    pub v: Vec<SpatialVector>,
    /// Velocity-product acceleration `v ×ₘ v_J`, body coordinates.
    pub c: Vec<SpatialVector>,
    /// Body spatial acceleration, body coordinates. Holds the gravity offset
    /// (`a[0] = −g`) after RNEA/ABA, and pure kinematic acceleration after
    /// [`update_kinematics_custom`](crate::update_kinematics_custom).
    pub a: Vec<SpatialVector>,
    /// Net body force from RNEA, body coordinates.
    pub f: Vec<SpatialVector>,

    // ==================== Articulated-body intermediates ====================
    /// Articulated inertia `I^A`, complete for body `i` once ABA's backward
    /// pass has passed `i`.
    pub ia: Vec<SpatialMatrix>,
    /// Articulated bias force `p^A`.
    pub pa: Vec<SpatialVector>,
    /// `U = I^A · S`.
    pub ua: Vec<Matrix6x3<f64>>,
    /// `D⁻¹ = (Sᵀ · U)⁻¹`, inverted on the joint's DOF block only.
    pub dinv: Vec<Matrix3<f64>>,
    /// `u = τ − Sᵀ · p^A`.
    pub u: Vec<Vector3<f64>>,

    // ==================== Composite inertia ====================
    /// Composite rigid-body inertia of each subtree (CRBA scratch).
    pub crb_inertia: Vec<SpatialMatrix>,

    // ==================== Sparse factorization ====================
    /// L^T D L factor in CSR layout (see [`Model::qld_csr`]).
    pub qld_data: Vec<f64>,
    /// Inverse diagonal `1/D[i]` of the factor.
    pub qld_diag_inv: Vec<f64>,
    /// Whether `qld_data` holds a valid factorization.
    pub qld_valid: bool,
}

impl Model {
    /// Allocate a [`Data`] sized for this model.
    #[must_use]
    pub fn make_data(&self) -> Data {
        let s = (0..self.nbody)
            .map(|i| self.body_jnt_type[i].motion_subspace(&self.body_jnt_axis[i]))
            .collect();

        Data {
            x_lambda: vec![SpatialTransform::identity(); self.nbody],
            x_base: vec![SpatialTransform::identity(); self.nbody],
            s,
            v: vec![SpatialVector::zeros(); self.nbody],
            c: vec![SpatialVector::zeros(); self.nbody],
            a: vec![SpatialVector::zeros(); self.nbody],
            f: vec![SpatialVector::zeros(); self.nbody],
            ia: vec![SpatialMatrix::zeros(); self.nbody],
            pa: vec![SpatialVector::zeros(); self.nbody],
            ua: vec![Matrix6x3::zeros(); self.nbody],
            dinv: vec![Matrix3::zeros(); self.nbody],
            u: vec![Vector3::zeros(); self.nbody],
            crb_inertia: vec![SpatialMatrix::zeros(); self.nbody],
            qld_data: vec![0.0; self.qld_nnz],
            qld_diag_inv: vec![0.0; self.nv],
            qld_valid: false,
        }
    }
}
