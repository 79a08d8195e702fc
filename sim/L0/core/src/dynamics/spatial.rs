//! Spatial algebra utilities for 6D motion and force vectors.
//!
//! Implements Featherstone's spatial vector algebra in body coordinates, as
//! used by the recursive algorithms (CRBA, RNEA, ABA) and the kinematic
//! queries. Functions here are pure math with no model or data dependencies.

use std::ops::Mul;

use nalgebra::{Matrix3, Matrix6, Rotation3, Unit, Vector3, Vector6};

/// 6D spatial vector: [angular (3), linear (3)].
///
/// Following Featherstone's convention:
/// - Motion vectors: [ω, v] (angular velocity, linear velocity of the origin)
/// - Force vectors: [τ, f] (torque about the origin, force)
pub type SpatialVector = Vector6<f64>;

/// 6×6 spatial matrix (inertias, transform matrices).
pub type SpatialMatrix = Matrix6<f64>;

/// Skew-symmetric cross-product matrix: `skew(a) * b == a × b`.
#[inline]
#[must_use]
pub fn skew(a: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -a.z, a.y, a.z, 0.0, -a.x, -a.y, a.x, 0.0)
}

/// Spatial cross product for motion vectors: v × s.
#[allow(clippy::inline_always)] // Profiling shows inlining improves debug performance
#[inline(always)]
#[must_use]
pub fn spatial_cross_motion(v: SpatialVector, s: SpatialVector) -> SpatialVector {
    let w = Vector3::new(v[0], v[1], v[2]);
    let v_lin = Vector3::new(v[3], v[4], v[5]);
    let s_ang = Vector3::new(s[0], s[1], s[2]);
    let s_lin = Vector3::new(s[3], s[4], s[5]);

    let result_ang = w.cross(&s_ang);
    let result_lin = w.cross(&s_lin) + v_lin.cross(&s_ang);

    SpatialVector::new(
        result_ang.x,
        result_ang.y,
        result_ang.z,
        result_lin.x,
        result_lin.y,
        result_lin.z,
    )
}

/// Spatial cross product for force vectors: v ×* f.
#[allow(clippy::inline_always)] // Profiling shows inlining improves debug performance
#[inline(always)]
#[must_use]
pub fn spatial_cross_force(v: SpatialVector, f: SpatialVector) -> SpatialVector {
    let w = Vector3::new(v[0], v[1], v[2]);
    let v_lin = Vector3::new(v[3], v[4], v[5]);
    let f_ang = Vector3::new(f[0], f[1], f[2]);
    let f_lin = Vector3::new(f[3], f[4], f[5]);

    let result_ang = w.cross(&f_ang) + v_lin.cross(&f_lin);
    let result_lin = w.cross(&f_lin);

    SpatialVector::new(
        result_ang.x,
        result_ang.y,
        result_ang.z,
        result_lin.x,
        result_lin.y,
        result_lin.z,
    )
}

/// Split a spatial vector into its angular and linear halves.
#[inline]
#[must_use]
pub fn split(v: &SpatialVector) -> (Vector3<f64>, Vector3<f64>) {
    (
        Vector3::new(v[0], v[1], v[2]),
        Vector3::new(v[3], v[4], v[5]),
    )
}

/// Join angular and linear halves into a spatial vector.
#[inline]
#[must_use]
pub fn join(ang: &Vector3<f64>, lin: &Vector3<f64>) -> SpatialVector {
    SpatialVector::new(ang.x, ang.y, ang.z, lin.x, lin.y, lin.z)
}

/// Build a body spatial inertia about the body origin, in body coordinates.
///
/// - `mass`: body mass
/// - `com`: centre of mass in body coordinates
/// - `inertia_com`: rotational inertia about the COM, body axes
///
/// The spatial inertia has the form:
/// ```text
/// I = [I_c + m*(c·c*I - c⊗c),  m*[c]×  ]
///     [m*[c]×ᵀ,                m*I_3×3 ]
/// ```
#[must_use]
pub fn compute_body_spatial_inertia(
    mass: f64,
    com: &Vector3<f64>,
    inertia_com: &Matrix3<f64>,
) -> SpatialMatrix {
    let mut inertia = SpatialMatrix::zeros();

    // Upper-left 3x3: rotational inertia about body origin (parallel axis theorem)
    let c_dot_c = com.dot(com);
    for row in 0..3 {
        for col in 0..3 {
            let delta = if row == col { 1.0 } else { 0.0 };
            inertia[(row, col)] = inertia_com[(row, col)] + mass * (c_dot_c * delta - com[row] * com[col]);
        }
    }

    // Lower-right 3x3: translational inertia (diagonal mass matrix)
    inertia[(3, 3)] = mass;
    inertia[(4, 4)] = mass;
    inertia[(5, 5)] = mass;

    // Off-diagonal coupling: m*[c]× upper-right, its transpose lower-left
    let mc = skew(com) * mass;
    for row in 0..3 {
        for col in 0..3 {
            inertia[(row, col + 3)] = mc[(row, col)];
            inertia[(col + 3, row)] = mc[(row, col)];
        }
    }

    inertia
}

/// Plücker coordinate transform between two frames.
///
/// `e` rotates vectors from the source (parent) frame into the target (child)
/// frame; `r` is the target origin expressed in source coordinates. Composition
/// follows Featherstone: `(x1 * x2).apply(v) == x1.apply(x2.apply(v))`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpatialTransform {
    /// Coordinate rotation, source → target.
    pub e: Matrix3<f64>,
    /// Target origin in source coordinates.
    pub r: Vector3<f64>,
}

impl Default for SpatialTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl SpatialTransform {
    /// Create a transform from a coordinate rotation and a translation.
    #[must_use]
    pub fn new(e: Matrix3<f64>, r: Vector3<f64>) -> Self {
        Self { e, r }
    }

    /// Identity transform.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            e: Matrix3::identity(),
            r: Vector3::zeros(),
        }
    }

    /// Pure translation: the target origin sits at `r` in source coordinates.
    #[must_use]
    pub fn translation(r: Vector3<f64>) -> Self {
        Self {
            e: Matrix3::identity(),
            r,
        }
    }

    /// Pure rotation of the target frame by `angle` about `axis` (source coordinates).
    ///
    /// The stored `e` is the coordinate transform, i.e. the transpose of the
    /// active rotation (Featherstone's `rx`, `ry`, `rz`).
    #[must_use]
    pub fn rotation(axis: &Vector3<f64>, angle: f64) -> Self {
        let rot = Rotation3::from_axis_angle(&Unit::new_normalize(*axis), angle);
        Self {
            e: rot.matrix().transpose(),
            r: Vector3::zeros(),
        }
    }

    /// Transform a motion vector from source to target coordinates.
    #[inline]
    #[must_use]
    pub fn apply(&self, v: &SpatialVector) -> SpatialVector {
        let (w, lin) = split(v);
        join(&(self.e * w), &(self.e * (lin - self.r.cross(&w))))
    }

    /// Transform a motion vector from target back to source coordinates.
    #[inline]
    #[must_use]
    pub fn inverse_apply(&self, v: &SpatialVector) -> SpatialVector {
        let (w, lin) = split(v);
        let w_src = self.e.transpose() * w;
        join(&w_src, &(self.e.transpose() * lin + self.r.cross(&w_src)))
    }

    /// Transform a force vector from target to source coordinates (`Xᵀ f`).
    #[inline]
    #[must_use]
    pub fn apply_transpose(&self, f: &SpatialVector) -> SpatialVector {
        let (n, lin) = split(f);
        let f_src = self.e.transpose() * lin;
        join(&(self.e.transpose() * n + self.r.cross(&f_src)), &f_src)
    }

    /// Transform a force vector from source to target coordinates (`X* f`).
    #[inline]
    #[must_use]
    pub fn apply_adjoint(&self, f: &SpatialVector) -> SpatialVector {
        let (n, lin) = split(f);
        join(&(self.e * (n - self.r.cross(&lin))), &(self.e * lin))
    }

    /// Dense 6×6 motion transform `[[E, 0], [-E[r]×, E]]`.
    #[must_use]
    pub fn to_matrix(&self) -> SpatialMatrix {
        let erx = self.e * skew(&self.r);
        let mut m = SpatialMatrix::zeros();
        for row in 0..3 {
            for col in 0..3 {
                m[(row, col)] = self.e[(row, col)];
                m[(row + 3, col + 3)] = self.e[(row, col)];
                m[(row + 3, col)] = -erx[(row, col)];
            }
        }
        m
    }

    /// Inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            e: self.e.transpose(),
            r: -(self.e * self.r),
        }
    }
}

impl Mul for SpatialTransform {
    type Output = Self;

    /// `self * rhs` applies `rhs` first, then `self`.
    fn mul(self, rhs: Self) -> Self {
        Self {
            e: self.e * rhs.e,
            r: rhs.r + rhs.e.transpose() * self.r,
        }
    }
}
