//! Enums and error types shared by the articulated-body pipeline.

use nalgebra::{Matrix6x3, Vector3};
use thiserror::Error;

use crate::dynamics::SpatialTransform;

/// Joint connecting a body to its parent.
///
/// All supported joints have a motion subspace that is constant in the joint
/// frame, so the joint bias acceleration `c_J` is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointType {
    /// Rigid attachment (0 DOF). The body moves with its parent.
    Fixed,
    /// Hinge joint (1 DOF): rotation about a single axis.
    #[default]
    Hinge,
    /// Slide joint (1 DOF): translation along a single axis.
    Slide,
    /// Translation along x, y and z (3 DOF), in that order.
    Translation,
}

impl JointType {
    /// Number of velocity coordinates / DOFs (nv contribution).
    #[must_use]
    pub const fn nv(self) -> usize {
        match self {
            Self::Fixed => 0,
            Self::Hinge | Self::Slide => 1,
            Self::Translation => 3,
        }
    }

    /// Motion subspace `S` in joint coordinates, padded to three columns.
    ///
    /// Columns beyond [`JointType::nv`] are zero, which lets the recursive
    /// algorithms treat every joint with the same fixed-size 6×3 block.
    #[must_use]
    pub fn motion_subspace(self, axis: &Vector3<f64>) -> Matrix6x3<f64> {
        let mut s = Matrix6x3::zeros();
        match self {
            Self::Fixed => {}
            Self::Hinge => {
                for k in 0..3 {
                    s[(k, 0)] = axis[k];
                }
            }
            Self::Slide => {
                for k in 0..3 {
                    s[(k + 3, 0)] = axis[k];
                }
            }
            Self::Translation => {
                for k in 0..3 {
                    s[(k + 3, k)] = 1.0;
                }
            }
        }
        s
    }

    /// Joint transform `X_J(q)` for the joint coordinates `q[adr..adr + nv]`.
    #[must_use]
    pub fn joint_transform(self, axis: &Vector3<f64>, q: &[f64]) -> SpatialTransform {
        match self {
            Self::Fixed => SpatialTransform::identity(),
            Self::Hinge => SpatialTransform::rotation(axis, q[0]),
            Self::Slide => SpatialTransform::translation(axis * q[0]),
            Self::Translation => SpatialTransform::translation(Vector3::new(q[0], q[1], q[2])),
        }
    }
}

/// Joint definition passed to [`Model::add_body`](crate::Model::add_body).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Joint {
    /// Joint type.
    pub jnt_type: JointType,
    /// Unit axis in joint coordinates (hinge/slide only).
    pub axis: Vector3<f64>,
}

impl Joint {
    /// Rigid attachment.
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            jnt_type: JointType::Fixed,
            axis: Vector3::zeros(),
        }
    }

    /// Hinge about `axis` (normalized).
    #[must_use]
    pub fn hinge(axis: Vector3<f64>) -> Self {
        Self {
            jnt_type: JointType::Hinge,
            axis: axis.normalize(),
        }
    }

    /// Slide along `axis` (normalized).
    #[must_use]
    pub fn slide(axis: Vector3<f64>) -> Self {
        Self {
            jnt_type: JointType::Slide,
            axis: axis.normalize(),
        }
    }

    /// Three-DOF translation along the joint frame axes.
    #[must_use]
    pub fn translation() -> Self {
        Self {
            jnt_type: JointType::Translation,
            axis: Vector3::zeros(),
        }
    }
}

/// Errors from the articulated-body recursions and the sparse factorization.
///
/// Following Rust idioms, these algorithms return `Result` instead of
/// silently producing non-finite accelerations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum StepError {
    /// A joint's articulated inertia `Sᵀ·IA·S` is singular (e.g. a massless leaf).
    #[error("articulated inertia of body {body} is singular")]
    SingularArticulatedInertia {
        /// Body whose joint-space inertia block could not be inverted.
        body: usize,
    },
    /// The sparse L^T D L factorization hit a non-positive pivot.
    #[error("mass matrix is not positive definite (pivot at DOF {dof})")]
    MassMatrixNotPositiveDefinite {
        /// DOF whose pivot was non-positive.
        dof: usize,
    },
    /// Dense Cholesky decomposition failed.
    #[error("Cholesky decomposition failed")]
    CholeskyFailed,
    /// LU or Gaussian elimination hit a pivot below tolerance.
    #[error("matrix is singular to working precision")]
    SingularMatrix,
}
