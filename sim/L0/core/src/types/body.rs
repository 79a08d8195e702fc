//! Rigid body mass properties.

use nalgebra::{Matrix3, Vector3};

use crate::dynamics::{SpatialMatrix, compute_body_spatial_inertia};

/// Mass properties of a rigid body in its own frame.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Body {
    /// Mass (kg). Zero for virtual bodies inside multi-joint chains.
    pub mass: f64,
    /// Centre of mass in body coordinates.
    pub com: Vector3<f64>,
    /// Rotational inertia about the centre of mass, body axes.
    pub inertia: Matrix3<f64>,
}

impl Body {
    /// Body with a diagonal inertia about its COM.
    #[must_use]
    pub fn new(mass: f64, com: Vector3<f64>, inertia_diag: Vector3<f64>) -> Self {
        Self {
            mass,
            com,
            inertia: Matrix3::from_diagonal(&inertia_diag),
        }
    }

    /// Massless body. Only valid when it carries a massive subtree.
    #[must_use]
    pub fn massless() -> Self {
        Self {
            mass: 0.0,
            com: Vector3::zeros(),
            inertia: Matrix3::zeros(),
        }
    }

    /// Solid box with the given half extents, COM at the body origin.
    #[must_use]
    pub fn solid_box(mass: f64, half_extents: Vector3<f64>) -> Self {
        let (x, y, z) = (2.0 * half_extents.x, 2.0 * half_extents.y, 2.0 * half_extents.z);
        let k = mass / 12.0;
        Self::new(
            mass,
            Vector3::zeros(),
            Vector3::new(k * (y * y + z * z), k * (x * x + z * z), k * (x * x + y * y)),
        )
    }

    /// Spatial inertia about the body origin in body coordinates.
    #[must_use]
    pub fn spatial_inertia(&self) -> SpatialMatrix {
        compute_body_spatial_inertia(self.mass, &self.com, &self.inertia)
    }
}
