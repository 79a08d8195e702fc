//! Factory methods for common mechanical systems.
//!
//! These constructors produce pre-configured [`Model`] instances for
//! canonical test systems (pendulums, floating bodies, legged trees). Used by
//! inline tests, the contact solver tests and the benchmarks.

use nalgebra::Vector3;

use super::body::Body;
use super::enums::Joint;
use super::model::Model;
use crate::dynamics::SpatialTransform;

/// Half thickness of pendulum links and legs.
const LINK_HALF_WIDTH: f64 = 0.05;

impl Model {
    /// Create an n-link serial pendulum (hinge joints only).
    ///
    /// Each link is a slender box hanging along −z from a hinge about +y, with
    /// its COM at the link midpoint. The next link's hinge sits at the end of
    /// the previous link. All joints at zero hang straight down.
    ///
    /// # Panics
    /// Panics if `n` is 0 (requires at least 1 link).
    #[must_use]
    pub fn n_link_pendulum(n: usize, link_length: f64, link_mass: f64) -> Self {
        assert!(n >= 1, "n_link_pendulum requires at least 1 link");

        let mut model = Self::new();
        model.name = format!("{n}_link_pendulum");

        let link = Body {
            com: Vector3::new(0.0, 0.0, -0.5 * link_length),
            ..Body::solid_box(
                link_mass,
                Vector3::new(LINK_HALF_WIDTH, LINK_HALF_WIDTH, 0.5 * link_length),
            )
        };

        let mut parent = 0;
        for i in 0..n {
            let xtree = if i == 0 {
                SpatialTransform::identity()
            } else {
                SpatialTransform::translation(Vector3::new(0.0, 0.0, -link_length))
            };
            parent = model.add_named_body(parent, xtree, Joint::hinge(Vector3::y()), link, &format!("link_{i}"));
        }
        model
    }

    /// Create a free-floating box with six DOFs.
    ///
    /// Three translation DOFs followed by hinges about z, y and x, chained
    /// through massless intermediate bodies. The last body (named `"box"`)
    /// carries the mass. All coordinates zero puts the box at the origin.
    #[must_use]
    pub fn floating_box(mass: f64, half_extents: Vector3<f64>) -> Self {
        let mut model = Self::new();
        model.name = "floating_box".to_string();

        let id = SpatialTransform::identity();
        let trans = model.add_body(0, id, Joint::translation(), Body::massless());
        let yaw = model.add_body(trans, id, Joint::hinge(Vector3::z()), Body::massless());
        let pitch = model.add_body(yaw, id, Joint::hinge(Vector3::y()), Body::massless());
        model.add_named_body(
            pitch,
            id,
            Joint::hinge(Vector3::x()),
            Body::solid_box(mass, half_extents),
            "box",
        );
        model
    }

    /// Create a branched tree: a translating torso with two two-link legs.
    ///
    /// ```text
    /// torso (3-DOF translation)
    /// ├── left_thigh (hinge y) ── left_shin (hinge y) ── left_foot (fixed)
    /// └── right_thigh (hinge y) ── right_shin (hinge y) ── right_foot (fixed)
    /// ```
    ///
    /// Feet are rigidly attached point-contact carriers; their origins sit at
    /// the bottom of the shins. With all coordinates zero the feet are at
    /// `z = −1.1`, `y = ±0.1`.
    #[must_use]
    pub fn branched_tree() -> Self {
        const SEGMENT: f64 = 0.4;

        let mut model = Self::new();
        model.name = "branched_tree".to_string();

        let torso = model.add_named_body(
            0,
            SpatialTransform::identity(),
            Joint::translation(),
            Body::solid_box(4.0, Vector3::new(0.15, 0.2, 0.3)),
            "torso",
        );

        let segment = Body {
            com: Vector3::new(0.0, 0.0, -0.5 * SEGMENT),
            ..Body::solid_box(1.0, Vector3::new(LINK_HALF_WIDTH, LINK_HALF_WIDTH, 0.5 * SEGMENT))
        };
        let foot = Body::solid_box(0.3, Vector3::new(0.1, 0.05, 0.02));
        let below = SpatialTransform::translation(Vector3::new(0.0, 0.0, -SEGMENT));

        for (side, y) in [("left", 0.1), ("right", -0.1)] {
            let thigh = model.add_named_body(
                torso,
                SpatialTransform::translation(Vector3::new(0.0, y, -0.3)),
                Joint::hinge(Vector3::y()),
                segment,
                &format!("{side}_thigh"),
            );
            let shin = model.add_named_body(thigh, below, Joint::hinge(Vector3::y()), segment, &format!("{side}_shin"));
            model.add_named_body(shin, below, Joint::fixed(), foot, &format!("{side}_foot"));
        }
        model
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn factory_dimensions() {
        let pendulum = Model::n_link_pendulum(3, 1.0, 1.0);
        assert_eq!((pendulum.nbody, pendulum.nv), (4, 3));
        assert_eq!(pendulum.body_id("link_2"), Some(3));

        let floating = Model::floating_box(1.0, Vector3::new(0.1, 0.1, 0.1));
        assert_eq!((floating.nbody, floating.nv), (5, 6));
        assert_eq!(floating.body_id("box"), Some(4));

        let tree = Model::branched_tree();
        assert_eq!((tree.nbody, tree.nv), (8, 7));
        let left_foot = tree.body_id("left_foot").unwrap();
        assert_eq!(tree.body_dof_num[left_foot], 0);
    }

    #[test]
    #[should_panic(expected = "at least 1 link")]
    fn empty_pendulum_is_rejected() {
        let _ = Model::n_link_pendulum(0, 1.0, 1.0);
    }
}
