//! Model struct definition and tree construction.
//!
//! [`Model`] is the static description of the kinematic tree: parent indices,
//! joints, fixed joint-frame transforms and body inertias. It never changes
//! during a solve; everything that does lives in [`Data`](super::Data).

use nalgebra::Vector3;

use super::body::Body;
use super::enums::{Joint, JointType};
use crate::dynamics::{SpatialMatrix, SpatialTransform};

/// Standard gravity (m/s²), acting along world −z by default.
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Static kinematic tree definition.
///
/// # Memory Layout
///
/// Arrays are indexed by their respective IDs:
/// - `body_*` arrays indexed by `body_id` (0 = world)
/// - `dof_*` arrays indexed by `dof_id` (velocity dimension index)
///
/// Bodies are stored in topological order: `body_parent[i] < i` for every
/// `i > 0`, so a forward loop visits parents before children and a reverse
/// loop visits children before parents.
#[derive(Debug, Clone)]
pub struct Model {
    // ==================== Metadata ====================
    /// Model name.
    pub name: String,

    // ==================== Dimensions ====================
    /// Number of generalized velocity coordinates (DOFs). Equal to the
    /// number of position coordinates for the supported joints.
    pub nv: usize,
    /// Number of bodies (including world body 0).
    pub nbody: usize,

    // ==================== Options ====================
    /// Gravity in world coordinates.
    pub gravity: Vector3<f64>,

    // ==================== Bodies ====================
    /// Parent body index (`body_parent[0] == 0`).
    pub body_parent: Vec<usize>,
    /// Joint type connecting each body to its parent.
    pub body_jnt_type: Vec<JointType>,
    /// Joint axis in joint coordinates (hinge/slide).
    pub body_jnt_axis: Vec<Vector3<f64>>,
    /// Fixed transform from the parent frame to the joint frame.
    pub body_xtree: Vec<SpatialTransform>,
    /// First DOF address of each body's joint.
    pub body_dof_adr: Vec<usize>,
    /// Number of DOFs of each body's joint.
    pub body_dof_num: Vec<usize>,
    /// Body mass.
    pub body_mass: Vec<f64>,
    /// Centre of mass in body coordinates.
    pub body_com: Vec<Vector3<f64>>,
    /// Spatial inertia about the body origin, body coordinates.
    pub body_inertia: Vec<SpatialMatrix>,
    /// Optional body name.
    pub body_name: Vec<Option<String>>,

    // ==================== DOFs ====================
    /// Body owning each DOF.
    pub dof_body: Vec<usize>,
    /// Parent DOF in the tree (`None` for DOFs attached to the world).
    pub dof_parent: Vec<Option<usize>>,

    // ==================== Sparse factorization layout ====================
    /// CSR row start for each DOF row of the L^T D L factor.
    pub qld_rowadr: Vec<usize>,
    /// Entries per row (ancestors + diagonal).
    pub qld_rownnz: Vec<usize>,
    /// Column indices (ancestors ascending, diagonal last).
    pub qld_colind: Vec<usize>,
    /// Total non-zeros of the factor.
    pub qld_nnz: usize,
}

impl Default for Model {
    fn default() -> Self {
        Self::new()
    }
}

impl Model {
    /// Create a model containing only the world body, with standard gravity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: String::new(),
            nv: 0,
            nbody: 1,
            gravity: Vector3::new(0.0, 0.0, -STANDARD_GRAVITY),
            body_parent: vec![0],
            body_jnt_type: vec![JointType::Fixed],
            body_jnt_axis: vec![Vector3::zeros()],
            body_xtree: vec![SpatialTransform::identity()],
            body_dof_adr: vec![0],
            body_dof_num: vec![0],
            body_mass: vec![0.0],
            body_com: vec![Vector3::zeros()],
            body_inertia: vec![SpatialMatrix::zeros()],
            body_name: vec![Some("world".to_string())],
            dof_body: Vec::new(),
            dof_parent: Vec::new(),
            qld_rowadr: Vec::new(),
            qld_rownnz: Vec::new(),
            qld_colind: Vec::new(),
            qld_nnz: 0,
        }
    }

    /// Append a body to the tree and return its index.
    ///
    /// `xtree` places the joint frame in the parent's frame; the body frame
    /// coincides with the joint frame at zero joint coordinates.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not name an existing body.
    pub fn add_body(&mut self, parent: usize, xtree: SpatialTransform, joint: Joint, body: Body) -> usize {
        assert!(
            parent < self.nbody,
            "parent body {parent} does not exist (nbody = {})",
            self.nbody
        );

        let body_id = self.nbody;
        let ndof = joint.jnt_type.nv();

        self.body_parent.push(parent);
        self.body_jnt_type.push(joint.jnt_type);
        self.body_jnt_axis.push(joint.axis);
        self.body_xtree.push(xtree);
        self.body_dof_adr.push(self.nv);
        self.body_dof_num.push(ndof);
        self.body_mass.push(body.mass);
        self.body_com.push(body.com);
        self.body_inertia.push(body.spatial_inertia());
        self.body_name.push(None);

        // DOF parent chain: first DOF hangs off the nearest ancestor DOF,
        // further DOFs of the same joint chain onto the previous one.
        let mut ancestor_dof = None;
        let mut p = parent;
        while p != 0 {
            if self.body_dof_num[p] > 0 {
                ancestor_dof = Some(self.body_dof_adr[p] + self.body_dof_num[p] - 1);
                break;
            }
            p = self.body_parent[p];
        }
        for k in 0..ndof {
            self.dof_body.push(body_id);
            self.dof_parent
                .push(if k == 0 { ancestor_dof } else { Some(self.nv + k - 1) });
        }

        self.nv += ndof;
        self.nbody += 1;
        self.compute_qld_csr_metadata();
        body_id
    }

    /// Append a named body. See [`Model::add_body`].
    pub fn add_named_body(
        &mut self,
        parent: usize,
        xtree: SpatialTransform,
        joint: Joint,
        body: Body,
        name: &str,
    ) -> usize {
        let id = self.add_body(parent, xtree, joint, body);
        self.body_name[id] = Some(name.to_string());
        id
    }

    /// Look up a body index by name.
    #[must_use]
    pub fn body_id(&self, name: &str) -> Option<usize> {
        self.body_name
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }

    /// Returns CSR metadata for the sparse LDL factorization: `(rowadr, rownnz, colind)`.
    #[inline]
    #[must_use]
    pub fn qld_csr(&self) -> (&[usize], &[usize], &[usize]) {
        (&self.qld_rowadr, &self.qld_rownnz, &self.qld_colind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dof_parent_skips_fixed_bodies() {
        let mut model = Model::new();
        let a = model.add_body(0, SpatialTransform::identity(), Joint::translation(), Body::massless());
        let b = model.add_body(a, SpatialTransform::identity(), Joint::fixed(), Body::massless());
        let c = model.add_named_body(
            b,
            SpatialTransform::identity(),
            Joint::hinge(Vector3::y()),
            Body::new(1.0, Vector3::zeros(), Vector3::new(1.0, 1.0, 1.0)),
            "arm",
        );

        assert_eq!(model.nv, 4);
        assert_eq!(model.nbody, 4);
        assert_eq!(model.dof_parent, vec![None, Some(0), Some(1), Some(2)]);
        assert_eq!(model.body_dof_adr[c], 3);
        assert_eq!(model.body_dof_num[b], 0);
        assert_eq!(model.body_id("arm"), Some(c));
        assert_eq!(model.body_id("missing"), None);
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn add_body_rejects_unknown_parent() {
        let mut model = Model::new();
        model.add_body(3, SpatialTransform::identity(), Joint::fixed(), Body::massless());
    }
}
