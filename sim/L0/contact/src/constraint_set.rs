//! The constraint set: point-contact definitions plus solve-time scratch.
//!
//! A [`ConstraintSet`] goes through two phases. While unbound, constraints
//! are appended with [`ConstraintSet::add_constraint`]. [`ConstraintSet::bind`]
//! then sizes every buffer the solvers need for one model, after which the
//! set can be solved any number of times without allocating. Definitions are
//! frozen once bound; targets (`acceleration`, `v_plus`) stay writable.

use nalgebra::{DMatrix, DVector, Vector3};
use sim_core::{Model, SpatialVector};
use tracing::debug;

use crate::config::ContactSolverConfig;
use crate::error::ConstraintError;
use crate::jacobian::Contacts;
use crate::linear_solver::LinearSolver;

/// Ordered set of point constraints on a kinematic tree.
///
/// Constraint `i` requires the component along `normal(i)` (world
/// coordinates) of the acceleration of the body-fixed point `point(i)` on
/// `body(i)` to equal `acceleration(i)`, or, for impulses, the normal
/// velocity after impact to equal `v_plus(i)`.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    // Definitions, frozen at bind.
    pub(crate) body: Vec<usize>,
    pub(crate) point: Vec<Vector3<f64>>,
    pub(crate) normal: Vec<Vector3<f64>>,
    name: Vec<Option<String>>,

    // Per-step targets.
    pub(crate) acceleration: Vec<f64>,
    pub(crate) v_plus: Vec<f64>,

    // Solved outputs.
    pub(crate) force: Vec<f64>,
    pub(crate) impulse: Vec<f64>,

    config: ContactSolverConfig,
    bound: bool,
    bound_nv: usize,
    bound_nbody: usize,

    // ==================== Solve-time scratch ====================
    /// Joint-space inertia matrix (nv × nv).
    pub(crate) h: DMatrix<f64>,
    /// Bias forces `C(q, q̇)` (nv).
    pub(crate) c: DVector<f64>,
    /// Contact Jacobian (m × nv).
    pub(crate) g: DMatrix<f64>,
    /// Velocity-product normal accelerations minus targets (m).
    pub(crate) gamma: DVector<f64>,
    /// KKT matrix ((nv + m) × (nv + m)).
    pub(crate) a_kkt: DMatrix<f64>,
    /// KKT right-hand side.
    pub(crate) b_kkt: DVector<f64>,
    /// KKT solution.
    pub(crate) x_kkt: DVector<f64>,
    /// Reduced constraint-space operator (m × m).
    pub(crate) k: DMatrix<f64>,
    /// Reduced right-hand side (m).
    pub(crate) a: DVector<f64>,
    /// Reduced solution (m).
    pub(crate) lambda: DVector<f64>,
    /// Unconstrained accelerations (nv).
    pub(crate) qddot_0: DVector<f64>,
    /// Acceleration response to the current probe force (nv).
    pub(crate) qddot_t: DVector<f64>,
    /// All-zero accelerations (nv).
    pub(crate) qddot_zero: DVector<f64>,
    /// Unit probe force per constraint, base coordinates.
    pub(crate) f_t: Vec<SpatialVector>,
    /// Accumulated constraint forces per body, base coordinates.
    pub(crate) f_ext_constraints: Vec<SpatialVector>,
    /// Contact point accelerations under `qddot_0`.
    pub(crate) point_accel_0: Vec<Vector3<f64>>,
    /// Per-body articulated bias response to a probe force.
    pub(crate) d_pa: Vec<SpatialVector>,
    /// Per-body acceleration response to a probe force.
    pub(crate) d_a: Vec<SpatialVector>,
    /// Per-body joint-space bias response to a probe force.
    pub(crate) d_u: Vec<Vector3<f64>>,
    /// `L⁻ᵀ Gᵀ` (nv × m).
    pub(crate) y: DMatrix<f64>,
    /// `D⁻¹ L⁻ᵀ Gᵀ` (nv × m).
    pub(crate) y_scaled: DMatrix<f64>,
    /// Joint-space work vector (nv).
    pub(crate) z: DVector<f64>,
    /// Point Jacobian of the current contact point (3 × nv).
    pub(crate) point_jac: DMatrix<f64>,
}

impl Default for ConstraintSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstraintSet {
    /// Create an empty, unbound set with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            body: Vec::new(),
            point: Vec::new(),
            normal: Vec::new(),
            name: Vec::new(),
            acceleration: Vec::new(),
            v_plus: Vec::new(),
            force: Vec::new(),
            impulse: Vec::new(),
            config: ContactSolverConfig::default(),
            bound: false,
            bound_nv: 0,
            bound_nbody: 0,
            h: DMatrix::zeros(0, 0),
            c: DVector::zeros(0),
            g: DMatrix::zeros(0, 0),
            gamma: DVector::zeros(0),
            a_kkt: DMatrix::zeros(0, 0),
            b_kkt: DVector::zeros(0),
            x_kkt: DVector::zeros(0),
            k: DMatrix::zeros(0, 0),
            a: DVector::zeros(0),
            lambda: DVector::zeros(0),
            qddot_0: DVector::zeros(0),
            qddot_t: DVector::zeros(0),
            qddot_zero: DVector::zeros(0),
            f_t: Vec::new(),
            f_ext_constraints: Vec::new(),
            point_accel_0: Vec::new(),
            d_pa: Vec::new(),
            d_a: Vec::new(),
            d_u: Vec::new(),
            y: DMatrix::zeros(0, 0),
            y_scaled: DMatrix::zeros(0, 0),
            z: DVector::zeros(0),
            point_jac: DMatrix::zeros(3, 0),
        }
    }

    /// Create an empty set with a validated configuration.
    ///
    /// # Errors
    ///
    /// [`ConstraintError::InvalidConfig`] if `config` fails validation.
    pub fn with_config(config: ContactSolverConfig) -> Result<Self, ConstraintError> {
        config.validate()?;
        let mut cs = Self::new();
        cs.config = config;
        Ok(cs)
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Append a contact constraint and return its index.
    ///
    /// `point` is in the coordinates of `body`; `normal` is a unit vector in
    /// base coordinates; `acceleration` is the target normal acceleration.
    ///
    /// # Panics
    ///
    /// Panics if the set is already bound.
    pub fn add_constraint(
        &mut self,
        body: usize,
        point: Vector3<f64>,
        normal: Vector3<f64>,
        name: Option<&str>,
        acceleration: f64,
    ) -> usize {
        assert!(!self.bound, "cannot add constraints to a constraint set that is already bound");
        self.body.push(body);
        self.point.push(point);
        self.normal.push(normal);
        self.name.push(name.map(str::to_owned));
        self.acceleration.push(acceleration);
        self.v_plus.push(0.0);
        self.force.push(0.0);
        self.impulse.push(0.0);
        self.body.len() - 1
    }

    /// Allocate all solve-time buffers for `model` and freeze the definitions.
    ///
    /// Returns `true` once the set is bound.
    ///
    /// # Panics
    ///
    /// Panics if the set is already bound, or a constraint references the
    /// world body or a body the model does not have.
    pub fn bind(&mut self, model: &Model) -> bool {
        assert!(!self.bound, "constraint set is already bound; bind() may only be called once");
        for (i, &b) in self.body.iter().enumerate() {
            assert!(
                b > 0 && b < model.nbody,
                "constraint {i} references body {b}, valid bodies are 1..{}",
                model.nbody
            );
        }

        let (nv, nbody, m) = (model.nv, model.nbody, self.len());
        debug!(nv, nbody, constraints = m, "binding constraint set");

        self.h = DMatrix::zeros(nv, nv);
        self.c = DVector::zeros(nv);
        self.g = DMatrix::zeros(m, nv);
        self.gamma = DVector::zeros(m);
        self.a_kkt = DMatrix::zeros(nv + m, nv + m);
        self.b_kkt = DVector::zeros(nv + m);
        self.x_kkt = DVector::zeros(nv + m);
        self.k = DMatrix::zeros(m, m);
        self.a = DVector::zeros(m);
        self.lambda = DVector::zeros(m);
        self.qddot_0 = DVector::zeros(nv);
        self.qddot_t = DVector::zeros(nv);
        self.qddot_zero = DVector::zeros(nv);
        self.f_t = vec![SpatialVector::zeros(); m];
        self.f_ext_constraints = vec![SpatialVector::zeros(); nbody];
        self.point_accel_0 = vec![Vector3::zeros(); m];
        self.d_pa = vec![SpatialVector::zeros(); nbody];
        self.d_a = vec![SpatialVector::zeros(); nbody];
        self.d_u = vec![Vector3::zeros(); nbody];
        self.y = DMatrix::zeros(nv, m);
        self.y_scaled = DMatrix::zeros(nv, m);
        self.z = DVector::zeros(nv);
        self.point_jac = DMatrix::zeros(3, nv);

        self.bound_nv = nv;
        self.bound_nbody = nbody;
        self.bound = true;
        true
    }

    /// Zero solved forces and impulses and every scratch buffer.
    ///
    /// Dimensions, definitions and the targets `acceleration` and `v_plus`
    /// are kept, so the set is ready for the next step. This differs from
    /// RBDL's `ConstraintSet::clear`, which also zeroes the target
    /// accelerations; here they persist until changed with
    /// [`ConstraintSet::set_acceleration`].
    pub fn clear(&mut self) {
        self.force.fill(0.0);
        self.impulse.fill(0.0);

        self.h.fill(0.0);
        self.c.fill(0.0);
        self.g.fill(0.0);
        self.gamma.fill(0.0);
        self.a_kkt.fill(0.0);
        self.b_kkt.fill(0.0);
        self.x_kkt.fill(0.0);
        self.k.fill(0.0);
        self.a.fill(0.0);
        self.lambda.fill(0.0);
        self.qddot_0.fill(0.0);
        self.qddot_t.fill(0.0);
        self.y.fill(0.0);
        self.y_scaled.fill(0.0);
        self.z.fill(0.0);
        self.point_jac.fill(0.0);

        self.f_t.fill(SpatialVector::zeros());
        self.f_ext_constraints.fill(SpatialVector::zeros());
        self.point_accel_0.fill(Vector3::zeros());
        self.d_pa.fill(SpatialVector::zeros());
        self.d_a.fill(SpatialVector::zeros());
        self.d_u.fill(Vector3::zeros());
    }

    /// Panic unless the set is bound to a model shaped like `model`.
    pub(crate) fn assert_bound_to(&self, model: &Model) {
        assert!(self.bound, "constraint set must be bound before solving");
        assert_eq!(
            (self.bound_nv, self.bound_nbody),
            (model.nv, model.nbody),
            "constraint set was bound to a model with a different (nv, nbody)"
        );
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    /// Number of constraints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the set holds no constraints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Whether [`ConstraintSet::bind`] has been called.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.bound
    }

    /// Body of constraint `i`.
    #[must_use]
    pub fn body(&self, i: usize) -> usize {
        self.body[i]
    }

    /// Contact point of constraint `i`, body coordinates.
    #[must_use]
    pub fn point(&self, i: usize) -> Vector3<f64> {
        self.point[i]
    }

    /// Normal of constraint `i`, base coordinates.
    #[must_use]
    pub fn normal(&self, i: usize) -> Vector3<f64> {
        self.normal[i]
    }

    /// Label of constraint `i`, if one was given.
    #[must_use]
    pub fn name(&self, i: usize) -> Option<&str> {
        self.name[i].as_deref()
    }

    /// Index of the first constraint labelled `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<usize> {
        self.name.iter().position(|n| n.as_deref() == Some(name))
    }

    /// Definitions as parallel slices for the Jacobian builders.
    pub(crate) fn contacts(&self) -> Contacts<'_> {
        (&self.body, &self.point, &self.normal)
    }

    // ========================================================================
    // Targets and results
    // ========================================================================

    /// Target normal accelerations.
    #[must_use]
    pub fn acceleration(&self) -> &[f64] {
        &self.acceleration
    }

    /// Set the target normal acceleration of constraint `i`.
    pub fn set_acceleration(&mut self, i: usize, acceleration: f64) {
        self.acceleration[i] = acceleration;
    }

    /// Target post-impact normal velocities.
    #[must_use]
    pub fn v_plus(&self) -> &[f64] {
        &self.v_plus
    }

    /// Set the target post-impact normal velocity of constraint `i`.
    pub fn set_v_plus(&mut self, i: usize, v_plus: f64) {
        self.v_plus[i] = v_plus;
    }

    /// Constraint forces from the last acceleration-level solve.
    ///
    /// A positive value pushes the contact point along its normal.
    #[must_use]
    pub fn force(&self) -> &[f64] {
        &self.force
    }

    /// Constraint impulses from the last impulse solve.
    #[must_use]
    pub fn impulse(&self) -> &[f64] {
        &self.impulse
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Solver configuration.
    #[must_use]
    pub fn config(&self) -> &ContactSolverConfig {
        &self.config
    }

    /// Selected linear-solve strategy.
    #[must_use]
    pub fn linear_solver(&self) -> LinearSolver {
        self.config.linear_solver
    }

    /// Select the linear-solve strategy. Allowed in either phase.
    pub fn set_linear_solver(&mut self, solver: LinearSolver) {
        self.config.linear_solver = solver;
    }

    // ========================================================================
    // Intermediate quantities of the last solve
    // ========================================================================

    /// Joint-space inertia matrix.
    #[must_use]
    pub fn h(&self) -> &DMatrix<f64> {
        &self.h
    }

    /// Bias forces `C(q, q̇)`.
    #[must_use]
    pub fn c(&self) -> &DVector<f64> {
        &self.c
    }

    /// Contact Jacobian.
    #[must_use]
    pub fn g(&self) -> &DMatrix<f64> {
        &self.g
    }

    /// Constraint-space operator of the last reduced solve.
    #[must_use]
    pub fn k(&self) -> &DMatrix<f64> {
        &self.k
    }

    /// Velocity-product normal accelerations minus targets.
    #[must_use]
    pub fn gamma(&self) -> &DVector<f64> {
        &self.gamma
    }

    /// Unconstrained accelerations of the last test-force solve.
    #[must_use]
    pub fn qddot_0(&self) -> &DVector<f64> {
        &self.qddot_0
    }

    /// Contact point accelerations under [`ConstraintSet::qddot_0`].
    #[must_use]
    pub fn point_accel_0(&self) -> &[Vector3<f64>] {
        &self.point_accel_0
    }

    /// Per-body constraint forces of the last test-force solve, base coordinates.
    #[must_use]
    pub fn f_ext_constraints(&self) -> &[SpatialVector] {
        &self.f_ext_constraints
    }
}
