//! Integration tests for the contact solvers.
//!
//! Cross-checks the dense KKT, sparse-factor and test-force formulations
//! against each other and against analytic results on pendulum chains, a
//! floating box and a branched legged tree.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]

use approx::assert_relative_eq;
use nalgebra::Vector3;
use sim_contact::{
    ConstraintError, ConstraintSet, ForwardDynamicsMethod, LinearSolver, compute_contact_impulses_lagrangian,
    forward_dynamics_contacts, forward_dynamics_contacts_lagrangian_sparse,
};
use sim_core::{Model, STANDARD_GRAVITY, calc_point_acceleration, calc_point_velocity};

/// A constraint definition: body, point, normal, target acceleration.
type Contact = (usize, Vector3<f64>, Vector3<f64>, f64);

struct Scenario {
    name: &'static str,
    model: Model,
    contacts: Vec<Contact>,
    q: Vec<f64>,
    qdot: Vec<f64>,
    tau: Vec<f64>,
}

fn state(nv: usize, scale: f64) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let q = (0..nv).map(|i| scale * (0.7 * i as f64 + 0.3).sin()).collect();
    let qdot = (0..nv).map(|i| 0.5 * (1.3 * i as f64).cos()).collect();
    let tau = (0..nv).map(|i| 0.2 * i as f64 - 0.4).collect();
    (q, qdot, tau)
}

fn pendulum_scenario() -> Scenario {
    let model = Model::n_link_pendulum(4, 0.5, 1.0);
    let (q, qdot, tau) = state(model.nv, 0.6);
    let tip = Vector3::new(0.0, 0.0, -0.5);
    let contacts = vec![
        (4, tip, Vector3::x(), 0.0),
        (4, tip, Vector3::z(), 0.3),
        (2, Vector3::new(0.0, 0.0, -0.25), Vector3::new(1.0, 0.0, 1.0).normalize(), -0.2),
    ];
    Scenario { name: "pendulum", model, contacts, q, qdot, tau }
}

fn box_scenario() -> Scenario {
    let h = 0.2;
    let model = Model::floating_box(2.5, Vector3::new(h, h, h));
    let (q, qdot, tau) = state(model.nv, 0.3);
    let body = model.body_id("box").unwrap();
    let contacts = vec![
        (body, Vector3::new(h, h, -h), Vector3::z(), 0.0),
        (body, Vector3::new(-h, h, -h), Vector3::z(), 0.0),
        (body, Vector3::new(h, -h, -h), Vector3::z(), 0.1),
        (body, Vector3::new(-h, -h, -h), Vector3::x(), 0.0),
    ];
    Scenario { name: "floating_box", model, contacts, q, qdot, tau }
}

fn tree_scenario() -> Scenario {
    let model = Model::branched_tree();
    let (q, qdot, tau) = state(model.nv, 0.4);
    let left = model.body_id("left_foot").unwrap();
    let right = model.body_id("right_foot").unwrap();
    let torso = model.body_id("torso").unwrap();
    let heel = Vector3::new(-0.05, 0.0, -0.02);
    let contacts = vec![
        (left, heel, Vector3::z(), 0.0),
        (right, heel, Vector3::z(), 0.0),
        (left, heel, Vector3::x(), 0.0),
        (right, heel, Vector3::x(), 0.5),
        (torso, Vector3::new(0.0, 0.2, 0.0), Vector3::y(), 0.0),
    ];
    Scenario { name: "branched_tree", model, contacts, q, qdot, tau }
}

fn scenarios() -> Vec<Scenario> {
    vec![pendulum_scenario(), box_scenario(), tree_scenario()]
}

fn bound_set(model: &Model, contacts: &[Contact], solver: LinearSolver) -> ConstraintSet {
    let mut cs = ConstraintSet::new();
    for &(body, point, normal, accel) in contacts {
        cs.add_constraint(body, point, normal, None, accel);
    }
    cs.set_linear_solver(solver);
    cs.bind(model);
    cs
}

fn solve(
    sc: &Scenario,
    contacts: &[Contact],
    method: ForwardDynamicsMethod,
    solver: LinearSolver,
) -> Result<(Vec<f64>, Vec<f64>), ConstraintError> {
    let mut data = sc.model.make_data();
    let mut cs = bound_set(&sc.model, contacts, solver);
    let mut qddot = vec![0.0; sc.model.nv];
    cs.forward_dynamics(method, &sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut qddot)?;
    Ok((qddot, cs.force().to_vec()))
}

// ============================================================================
// Resting contact
// ============================================================================

#[test]
fn resting_box_support_force_every_method() {
    let (mass, h) = (4.0, 0.15);
    let model = Model::floating_box(mass, Vector3::new(h, h, h));
    let body = model.body_id("box").unwrap();
    let zeros = vec![0.0; model.nv];
    let bottom = Vector3::new(0.0, 0.0, -h);

    for method in ForwardDynamicsMethod::ALL {
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.add_constraint(body, bottom, Vector3::z(), Some("ground"), 0.0);
        cs.bind(&model);

        let mut qddot = vec![1.0; model.nv];
        cs.forward_dynamics(method, &model, &mut data, &zeros, &zeros, &zeros, &mut qddot)
            .unwrap();

        assert_relative_eq!(cs.force()[0], mass * STANDARD_GRAVITY, epsilon = 1e-9);
        let acc = calc_point_acceleration(&model, &mut data, &zeros, &zeros, &qddot, body, &bottom, true);
        assert_relative_eq!(acc.z, 0.0, epsilon = 1e-9);
    }
}

#[test]
fn pendulum_pivot_reaction_matches_statics() {
    // Horizontal link held at its tip by a vertical constraint: the tip
    // carries half the weight.
    let (len, mass) = (1.0, 2.0);
    let model = Model::n_link_pendulum(1, len, mass);
    let q = [std::f64::consts::FRAC_PI_2];
    let tip = Vector3::new(0.0, 0.0, -len);

    for method in ForwardDynamicsMethod::ALL {
        let mut data = model.make_data();
        let mut cs = ConstraintSet::new();
        cs.add_constraint(1, tip, Vector3::z(), None, 0.0);
        cs.bind(&model);

        let mut qddot = [0.0];
        cs.forward_dynamics(method, &model, &mut data, &q, &[0.0], &[0.0], &mut qddot)
            .unwrap();
        assert_relative_eq!(qddot[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(cs.force()[0], 0.5 * mass * STANDARD_GRAVITY, epsilon = 1e-9);
    }
}

// ============================================================================
// Cross-solver agreement
// ============================================================================

#[test]
fn all_formulations_and_solvers_agree() {
    let solvers = [
        LinearSolver::PartialPivLu,
        LinearSolver::ColPivHouseholderQr,
        LinearSolver::HouseholderQr,
        LinearSolver::GaussElimPivot,
    ];

    for sc in scenarios() {
        for m in 1..=sc.contacts.len() {
            let contacts = &sc.contacts[..m];
            let (qddot_ref, force_ref) = solve(
                &sc,
                contacts,
                ForwardDynamicsMethod::Lagrangian,
                LinearSolver::ColPivHouseholderQr,
            )
            .unwrap();

            for method in ForwardDynamicsMethod::ALL {
                for solver in solvers {
                    let (qddot, force) = solve(&sc, contacts, method, solver)
                        .unwrap_or_else(|e| panic!("{} m={m} {method} {solver}: {e}", sc.name));
                    for k in 0..qddot.len() {
                        assert_relative_eq!(qddot[k], qddot_ref[k], epsilon = 1e-9, max_relative = 1e-9);
                    }
                    for i in 0..m {
                        assert_relative_eq!(force[i], force_ref[i], epsilon = 1e-9, max_relative = 1e-9);
                    }
                }
            }
        }
    }
}

#[test]
fn constrained_accelerations_hit_targets() {
    for sc in scenarios() {
        for method in ForwardDynamicsMethod::ALL {
            let (qddot, _) = solve(&sc, &sc.contacts, method, LinearSolver::default()).unwrap();
            let mut data = sc.model.make_data();
            for &(body, point, normal, target) in &sc.contacts {
                let acc = calc_point_acceleration(&sc.model, &mut data, &sc.q, &sc.qdot, &qddot, body, &point, true);
                assert_relative_eq!(normal.dot(&acc), target, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn test_force_operator_is_negated_reduced_operator() {
    let sc = tree_scenario();
    let mut data = sc.model.make_data();
    let nv = sc.model.nv;

    let mut sparse = bound_set(&sc.model, &sc.contacts, LinearSolver::default());
    let mut qddot = vec![0.0; nv];
    forward_dynamics_contacts_lagrangian_sparse(&sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut sparse, &mut qddot)
        .unwrap();

    let mut probe = bound_set(&sc.model, &sc.contacts, LinearSolver::default());
    forward_dynamics_contacts(&sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut probe, &mut qddot).unwrap();

    let k = probe.k();
    assert_relative_eq!(*k, k.transpose(), epsilon = 1e-10);
    assert_relative_eq!(*k, -sparse.k(), epsilon = 1e-10, max_relative = 1e-9);
}

// ============================================================================
// Re-solving
// ============================================================================

#[test]
fn clear_then_resolve_matches_fresh_set() {
    for sc in scenarios() {
        for method in ForwardDynamicsMethod::ALL {
            let mut data = sc.model.make_data();
            let mut reused = bound_set(&sc.model, &sc.contacts, LinearSolver::default());
            let nv = sc.model.nv;

            // First step at a different state.
            let (q0, qdot0, tau0) = state(nv, -0.2);
            let mut qddot = vec![0.0; nv];
            reused
                .forward_dynamics(method, &sc.model, &mut data, &q0, &qdot0, &tau0, &mut qddot)
                .unwrap();

            reused.clear();
            reused
                .forward_dynamics(method, &sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut qddot)
                .unwrap();

            let (qddot_fresh, force_fresh) = solve(&sc, &sc.contacts, method, LinearSolver::default()).unwrap();
            for k in 0..nv {
                assert_relative_eq!(qddot[k], qddot_fresh[k], epsilon = 1e-12, max_relative = 1e-12);
            }
            for (f, f_fresh) in reused.force().iter().zip(&force_fresh) {
                assert_relative_eq!(*f, *f_fresh, epsilon = 1e-12, max_relative = 1e-12);
            }
        }
    }
}

#[test]
fn updated_targets_take_effect_after_clear() {
    let sc = box_scenario();
    let mut data = sc.model.make_data();
    let mut cs = bound_set(&sc.model, &sc.contacts[..1], LinearSolver::default());
    let mut qddot = vec![0.0; sc.model.nv];
    cs.forward_dynamics(ForwardDynamicsMethod::TestForces, &sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut qddot)
        .unwrap();

    cs.clear();
    cs.set_acceleration(0, 1.5);
    cs.forward_dynamics(ForwardDynamicsMethod::TestForces, &sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut qddot)
        .unwrap();

    let (body, point, normal, _) = sc.contacts[0];
    let acc = calc_point_acceleration(&sc.model, &mut data, &sc.q, &sc.qdot, &qddot, body, &point, true);
    assert_relative_eq!(normal.dot(&acc), 1.5, epsilon = 1e-9);
}

// ============================================================================
// Failure reporting
// ============================================================================

#[test]
fn contradictory_coincident_constraints_fail() {
    let sc = tree_scenario();
    let (body, point, normal, _) = sc.contacts[0];
    let contacts = [(body, point, normal, 0.0), (body, point, normal, 1.0)];

    for method in ForwardDynamicsMethod::ALL {
        for solver in LinearSolver::ALL {
            let mut data = sc.model.make_data();
            let mut cs = bound_set(&sc.model, &contacts, solver);
            let mut qddot = vec![42.0; sc.model.nv];
            let result = cs.forward_dynamics(method, &sc.model, &mut data, &sc.q, &sc.qdot, &sc.tau, &mut qddot);
            assert!(result.is_err(), "{method} {solver} accepted contradictory constraints");
            assert!(qddot.iter().all(|&x| x == 42.0));
            assert_eq!(cs.force(), &[0.0, 0.0]);
        }
    }
}

#[test]
fn cholesky_rejections() {
    let sc = pendulum_scenario();
    let contacts = &sc.contacts[..1];

    let dense = solve(&sc, contacts, ForwardDynamicsMethod::Lagrangian, LinearSolver::Llt).unwrap_err();
    assert_eq!(dense, ConstraintError::NotPositiveDefinite { solver: LinearSolver::Llt });

    for method in [ForwardDynamicsMethod::LagrangianSparse, ForwardDynamicsMethod::TestForces] {
        let err = solve(&sc, contacts, method, LinearSolver::Llt).unwrap_err();
        assert!(matches!(err, ConstraintError::UnsupportedSolver { .. }), "{method}: {err}");
    }
}

// ============================================================================
// Impulses
// ============================================================================

#[test]
fn zero_target_impulse_stops_normal_motion() {
    for sc in scenarios() {
        let mut data = sc.model.make_data();
        let mut cs = bound_set(&sc.model, &sc.contacts, LinearSolver::default());
        let mut qdot_plus = vec![0.0; sc.model.nv];
        compute_contact_impulses_lagrangian(&sc.model, &mut data, &sc.q, &sc.qdot, &mut cs, &mut qdot_plus).unwrap();

        for &(body, point, normal, _) in &sc.contacts {
            let v = calc_point_velocity(&sc.model, &mut data, &sc.q, &qdot_plus, body, &point, true);
            assert_relative_eq!(normal.dot(&v), 0.0, epsilon = 1e-12);
        }
    }
}

#[test]
fn impulse_reaches_velocity_targets_and_conserves_momentum_elsewhere() {
    let sc = box_scenario();
    let mut data = sc.model.make_data();
    let mut cs = bound_set(&sc.model, &sc.contacts[..3], LinearSolver::PartialPivLu);
    let targets = [0.2, 0.2, 0.2];
    for (i, &v) in targets.iter().enumerate() {
        cs.set_v_plus(i, v);
    }

    let mut qdot_plus = vec![0.0; sc.model.nv];
    cs.compute_impulses(&sc.model, &mut data, &sc.q, &sc.qdot, &mut qdot_plus).unwrap();

    for (i, &(body, point, normal, _)) in sc.contacts[..3].iter().enumerate() {
        let v = calc_point_velocity(&sc.model, &mut data, &sc.q, &qdot_plus, body, &point, true);
        assert_relative_eq!(normal.dot(&v), targets[i], epsilon = 1e-12);
    }
    // Vertical impulses leave horizontal translation untouched.
    assert_relative_eq!(qdot_plus[0], sc.qdot[0], epsilon = 1e-12);
    assert_relative_eq!(qdot_plus[1], sc.qdot[1], epsilon = 1e-12);
    assert!(cs.impulse().iter().all(|p| p.is_finite()));
}
