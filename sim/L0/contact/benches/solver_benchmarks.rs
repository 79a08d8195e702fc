//! Benchmarks comparing the acceleration-level contact formulations.
//!
//! Run with: cargo bench -p sim-contact
//!
//! Pendulum chains of growing length with the tip pinned in the sagittal
//! plane: the dense KKT system grows with `nv` while the reduced systems
//! stay `2 × 2`.

#![allow(missing_docs, clippy::unwrap_used, clippy::expect_used, clippy::cast_precision_loss)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use nalgebra::{DMatrix, Vector3};

use sim_contact::{ConstraintSet, ForwardDynamicsMethod, calc_contact_jacobian};
use sim_core::Model;

fn pinned_chain(links: usize) -> (Model, ConstraintSet) {
    let model = Model::n_link_pendulum(links, 0.3, 1.0);
    let tip = Vector3::new(0.0, 0.0, -0.3);
    let mut cs = ConstraintSet::new();
    cs.add_constraint(links, tip, Vector3::x(), Some("tip_x"), 0.0);
    cs.add_constraint(links, tip, Vector3::z(), Some("tip_z"), 0.0);
    cs.bind(&model);
    (model, cs)
}

fn bench_forward_dynamics_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact_forward_dynamics");

    for links in [4, 16, 64] {
        for method in ForwardDynamicsMethod::ALL {
            let (model, mut cs) = pinned_chain(links);
            let mut data = model.make_data();
            let nv = model.nv;
            let q: Vec<f64> = (0..nv).map(|i| 0.2 * (i as f64).sin() + 0.05).collect();
            let qdot = vec![0.1; nv];
            let tau = vec![0.0; nv];
            let mut qddot = vec![0.0; nv];

            group.bench_function(BenchmarkId::new(method.to_string(), format!("{links}_links")), |b| {
                b.iter(|| {
                    cs.clear();
                    cs.forward_dynamics(method, &model, &mut data, &q, &qdot, &tau, &mut qddot)
                        .unwrap();
                    black_box(&qddot);
                });
            });
        }
    }

    group.finish();
}

fn bench_contact_jacobian(c: &mut Criterion) {
    let mut group = c.benchmark_group("contact_jacobian");

    for links in [4, 16, 64] {
        let (model, cs) = pinned_chain(links);
        let mut data = model.make_data();
        let q = vec![0.1; model.nv];
        let mut g = DMatrix::zeros(cs.len(), model.nv);

        group.bench_function(BenchmarkId::from_parameter(links), |b| {
            b.iter(|| {
                calc_contact_jacobian(&model, &mut data, &q, &cs, &mut g, true);
                black_box(&g);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_forward_dynamics_methods, bench_contact_jacobian);
criterion_main!(benches);
