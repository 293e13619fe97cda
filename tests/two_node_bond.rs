mod util;
use util::*;

use nalgebra::{Matrix1, Vector1};
use pd_sieve::prelude::*;

const TOL: f64 = 1e-12;

fn initialized() -> SerialEngine<1> {
    let mut engine = serial_engine::<1>(2, ForceGenConfig::default());
    engine
        .initialize_level(0, &connect(&[(0, 1)], DEFAULT_LAW_ID, &[]), &line(&[0.0, 1.0]), 0.0, true)
        .unwrap();
    engine
}

#[test]
fn bond_at_rest_length_is_force_free() {
    let mut engine = initialized();
    let mut force = vec![Vector1::zeros(); 2];
    let mut damage = vec![0.0; 2];
    engine
        .compute_forces_and_damage(0, &mut force, &mut damage, &line(&[0.0, 1.0]), &line(&[0.0, 0.0]), 0.0)
        .unwrap();

    for f in engine.deformation_gradients(0).unwrap() {
        assert!((f - Matrix1::identity()).norm() < TOL);
    }
    let law = *engine.registry().default_law();
    for f in engine.deformation_gradients(0).unwrap() {
        let p = BondLaw::<1>::stress(&law, f, &Vector1::zeros(), NodeId::new(0));
        assert!(p.norm() < TOL);
    }
    assert!(force.iter().all(|f| f.norm() < TOL));
    assert!(damage.iter().all(|&d| d.abs() < TOL));
    assert_eq!(engine.mean_positions(0).unwrap(), &line(&[0.5, 0.5])[..]);
}

#[test]
fn bond_stretched_to_twice_its_length_pulls_both_ends_inward() {
    let mut engine = initialized();
    let mut force = vec![Vector1::zeros(); 2];
    let mut damage = vec![0.0; 2];
    engine
        .compute_forces_and_damage(0, &mut force, &mut damage, &line(&[0.0, 2.0]), &line(&[0.0, 0.0]), 0.5)
        .unwrap();

    // F = 2, E = 3/2, S = λ tr E + 2μ E = 9/2, P = F S = 9 at both ends
    assert!((engine.deformation_gradients(0).unwrap()[0][0] - 2.0).abs() < TOL);
    assert!(force[0][0] > 0.0, "master is pulled towards the slave");
    assert!((force[0][0] - 18.0).abs() < 1e-10);
    assert_eq!(force[1], -force[0]);
    assert_eq!(damage, vec![0.0, 0.0]);
}

#[test]
fn forces_are_added_to_existing_buffer_contents() {
    let mut engine = initialized();
    let mut force = vec![Vector1::new(1.0), Vector1::new(-4.0)];
    let mut damage = vec![0.25, 0.0];
    engine
        .compute_forces_and_damage(0, &mut force, &mut damage, &line(&[0.0, 2.0]), &line(&[0.0, 0.0]), 0.0)
        .unwrap();
    assert!((force[0][0] - 19.0).abs() < 1e-10);
    assert!((force[1][0] + 22.0).abs() < 1e-10);
    assert_eq!(damage, vec![0.25, 0.0]);
}

#[test]
fn compressed_bond_pushes_ends_apart() {
    let mut engine = initialized();
    let mut force = vec![Vector1::zeros(); 2];
    let mut damage = vec![0.0; 2];
    engine
        .compute_forces_and_damage(0, &mut force, &mut damage, &line(&[0.1, 0.6]), &line(&[0.0, 0.0]), 0.0)
        .unwrap();
    assert!(force[0][0] < 0.0);
    assert_eq!(force[1], -force[0]);
}
