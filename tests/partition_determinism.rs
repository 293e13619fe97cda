mod util;
use util::*;

use nalgebra::Vector2;
use pd_sieve::prelude::*;

fn setup(params: &[f64]) -> (Vec<Vector2<f64>>, RawConnectivity, Vec<Vec<Vector2<f64>>>) {
    let x0 = lattice(5, 4);
    let raw = neighborhood(&x0, 1.5, params);
    let steps = vec![wavy(&x0, 0.05), wavy(&x0, 0.15), wavy(&x0, 0.1)];
    (x0, raw, steps)
}

#[test]
fn two_strips_match_a_single_partition() {
    let (x0, raw, steps) = setup(&[0.08, 0.02]);
    let config = ForceGenConfig {
        horizon: 1.5,
        ..Default::default()
    };
    let serial = run_partitioned(&vec![0; x0.len()], &raw, &x0, &steps, &config);
    let strips: Vec<usize> = x0.iter().map(|p| usize::from(p.x >= 2.0)).collect();
    let split = run_partitioned(&strips, &raw, &x0, &steps, &config);
    assert!(serial.damage.iter().any(|&d| d > 0.0), "expected some bonds to break");
    assert_bit_identical(&serial, &split);
}

#[test]
fn interleaved_ownership_matches_a_single_partition() {
    let (x0, raw, steps) = setup(&[]);
    let config = ForceGenConfig::default();
    let serial = run_partitioned(&vec![0; x0.len()], &raw, &x0, &steps, &config);
    let round_robin: Vec<usize> = (0..x0.len()).map(|i| i % 3).collect();
    let split = run_partitioned(&round_robin, &raw, &x0, &steps, &config);
    assert_bit_identical(&serial, &split);
}

#[test]
fn serial_manager_and_one_rank_world_agree() {
    let (x0, raw, steps) = setup(&[0.08]);
    let config = ForceGenConfig::default();
    let world = run_partitioned(&vec![0; x0.len()], &raw, &x0, &steps, &config);

    let mut engine = serial_engine::<2>(x0.len(), config);
    engine.initialize_level(0, &raw, &x0, 0.0, true).unwrap();
    let mut force = vec![Vector2::zeros(); x0.len()];
    let mut damage = vec![0.0; x0.len()];
    let v = vec![Vector2::zeros(); x0.len()];
    for (i, x) in steps.iter().enumerate() {
        force.fill(Vector2::zeros());
        damage.fill(0.0);
        engine
            .compute_forces_and_damage(0, &mut force, &mut damage, x, &v, i as f64)
            .unwrap();
    }
    assert_bit_identical(&world, &StepResult { force, damage });
}
