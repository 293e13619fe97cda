#![allow(dead_code)]
use nalgebra::{SVector, Vector1, Vector2};
use pd_sieve::{
    algs::communicator::{Communicator, LocalComm, NoComm},
    bond::RawConnectivity,
    config::ForceGenConfig,
    force_gen::BondForceEngine,
    index::DistributedIndexManager,
    law::LawId,
    topology::{node::NodeId, ownership::NodeOwnership},
};

pub type SerialEngine<const D: usize> = BondForceEngine<D, DistributedIndexManager<NoComm>>;

pub fn nid(u: u64) -> NodeId {
    NodeId::new(u)
}

/// Single-partition engine over one level of `nodes` nodes.
pub fn serial_engine<const D: usize>(nodes: usize, config: ForceGenConfig) -> SerialEngine<D> {
    BondForceEngine::new(config, DistributedIndexManager::serial(&[nodes])).unwrap()
}

/// Connectivity from `(master, slave)` pairs, all with `law` and `params`.
pub fn connect(pairs: &[(u64, u64)], law: LawId, params: &[f64]) -> RawConnectivity {
    let mut raw = RawConnectivity::new();
    for &(m, s) in pairs {
        raw.push(nid(m), nid(s), law, params.to_vec());
    }
    raw
}

pub fn line(xs: &[f64]) -> Vec<Vector1<f64>> {
    xs.iter().map(|&x| Vector1::new(x)).collect()
}

/// `nx × ny` lattice with unit spacing, numbered row by row.
pub fn lattice(nx: usize, ny: usize) -> Vec<Vector2<f64>> {
    (0..ny)
        .flat_map(|j| (0..nx).map(move |i| Vector2::new(i as f64, j as f64)))
        .collect()
}

/// Every pair `i < j` closer than `horizon`, in lexicographic order.
pub fn neighborhood<const D: usize>(x0: &[SVector<f64, D>], horizon: f64, params: &[f64]) -> RawConnectivity {
    let mut raw = RawConnectivity::new();
    for i in 0..x0.len() {
        for j in i + 1..x0.len() {
            if (x0[j] - x0[i]).norm() <= horizon {
                raw.push(nid(i as u64), nid(j as u64), 0, params.to_vec());
            }
        }
    }
    raw
}

/// A smooth, non-affine deformation of a 2-D lattice.
pub fn wavy(x0: &[Vector2<f64>], amplitude: f64) -> Vec<Vector2<f64>> {
    x0.iter()
        .map(|p| p + Vector2::new(amplitude * (0.7 * p.y).sin() + 0.02 * p.x * p.x, amplitude * (0.9 * p.x).cos()))
        .collect()
}

/// Forces and node damage per node, indexed by global id.
#[derive(Clone, Debug, PartialEq)]
pub struct StepResult<const D: usize> {
    pub force: Vec<SVector<f64, D>>,
    pub damage: Vec<f64>,
}

/// Run `steps` (deformed positions per step) on `owners.len()` nodes split over
/// ranks by `owners`, one thread per rank, and gather the last step's results.
pub fn run_partitioned<const D: usize>(
    owners: &[usize],
    raw: &RawConnectivity,
    x0: &[SVector<f64, D>],
    steps: &[Vec<SVector<f64, D>>],
    config: &ForceGenConfig,
) -> StepResult<D> {
    let ranks = owners.iter().copied().max().map_or(1, |r| r + 1);
    let world = LocalComm::world(ranks);
    let per_rank: Vec<Vec<(usize, SVector<f64, D>, f64)>> = std::thread::scope(|s| {
        let handles: Vec<_> = world
            .into_iter()
            .map(|comm| {
                s.spawn(move || {
                    let rank = comm.rank();
                    let mut mgr = DistributedIndexManager::new(comm);
                    mgr.set_level_ownership(0, NodeOwnership::from_owners(owners.to_vec()));
                    let globals: Vec<usize> =
                        mgr.owned_globals(0).unwrap().iter().map(|g| g.get() as usize).collect();
                    let mut engine = BondForceEngine::<D, _>::new(config.clone(), mgr).unwrap();
                    let local_raw = raw.filtered(0, |n| owners[n.get() as usize] == rank).unwrap();
                    let local_x0: Vec<_> = globals.iter().map(|&g| x0[g]).collect();
                    engine.initialize_level(0, &local_raw, &local_x0, 0.0, true).unwrap();

                    let mut force = vec![SVector::<f64, D>::zeros(); globals.len()];
                    let mut damage = vec![0.0; globals.len()];
                    let velocity = vec![SVector::<f64, D>::zeros(); globals.len()];
                    for (step, x) in steps.iter().enumerate() {
                        force.iter_mut().for_each(|f| *f = SVector::zeros());
                        damage.iter_mut().for_each(|d| *d = 0.0);
                        let local_x: Vec<_> = globals.iter().map(|&g| x[g]).collect();
                        engine
                            .compute_forces_and_damage(0, &mut force, &mut damage, &local_x, &velocity, step as f64)
                            .unwrap();
                    }
                    globals
                        .into_iter()
                        .zip(force)
                        .zip(damage)
                        .map(|((g, f), d)| (g, f, d))
                        .collect()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let mut out = StepResult {
        force: vec![SVector::zeros(); owners.len()],
        damage: vec![0.0; owners.len()],
    };
    for (g, f, d) in per_rank.into_iter().flatten() {
        out.force[g] = f;
        out.damage[g] = d;
    }
    out
}

/// Bitwise comparison that also treats `-0.0` and `0.0` as different.
pub fn assert_bit_identical<const D: usize>(a: &StepResult<D>, b: &StepResult<D>) {
    let bits = |r: &StepResult<D>| -> Vec<u64> {
        r.force
            .iter()
            .flat_map(|f| f.iter().map(|v| v.to_bits()).collect::<Vec<_>>())
            .chain(r.damage.iter().map(|d| d.to_bits()))
            .collect()
    };
    assert_eq!(bits(a), bits(b), "results differ\n a={a:?}\n b={b:?}");
}
