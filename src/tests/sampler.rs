use crate::inference::*;
use crate::tests::checks::*;
use crate::*;
use crate::vn;

use itertools::*;
use tracing_test::*;

const FLIPS: [bool; 3] = [false, true, true];

#[test]
#[traced_test]
fn sweeps_stay_on_the_grid() {
    let g = graph_of(models::bernoulli_grid(FLIPS, 1));
    let conds = conditionals_for(&g, &vn!(idx)).unwrap();
    let mut sampler = GibbsSampler::new(conds.into_values(), Options::seed(1));
    assert_eq!(sampler.targets().collect_vec(), vec![&vn!(idx)]);
    let envs = sampler.run(Env::from_graph(&g), 50).unwrap();
    assert_eq!(envs.len(), 50);
    for env in &envs {
        let i = env.lookup(&vn!(idx)).unwrap().as_int().unwrap();
        assert!((0..4).contains(&i));
        // observations are never resampled
        assert_eq!(env.lookup(&vn!(y)), Ok(Value::Bool(true)));
    }
}

#[test]
fn seeded_runs_agree() {
    let g = graph_of(models::gmm_loop(&[-2.0, 0.3, 2.2], 2, 6));
    let run = || {
        let conds = conditionals_for(&g, &vn!(z)).unwrap();
        GibbsSampler::new(conds.into_values(), Options::seed(42))
            .run(Env::from_graph(&g), 10)
            .unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
#[traced_test]
fn clustering_sweeps_keep_valid_partitions() {
    let xs = [-2.0, -1.8, 2.1, 2.3, -2.2];
    let g = graph_of(models::imm(&xs, 1.0, 3));
    let conds = conditionals_for(&g, &vn!(z)).unwrap();
    let mut sampler = GibbsSampler::new(conds.into_values(), Options::seed(3));
    for env in sampler.run(Env::from_graph(&g), 20).unwrap() {
        let zs = (0..xs.len())
            .map(|i| env.lookup(&vn!(z[i])).unwrap().as_index().unwrap())
            .collect_vec();
        // labels open in order
        let mut next = 0;
        for z in zs {
            assert!(z <= next, "label {} skips ahead of {}", z, next);
            next = next.max(z + 1);
        }
        // every used label has a mean
        for k in 0..next {
            assert!(env.lookup(&vn!(mu[k])).is_ok());
        }
    }
}
