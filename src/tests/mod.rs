use crate::tests::checks::*;
use crate::trace::*;
use crate::*;
use crate::{args, vn};

use itertools::*;
use tracing_test::*;

mod checks;
mod mixtures;
mod sampler;

#[test]
#[traced_test]
fn chain_model() {
    let g = graph_of(models::chain(1.4, 0));
    let obs = g.observations().collect_vec();
    assert_eq!(obs, vec![(&vn!(x), &Value::Float(1.4))]);
    let assumed = g.assumptions().map(|(n, _)| n.clone()).collect_vec();
    assert_eq!(assumed, vec![VarName::new("λ"), vn!(m)]);

    let conds = conditionals_for(&g, &vn!(m)).unwrap();
    assert_eq!(conds.len(), 1);
    assert_eq!(blanket_names(&conds[&vn!(m)]), vec![vn!(x)]);

    let conds = conditionals_for(&g, &VarName::new("λ")).unwrap();
    assert_eq!(blanket_names(&conds[0]), vec![vn!(m), vn!(x)]);

    // both are continuous
    let env = Env::from_graph(&g);
    assert!(matches!(
        evaluate(&conds[0], &env),
        Err(GibbsError::UnsupportedDistribution(_))
    ));
}

#[test]
#[traced_test]
fn independent_variables() {
    let trace = Recorder::record("indep", vec![], 1, |r, _| {
        let dw = r.dist(DistKind::Bernoulli, args![0.3])?;
        let w = r.assume(vn!(w), &dw)?;
        let dm = r.dist(DistKind::Categorical, args![Value::floats(&[0.5, 0.5])])?;
        let m = r.assume(vn!(m), &dm)?;
        let dx = r.dist(DistKind::Normal, args![&m, 1.0])?;
        r.observe(vn!(x), &dx, Value::Float(1.4))?;
        Ok(Arg::from(&w))
    });
    let g = graph_of(trace);
    let env = Env::from_graph(&g);

    let conds = conditionals_for(&g, &vn!(w)).unwrap();
    assert!(conds[0].blanket.is_empty());
    let c = evaluate(&conds[0], &env).unwrap();
    assert_probs("w", discrete(&c), &[0.7, 0.3]);

    let conds = conditionals_for(&g, &vn!(m)).unwrap();
    assert_eq!(blanket_names(&conds[0]), vec![vn!(x)]);
    let c = evaluate(&conds[0], &env).unwrap();
    let (l0, l1) = (unit_normal(1.4, 0.0), unit_normal(1.4, 1.0));
    assert_probs("m", discrete(&c), &[l0 / (l0 + l1), l1 / (l0 + l1)]);
}

const FLIPS: [bool; 3] = [true, true, false];

#[test]
#[traced_test]
fn bernoulli_chain() {
    let g = graph_of(models::bernoulli_chain(FLIPS, 3));
    let conds = conditionals_for(&g, &vn!(p)).unwrap();
    assert_eq!(blanket_names(&conds[&vn!(p)]), vec![vn!(x), vn!(y), vn!(z)]);
    let env = Env::from_graph(&g);
    assert!(matches!(
        evaluate(&conds[&vn!(p)], &env),
        Err(GibbsError::UnsupportedDistribution(_))
    ));
}

#[test]
#[traced_test]
fn bernoulli_grid_posterior() {
    let g = graph_of(models::bernoulli_grid(FLIPS, 3));
    let conds = conditionals_for(&g, &vn!(idx)).unwrap();
    assert_eq!(blanket_names(&conds[0]), vec![vn!(x), vn!(y), vn!(z)]);
    let c = evaluate(&conds[0], &Env::from_graph(&g)).unwrap();
    assert_normalized(&c);
    // p^2 (1 - p) over p ∈ {0.2, 0.4, 0.6, 0.8}
    let lik = [0.2_f64, 0.4, 0.6, 0.8].map(|p| p * p * (1.0 - p));
    let z: f64 = lik.iter().sum();
    assert_probs("idx", discrete(&c), &lik.map(|l| l / z));
    assert_eq!(discrete(&c).mode(), Some(&Value::Int(2)));
}

#[test]
fn grid_posterior_ignores_current_value() {
    let g = graph_of(models::bernoulli_grid(FLIPS, 3));
    let conds = conditionals_for(&g, &vn!(idx)).unwrap();
    let env = Env::from_graph(&g);
    let results = (0..4_i64)
        .map(|i| {
            let env = env.fixvalue(&vn!(idx), &Value::Int(i)).unwrap();
            evaluate(&conds[0], &env).unwrap()
        })
        .collect_vec();
    assert!(results.iter().all_equal());
}

#[test]
fn extraction_is_deterministic() {
    let trace = models::gmm_loop(&[0.1, -0.4, 2.0], 2, 11).unwrap();
    assert_eq!(extract_graph(&trace).unwrap(), extract_graph(&trace).unwrap());
    let again = models::gmm_loop(&[0.1, -0.4, 2.0], 2, 11).unwrap();
    assert_eq!(extract_graph(&trace).unwrap(), extract_graph(&again).unwrap());
}

#[test]
fn pipeline_at_trace() {
    let trace = models::bernoulli_grid(FLIPS, 0).unwrap();
    let (g, conds) = conditionals_at_trace(&trace, &vn!(idx), &Options::seed(0)).unwrap();
    assert_eq!(g.assumptions().count(), 1);
    assert_eq!(conds.len(), 1);
    assert_eq!(conds[0].0, vn!(idx));
    assert_normalized(&conds[0].1);
}
