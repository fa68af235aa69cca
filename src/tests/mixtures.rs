use crate::inference::*;
use crate::tests::checks::*;
use crate::utils::l1_distance;
use crate::*;
use crate::vn;

use itertools::*;
use tracing_test::*;

const XS: [f64; 4] = [-2.1, 1.7, -0.3, 2.4];
const MU: [f64; 2] = [-2.0, 2.0];
const Z: [i64; 4] = [0, 1, 1, 0];

fn pinned(g: &graph::Graph) -> Env {
    Env::from_graph(g)
        .fixvalue(&vn!(mu), &Value::floats(&MU))
        .and_then(|env| env.fixvalue(&vn!(z), &Value::ints(&Z)))
        .unwrap()
}

#[test]
#[traced_test]
fn whole_array_assignments() {
    let g = graph_of(models::gmm(&XS, 2, 4));
    let env = pinned(&g);
    assert_eq!(env.lookup(&vn!(z[3])), Ok(Value::Int(0)));

    let conds = conditionals_for(&g, &vn!(z)).unwrap();
    assert_eq!(conds.len(), 1);
    assert_eq!(
        blanket_names(&conds[0]),
        (0..XS.len()).map(|i| vn!(x[i])).collect_vec()
    );
    let c = evaluate(&conds[0], &env).unwrap();
    assert_normalized(&c);
    let ds = match &c {
        Conditional::Product(ds) => ds,
        c => panic!("expected a product, got {}", c),
    };
    assert_eq!(ds.len(), XS.len());
    for (i, d) in ds.iter().enumerate() {
        let (l0, l1) = (unit_normal(XS[i], MU[0]), unit_normal(XS[i], MU[1]));
        assert_probs(&format!("z[{i}]"), d, &[l0 / (l0 + l1), l1 / (l0 + l1)]);
    }
}

#[test]
#[traced_test]
fn per_element_assignments() {
    let g = graph_of(models::gmm_loop(&XS, 2, 4));
    let env = pinned(&g);
    assert_eq!(env.get(&vn!(mu[1])), Some(&Value::Float(2.0)));
    assert!(!env.contains(&vn!(z)));

    let conds = conditionals_for(&g, &vn!(z)).unwrap();
    assert_eq!(conds.len(), XS.len());
    for (i, cond) in conds.values().enumerate() {
        assert_eq!(cond.name, vn!(z[i]));
        assert_eq!(blanket_names(cond), vec![vn!(x[i])]);
    }
    // a single element is selected by its exact name
    assert_eq!(conditionals_for(&g, &vn!(z[2])).unwrap().len(), 1);
}

#[test]
fn shapes_agree() {
    let whole = graph_of(models::gmm(&XS, 2, 8));
    let split = graph_of(models::gmm_loop(&XS, 2, 9));

    let c = evaluate(&conditionals_for(&whole, &vn!(z)).unwrap()[0], &pinned(&whole)).unwrap();
    let from_whole = c.components().into_iter().cloned().collect_vec();

    let env = pinned(&split);
    let from_split = conditionals_for(&split, &vn!(z))
        .unwrap()
        .values()
        .map(|cond| discrete(&evaluate(cond, &env).unwrap()).clone())
        .collect_vec();

    assert_eq!(from_whole.len(), from_split.len());
    for (a, b) in izip!(&from_whole, &from_split) {
        assert_eq!(a.support, b.support);
        assert!(l1_distance(&a.probs, &b.probs) < 1e-12);
    }
}

#[test]
fn means_follow_assignments() {
    // moving z[0] to the other cluster changes the likelihood of x[0] only
    let g = graph_of(models::gmm_loop(&XS, 2, 4));
    let env = pinned(&g);
    let conds = conditionals_for(&g, &vn!(z)).unwrap();
    let x0 = &conds[0].blanket[0].1;
    let at0 = x0.eval(&env).unwrap();
    let at1 = x0.eval(&env.fixvalue(&vn!(z[0]), &Value::Int(1)).unwrap()).unwrap();
    let (l0, l1) = (unit_normal(XS[0], MU[0]).ln(), unit_normal(XS[0], MU[1]).ln());
    assert!(((at0 - at1) - (l0 - l1)).abs() < 1e-9);
}
