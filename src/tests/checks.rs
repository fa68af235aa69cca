use crate::compile::*;
use crate::graph::*;
use crate::inference::*;
use crate::trace::Trace;
use crate::utils::render::*;
use crate::*;
use itertools::*;
use tracing::debug;

pub fn graph_of(trace: Result<Trace>) -> Graph {
    let trace = trace.unwrap_or_else(|e| panic!("recording failed: {e}"));
    let g = extract_graph(&trace).unwrap_or_else(|e| panic!("extraction failed: {e}"));
    g.validate().unwrap();
    debug!("graph:\n{}", g);
    g
}

pub fn blanket_names(c: &GibbsConditional) -> Vec<VarName> {
    c.blanket.iter().map(|(n, _)| n.clone()).collect_vec()
}

pub fn assert_normalized(c: &Conditional) {
    for d in c.components() {
        let total: f64 = d.probs.iter().sum();
        assert!(
            (total - 1.0).abs() < 1e-9,
            "probabilities {} sum to {}",
            renderfloats(&d.probs, true),
            total
        );
        assert!(d.probs.iter().all(|p| *p >= 0.0));
    }
}

pub fn assert_probs(s: &str, d: &Discrete, expected: &[f64]) {
    assert_eq!(d.probs.len(), expected.len(), "[{s}] support {}", rendervalues(&d.support));
    izip!(&d.probs, expected).enumerate().for_each(|(i, (p, e))| {
        assert!(
            (p - e).abs() < 1e-9,
            "[{s}#{i}] expected {}, computed {}",
            renderfloats(expected, true),
            renderfloats(&d.probs, true)
        );
    });
}

pub fn discrete(c: &Conditional) -> &Discrete {
    match c {
        Conditional::Discrete(d) => d,
        c => panic!("expected a scalar conditional, got {}", c),
    }
}

/// `N(x; m, 1)` up to a constant.
pub fn unit_normal(x: f64, m: f64) -> f64 {
    (-(x - m).powi(2) / 2.0).exp()
}
