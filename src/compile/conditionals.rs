//! Markov blankets of named random variables.
use crate::compile::cont::*;
use crate::compile::continuations::*;
use crate::data::*;
use crate::graph::*;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;
use tracing::{debug, span, warn, Level};

/// Prior of a fresh cluster parameter for clustering-process targets: the
/// target indexes into `family`, whose elements are drawn from `prior`.
#[derive(Clone, Debug, PartialEq)]
pub struct BaseMeasure {
    pub family: VarName,
    pub prior: LogLikelihood,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GibbsConditional {
    pub name: VarName,
    pub own: LogLikelihood,
    /// downstream likelihoods whose distributions depend on `name`, in graph order
    pub blanket: Vec<(VarName, LogLikelihood)>,
    pub base: Option<BaseMeasure>,
}

impl fmt::Display for GibbsConditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}: {}", self.name, self.own)?;
        for (n, ll) in &self.blanket {
            writeln!(f, "  | {}: {}", n, ll)?;
        }
        if let Some(base) = &self.base {
            writeln!(f, "  * {}[new]: {}", base.family, base.prior)?;
        }
        Ok(())
    }
}

pub type Conditionals = IndexMap<VarName, GibbsConditional>;

pub fn conditionals(graph: &Graph, pattern: &VarName) -> Result<Conditionals> {
    let conts = continuations(graph)?;
    conditionals_from(graph, &conts, pattern)
}

/// A conditional for every tilde name `pattern` subsumes. A statement joins
/// the blanket of each target one of its parents overlaps.
pub fn conditionals_from(
    graph: &Graph,
    conts: &Continuations,
    pattern: &VarName,
) -> Result<Conditionals> {
    let span = span!(Level::DEBUG, "conditionals", pattern = %pattern);
    let _enter = span.enter();
    let mut out = Conditionals::new();
    let mut tildes: Vec<(VarName, LogLikelihood)> = vec![];
    for (r, name, _) in graph.tildes() {
        let ll = match conts.get(&r).and_then(|c| c.as_loglikelihood()) {
            Some(ll) => ll.clone(),
            None => return missing_dependency(&format!("likelihood of {}", r)),
        };
        let parents = ll.parents();
        for (target, cond) in out.iter_mut() {
            let depends = parents.iter().any(|p| p.relation(target).overlaps());
            // the same variable scored again contributes once more
            if depends || target == name {
                cond.blanket.push((name.clone(), ll.clone()));
            }
        }
        if pattern.subsumes(name) && !out.contains_key(name) {
            out.insert(
                name.clone(),
                GibbsConditional {
                    name: name.clone(),
                    own: ll.clone(),
                    blanket: vec![],
                    base: None,
                },
            );
        }
        tildes.push((name.clone(), ll));
    }
    for cond in out.values_mut() {
        if cond.own.dist.is_crp() {
            cond.base = base_measure(cond, &tildes);
            if cond.base.is_none() {
                warn!("no base measure found for clustering variable {}", cond.name);
            }
        }
    }
    debug!(
        "{} conditionals, blanket sizes {:?}",
        out.len(),
        out.values().map(|c| c.blanket.len()).collect_vec()
    );
    Ok(out)
}

fn base_measure(cond: &GibbsConditional, tildes: &[(VarName, LogLikelihood)]) -> Option<BaseMeasure> {
    let family = cond
        .blanket
        .iter()
        .flat_map(|(_, ll)| ll.args().iter())
        .find_map(|a| a.indexed_family(&cond.name))?;
    let prior = tildes
        .iter()
        .find(|(n, _)| family.subsumes(n))
        .map(|(_, ll)| ll.clone())?;
    Some(BaseMeasure { family, prior })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::trace::record::Recorder;
    use crate::trace::Arg;

    fn n(s: &str) -> VarName {
        VarName::new(s)
    }

    #[test]
    fn test_blanket_follows_dependencies() {
        let trace = Recorder::record("m", vec![], 2, |r, _| {
            let d = r.dist(DistKind::Bernoulli, args![0.5])?;
            let a = r.assume(n("a"), &d)?;
            let b = r.assume(n("b"), &d)?;
            let pa = r.call(Op::Div, args![&a, 2.0])?;
            let da = r.dist(DistKind::Bernoulli, args![&pa])?;
            r.observe(n("c"), &da, Value::Bool(true))?;
            r.observe(n("c"), &da, Value::Bool(true))?;
            let db = r.dist(DistKind::Bernoulli, args![0.25])?;
            r.observe(n("e"), &db, Value::Bool(false))?;
            Ok(Arg::from(&b))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conds = conditionals(&g, &n("a")).unwrap();
        assert_eq!(conds.len(), 1);
        let names = conds[&n("a")].blanket.iter().map(|(n, _)| n.clone()).collect_vec();
        // repeated evidence is kept
        assert_eq!(names, vec![n("c"), n("c")]);

        let conds = conditionals(&g, &n("b")).unwrap();
        assert!(conds[&n("b")].blanket.is_empty());
    }

    #[test]
    fn test_patterns_select_families() {
        let trace = Recorder::record("m", vec![], 2, |r, _| {
            let d = r.dist(DistKind::Categorical, args![Value::floats(&[0.5, 0.5])])?;
            for i in 0..3_usize {
                let zi = r.assume(n("z").at(i), &d)?;
                let dx = r.dist(DistKind::Normal, args![&zi, 1.0])?;
                r.observe(n("x").at(i), &dx, Value::Float(0.0))?;
            }
            Ok(Arg::Literal(Value::Unit))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conds = conditionals(&g, &n("z")).unwrap();
        assert_eq!(conds.keys().cloned().collect_vec(), (0..3).map(|i| n("z").at(i)).collect_vec());
        for (i, c) in conds.values().enumerate() {
            assert_eq!(c.blanket.len(), 1);
            assert_eq!(c.blanket[0].0, n("x").at(i));
        }
        assert_eq!(conditionals(&g, &n("z").at(1)).unwrap().len(), 1);
        assert!(conditionals(&g, &n("w")).unwrap().is_empty());
    }
}
