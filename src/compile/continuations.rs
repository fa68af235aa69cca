use crate::compile::cont::*;
use crate::data::*;
use crate::graph::*;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::{debug, span, trace, Level};

pub type Continuations = IndexMap<Reference, Arc<Cont>>;

/// One continuation per statement, built in a single pass in graph order.
pub fn continuations(graph: &Graph) -> Result<Continuations> {
    let span = span!(Level::DEBUG, "continuations");
    let _enter = span.enter();
    let mut conts = Continuations::new();
    for (r, s) in graph.iter() {
        let c = match s {
            Statement::Constant { value } => Cont::Fixed(value.clone()),
            Statement::Call { f, args, .. } => Cont::Transformation(Transformation::new(
                applied(graph, &conts, f)?,
                convertargs(graph, &conts, args)?,
            )),
            Statement::Assumption { name, dist, .. } | Statement::Observation { name, dist, .. } => {
                Cont::LogLikelihood(loglikelihood(graph, &conts, name, *dist)?)
            }
        };
        trace!("{} ↦ {}", r, c);
        conts.insert(r, Arc::new(c));
    }
    debug!("built {} continuations", conts.len());
    Ok(conts)
}

fn loglikelihood(
    graph: &Graph,
    conts: &Continuations,
    name: &VarName,
    dist: Reference,
) -> Result<LogLikelihood> {
    let value = Arc::new(Cont::Variable(name.clone()));
    match graph.get(dist) {
        Some(Statement::Call {
            value: d, f, args, ..
        }) => Ok(LogLikelihood {
            dist: d.as_dist()?.clone(),
            f: applied(graph, conts, f)?,
            args: convertargs(graph, conts, args)?,
            value,
        }),
        Some(other) => Ok(LogLikelihood {
            dist: other.value().as_dist()?.clone(),
            f: Applied::Static(Op::Identity.into()),
            args: vec![convertarg(graph, conts, &Operand::Ref(dist))?],
            value,
        }),
        None => missing_dependency(&format!("distribution {} of {}", dist, name)),
    }
}

fn applied(graph: &Graph, conts: &Continuations, f: &Callee) -> Result<Applied> {
    match f {
        Callee::Static(f) => Ok(Applied::Static(f.clone())),
        Callee::Dynamic(r) => Ok(Applied::Dynamic(convertarg(graph, conts, &Operand::Ref(*r))?)),
    }
}

fn convertargs(graph: &Graph, conts: &Continuations, args: &[Operand]) -> Result<Vec<Arc<Cont>>> {
    args.iter().map(|a| convertarg(graph, conts, a)).collect()
}

/// Operands refer to random variables by name: tilde statements become
/// variables and tagged element reads become by-name reads of the enclosing
/// family, so whole-array and per-element draws look alike.
pub fn convertarg(graph: &Graph, conts: &Continuations, op: &Operand) -> Result<Arc<Cont>> {
    let r = match op {
        Operand::Literal(v) => return Ok(Arc::new(Cont::Fixed(v.clone()))),
        Operand::Ref(r) => *r,
    };
    match graph.get(r) {
        None => missing_dependency(&format!("statement {}", r)),
        Some(s) if s.is_tilde() => match s.tilde() {
            Some((name, _)) => Ok(Arc::new(Cont::Variable(name.clone()))),
            None => missing_dependency(&format!("name of {}", r)),
        },
        Some(Statement::Call {
            definition: Some((name, _)),
            args,
            ..
        }) => {
            let ixops = args.get(1..).unwrap_or_default();
            // the parent is the name without the read's indices; a literal
            // index naming another position means the draw sits in a slice
            let parent = ixops.iter().rev().try_fold(name.clone(), |n, ix| {
                let (p, last) = n.split_last()?;
                match ix {
                    Operand::Literal(v) if v.as_index().ok().map(Index::At) != Some(last) => None,
                    _ => Some(p),
                }
            });
            match parent {
                Some(parent) if !ixops.is_empty() => {
                    let ixs = convertargs(graph, conts, ixops)?;
                    let base = Arc::new(Cont::Variable(parent));
                    Ok(Arc::new(Cont::Transformation(Transformation::new(
                        Applied::Static(Op::GetIndex.into()),
                        [vec![base], ixs].concat(),
                    ))))
                }
                _ => Ok(Arc::new(Cont::Variable(name.clone()))),
            }
        }
        Some(_) => match conts.get(&r) {
            Some(c) => Ok(c.clone()),
            None => missing_dependency(&format!("continuation of {}", r)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;
    use crate::trace::record::Recorder;
    use crate::trace::Arg;

    #[test]
    fn test_tildes_become_variables() {
        let trace = Recorder::record("m", vec![Value::Float(1.4)], 1, |r, data| {
            let d = r.dist(DistKind::Normal, args![0.0, 1.0])?;
            let m = r.assume(VarName::new("m"), &d)?;
            let dx = r.dist(DistKind::Normal, args![&m, 1.0])?;
            r.observe(VarName::new("x"), &dx, data[0].value.clone())?;
            Ok(Arg::from(&m))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conts = continuations(&g).unwrap();
        assert_eq!(conts.len(), g.len());
        let (_, last) = conts.last().unwrap();
        let ll = last.as_loglikelihood().unwrap();
        assert_eq!(ll.args[0].as_ref(), &Cont::Variable(VarName::new("m")));
        assert_eq!(ll.value.as_ref(), &Cont::Variable(VarName::new("x")));
        assert_eq!(ll.dist, g[g.len() - 2].value().as_dist().unwrap().clone());
    }

    #[test]
    fn test_constant_distributions_use_identity() {
        let trace = Recorder::record("m", vec![Value::Dist(Dist::Bernoulli(0.3))], 1, |r, data| {
            r.observe(VarName::new("b"), &data[0], Value::Bool(true))?;
            Ok(Arg::Literal(Value::Unit))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conts = continuations(&g).unwrap();
        let ll = conts[1].as_loglikelihood().unwrap();
        assert_eq!(ll.f, Applied::Static(Op::Identity.into()));
        assert!((ll.eval(&Env::from_graph(&g)).unwrap() - 0.3_f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_higher_order_calls() {
        let square = NativeFn::new("square", |xs| Op::Mul.apply(&[xs[0].clone(), xs[0].clone()]));
        let trace = Recorder::record("m", vec![Value::Func(square.into())], 1, |r, data| {
            let d = r.dist(DistKind::Normal, args![0.0, 1.0])?;
            let m = r.assume_with(VarName::new("m"), &d, Value::Float(3.0))?;
            let sq = r.call_dynamic(&data[0], args![&m])?;
            let dx = r.dist(DistKind::Normal, args![&sq, 1.0])?;
            r.observe(VarName::new("x"), &dx, Value::Float(9.0))?;
            Ok(Arg::Literal(Value::Unit))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conts = continuations(&g).unwrap();
        let call = conts
            .values()
            .find(|c| matches!(c.as_ref(), Cont::Transformation(Transformation { f: Applied::Dynamic(_), .. })))
            .unwrap();
        let env = Env::from_graph(&g).fixvalue(&VarName::new("m"), &Value::Float(2.0)).unwrap();
        assert_eq!(call.eval(&env), Ok(Value::Float(4.0)));
    }

    #[test]
    fn test_reads_through_stored_rows() {
        let a5 = VarName::new("a").at(5);
        let trace = Recorder::record("m", vec![], 1, |r, _| {
            let row = r.call(Op::Fill, args![false, 2_usize])?;
            let mut xs = r.call(Op::Fill, args![&row, 2_usize])?;
            let coin = r.dist(DistKind::Bernoulli, args![0.5])?;
            let dy = r.dist(DistKind::Filldist, args![&coin, 2_usize])?;
            let y = r.assume(a5.clone(), &dy)?;
            r.setindex(&mut xs, &y, args![0_usize])?;
            let v = r.call(Op::GetIndex, args![&xs, 0_usize, 1_usize])?;
            Ok(Arg::from(&v))
        })
        .unwrap();
        let g = extract(&trace).unwrap();
        let conts = continuations(&g).unwrap();
        let (r, _) = g.iter().find(|(_, s)| s.is_getindex()).unwrap();
        // a[5][1], not a[0][1]
        assert_eq!(conts[&r].as_ref(), &Cont::Variable(a5.at(1)));
        let env = Env::from_graph(&g).fixvalue(&a5.at(1), &Value::Bool(true)).unwrap();
        assert_eq!(conts[&r].eval(&env), Ok(Value::Bool(true)));
    }
}
