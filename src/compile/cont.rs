//! Continuations: closed-form functions from a variable assignment to a value.
use crate::data::*;
use indexmap::IndexSet;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// The function of a [`Transformation`]: a builtin, or a continuation that
/// computes a function value.
#[derive(Clone, Debug, PartialEq)]
pub enum Applied {
    Static(Function),
    Dynamic(Arc<Cont>),
}

impl Applied {
    fn resolve(&self, env: &Env) -> Result<Function> {
        match self {
            Applied::Static(f) => Ok(f.clone()),
            Applied::Dynamic(c) => Ok(c.eval(env)?.as_func()?.clone()),
        }
    }
    pub fn is_getindex(&self) -> bool {
        matches!(self, Applied::Static(f) if f.is_getindex())
    }
}

impl fmt::Display for Applied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Applied::Static(fun) => write!(f, "{}", fun),
            Applied::Dynamic(c) => write!(f, "({})", c),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transformation {
    pub f: Applied,
    pub args: Vec<Arc<Cont>>,
}

impl Transformation {
    pub fn new(f: Applied, args: Vec<Arc<Cont>>) -> Self {
        Transformation { f, args }
    }

    pub fn eval(&self, env: &Env) -> Result<Value> {
        // reads of named array elements resolve by name
        if let Some(name) = self.indexed_variable(env)? {
            return env.lookup(&name);
        }
        let f = self.f.resolve(env)?;
        let args = self.args.iter().map(|a| a.eval(env)).collect::<Result<Vec<_>>>()?;
        f.apply(&args)
    }

    /// `getindex(Variable(x), i...)` evaluates to the name `x[i...]`.
    fn indexed_variable(&self, env: &Env) -> Result<Option<VarName>> {
        match self.getindex_base() {
            Some((base, ixs)) => {
                let ixs = ixs
                    .iter()
                    .map(|i| i.eval(env)?.as_index())
                    .collect::<Result<Vec<_>>>()?;
                Ok(Some(base.at_all(&ixs)))
            }
            None => Ok(None),
        }
    }

    /// Base variable and index arguments of a by-name element read.
    pub fn getindex_base(&self) -> Option<(&VarName, &[Arc<Cont>])> {
        if !self.f.is_getindex() {
            return None;
        }
        match self.args.split_first() {
            Some((base, ixs)) if !ixs.is_empty() => match base.as_ref() {
                Cont::Variable(x) => Some((x, ixs)),
                _ => None,
            },
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogLikelihood {
    /// the distribution at trace time
    pub dist: Dist,
    pub f: Applied,
    pub args: Vec<Arc<Cont>>,
    pub value: Arc<Cont>,
}

impl LogLikelihood {
    pub fn distribution(&self, env: &Env) -> Result<Dist> {
        let f = self.f.resolve(env)?;
        let args = self.args.iter().map(|a| a.eval(env)).collect::<Result<Vec<_>>>()?;
        Ok(f.apply(&args)?.as_dist()?.clone())
    }

    /// `log p(value | args)` under `env`.
    pub fn eval(&self, env: &Env) -> Result<f64> {
        let d = self.distribution(env)?;
        d.logpdf(&self.value.eval(env)?)
    }

    /// Random variables feeding the construction of the distribution.
    pub fn parents(&self) -> IndexSet<VarName> {
        let mut out = IndexSet::new();
        let mut seen = HashSet::default();
        if let Applied::Dynamic(c) = &self.f {
            c.collect_parents(&mut out, &mut seen);
        }
        for a in &self.args {
            a.collect_parents(&mut out, &mut seen);
        }
        out
    }

    pub fn args(&self) -> &[Arc<Cont>] {
        &self.args
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Cont {
    Fixed(Value),
    Variable(VarName),
    Transformation(Transformation),
    LogLikelihood(LogLikelihood),
}

impl Cont {
    pub fn eval(&self, env: &Env) -> Result<Value> {
        match self {
            Cont::Fixed(v) => Ok(v.clone()),
            Cont::Variable(name) => env.lookup(name),
            Cont::Transformation(t) => t.eval(env),
            Cont::LogLikelihood(ll) => Ok(Value::Float(ll.eval(env)?)),
        }
    }

    pub fn as_loglikelihood(&self) -> Option<&LogLikelihood> {
        match self {
            Cont::LogLikelihood(ll) => Some(ll),
            _ => None,
        }
    }

    pub fn parents(&self) -> IndexSet<VarName> {
        let mut out = IndexSet::new();
        self.collect_parents(&mut out, &mut HashSet::default());
        out
    }

    fn collect_parents(&self, out: &mut IndexSet<VarName>, seen: &mut HashSet<*const Cont>) {
        if !seen.insert(self as *const Cont) {
            return;
        }
        match self {
            Cont::Fixed(_) => {}
            Cont::Variable(name) => {
                out.insert(name.clone());
            }
            Cont::Transformation(t) => match t.getindex_base() {
                Some((base, ixs)) => {
                    let fixed = ixs
                        .iter()
                        .map(|i| match i.as_ref() {
                            Cont::Fixed(v) => v.as_index().ok(),
                            _ => None,
                        })
                        .collect::<Option<Vec<_>>>();
                    match fixed {
                        Some(ixs) => {
                            out.insert(base.at_all(&ixs));
                        }
                        None => {
                            out.insert(base.clone());
                            for i in ixs {
                                i.collect_parents(out, seen);
                            }
                        }
                    }
                }
                None => {
                    if let Applied::Dynamic(c) = &t.f {
                        c.collect_parents(out, seen);
                    }
                    for a in &t.args {
                        a.collect_parents(out, seen);
                    }
                }
            },
            Cont::LogLikelihood(ll) => {
                if let Applied::Dynamic(c) = &ll.f {
                    c.collect_parents(out, seen);
                }
                for a in ll.args.iter().chain([&ll.value]) {
                    a.collect_parents(out, seen);
                }
            }
        }
    }

    /// A family `f` read as `getindex(Variable(f), idx...)` somewhere below this
    /// continuation, where the index depends on `target`.
    pub fn indexed_family(&self, target: &VarName) -> Option<VarName> {
        match self {
            Cont::Fixed(_) | Cont::Variable(_) => None,
            Cont::Transformation(t) => {
                if let Some((base, ixs)) = t.getindex_base() {
                    let depends = ixs
                        .iter()
                        .any(|i| i.parents().iter().any(|p| p.relation(target).overlaps()));
                    if depends {
                        return Some(base.clone());
                    }
                }
                let dynamic = match &t.f {
                    Applied::Dynamic(c) => Some(c),
                    Applied::Static(_) => None,
                };
                dynamic
                    .into_iter()
                    .chain(t.args.iter())
                    .find_map(|a| a.indexed_family(target))
            }
            Cont::LogLikelihood(ll) => ll.args.iter().find_map(|a| a.indexed_family(target)),
        }
    }
}

impl fmt::Display for Cont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cont::Fixed(v) => write!(f, "{}", v),
            Cont::Variable(name) => write!(f, "{}", name),
            Cont::Transformation(t) => write!(f, "{}({})", t.f, t.args.iter().join(", ")),
            Cont::LogLikelihood(ll) => write!(f, "{}", ll),
        }
    }
}

impl fmt::Display for LogLikelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "logpdf({}({}), {})",
            self.f,
            self.args.iter().join(", "),
            self.value
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(s: &str) -> Arc<Cont> {
        Arc::new(Cont::Variable(VarName::new(s)))
    }
    fn fixed(v: impl Into<Value>) -> Arc<Cont> {
        Arc::new(Cont::Fixed(v.into()))
    }
    fn getindex(base: Arc<Cont>, i: Arc<Cont>) -> Arc<Cont> {
        Arc::new(Cont::Transformation(Transformation::new(
            Applied::Static(Op::GetIndex.into()),
            vec![base, i],
        )))
    }

    #[test]
    fn test_eval_resolves_elements_by_name() {
        let env: Env = vec![
            (VarName::new("mu").at(0), Value::Float(-1.0)),
            (VarName::new("mu").at(1), Value::Float(2.0)),
            (VarName::new("z"), Value::ints(&[1, 0])),
        ]
        .into_iter()
        .collect();
        let zi = getindex(var("z"), fixed(0_i64));
        let m = getindex(var("mu"), zi);
        assert_eq!(m.eval(&env), Ok(Value::Float(2.0)));
        // no array named mu is stored, so only the by-name read succeeds
        assert!(var("mu").eval(&env).is_err());
    }

    #[test]
    fn test_loglikelihood() {
        let ll = LogLikelihood {
            dist: Dist::Normal(0.0, 1.0),
            f: Applied::Static(DistKind::Normal.into()),
            args: vec![var("m"), fixed(1.0)],
            value: var("x"),
        };
        let env: Env = vec![
            (VarName::new("m"), Value::Float(1.0)),
            (VarName::new("x"), Value::Float(1.0)),
        ]
        .into_iter()
        .collect();
        let expected = -0.5 * (2.0 * std::f64::consts::PI).ln();
        assert!((ll.eval(&env).unwrap() - expected).abs() < 1e-12);
        assert_eq!(ll.parents().into_iter().collect::<Vec<_>>(), vec![VarName::new("m")]);
    }

    #[test]
    fn test_parents_of_indexed_reads() {
        let fixed_read = getindex(var("z"), fixed(3_i64));
        assert_eq!(
            fixed_read.parents().into_iter().collect::<Vec<_>>(),
            vec![VarName::new("z").at(3)]
        );
        let dynamic = getindex(var("mu"), fixed_read);
        assert_eq!(
            dynamic.parents().into_iter().collect::<Vec<_>>(),
            vec![VarName::new("mu"), VarName::new("z").at(3)]
        );
        assert_eq!(
            dynamic.indexed_family(&VarName::new("z").at(3)),
            Some(VarName::new("mu"))
        );
        assert_eq!(dynamic.indexed_family(&VarName::new("z").at(2)), None);
    }
}
