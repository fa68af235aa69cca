//! Builtin operations and user-supplied native functions.
use crate::data::dists::Dist;
use crate::data::errors::*;
use crate::data::name::Index;
use crate::data::value::Value;
use itertools::Itertools;
use std::fmt;
use std::sync::Arc;

/// Distribution constructors available as builtin calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DistKind {
    Bernoulli,
    Binomial,
    Categorical,
    DiscreteUniform,
    Poisson,
    Normal,
    Gamma,
    Beta,
    Dirichlet,
    Crp,
    /// `filldist(d, n)`: `n` independent copies of `d`
    Filldist,
    /// `product([d0, d1, ...])`
    Product,
}

impl DistKind {
    pub fn construct(&self, args: &[Value]) -> Result<Dist> {
        use DistKind::*;
        let arity = |n: usize| -> Result<()> {
            if args.len() == n {
                Ok(())
            } else {
                type_error(&format!("{} expects {} arguments, got {}", self, n, args.len()))
            }
        };
        let d = match self {
            Bernoulli => {
                arity(1)?;
                Dist::Bernoulli(args[0].as_float()?)
            }
            Binomial => {
                arity(2)?;
                Dist::Binomial(args[0].as_index()? as u64, args[1].as_float()?)
            }
            Categorical => {
                arity(1)?;
                Dist::Categorical(args[0].as_floats()?)
            }
            DiscreteUniform => {
                arity(2)?;
                Dist::DiscreteUniform(args[0].as_int()?, args[1].as_int()?)
            }
            Poisson => {
                arity(1)?;
                Dist::Poisson(args[0].as_float()?)
            }
            Normal => {
                arity(2)?;
                Dist::Normal(args[0].as_float()?, args[1].as_float()?)
            }
            Gamma => {
                arity(2)?;
                Dist::Gamma(args[0].as_float()?, args[1].as_float()?)
            }
            Beta => {
                arity(2)?;
                Dist::Beta(args[0].as_float()?, args[1].as_float()?)
            }
            Dirichlet => {
                arity(1)?;
                Dist::Dirichlet(args[0].as_floats()?)
            }
            Crp => {
                arity(2)?;
                let counts = args[1]
                    .as_array()?
                    .iter()
                    .map(|c| c.as_index().map(|c| c as u64))
                    .collect::<Result<Vec<_>>>()?;
                Dist::Crp {
                    alpha: args[0].as_float()?,
                    counts,
                }
            }
            Filldist => {
                arity(2)?;
                let d = args[0].as_dist()?;
                Dist::Product(vec![d.clone(); args[1].as_index()?])
            }
            Product => {
                arity(1)?;
                let ds = args[0]
                    .as_array()?
                    .iter()
                    .map(|d| d.as_dist().cloned())
                    .collect::<Result<Vec<_>>>()?;
                Dist::Product(ds)
            }
        };
        d.validate()?;
        Ok(d)
    }
}

impl fmt::Display for DistKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use DistKind::*;
        let s = match self {
            Bernoulli => "Bernoulli",
            Binomial => "Binomial",
            Categorical => "Categorical",
            DiscreteUniform => "DiscreteUniform",
            Poisson => "Poisson",
            Normal => "Normal",
            Gamma => "Gamma",
            Beta => "Beta",
            Dirichlet => "Dirichlet",
            Crp => "CRP",
            Filldist => "filldist",
            Product => "product",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Op {
    Identity,
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Pow,
    Sqrt,
    Exp,
    Log,
    /// `getindex(array, i...)`
    GetIndex,
    /// `setindex(array, value, i...)`; the recorder gives it in-place semantics
    SetIndex,
    Vector,
    /// `fill(v, n)`
    Fill,
    Length,
    Sum,
    /// `counts(zs)`: occupancy of each cluster label in `zs`
    Counts,
    Dist(DistKind),
}

fn arith(name: &str, args: &[Value], ints: fn(i64, i64) -> Option<i64>, floats: fn(f64, f64) -> f64) -> Result<Value> {
    match args {
        [Value::Int(a), Value::Int(b)] => match ints(*a, *b) {
            Some(c) => Ok(Value::Int(c)),
            None => type_error(&format!("integer overflow in {}", name)),
        },
        [a, b] => Ok(Value::Float(floats(a.as_float()?, b.as_float()?))),
        _ => type_error(&format!("{} expects 2 arguments, got {}", name, args.len())),
    }
}

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> Result<Value> {
    match args {
        [a] => Ok(Value::Float(f(a.as_float()?))),
        _ => type_error(&format!("{} expects 1 argument, got {}", name, args.len())),
    }
}

fn indices(args: &[Value]) -> Result<Vec<Index>> {
    args.iter().map(|i| i.as_index().map(Index::At)).collect()
}

impl Op {
    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        use Op::*;
        match self {
            Identity => match args {
                [v] => Ok(v.clone()),
                _ => type_error("identity expects 1 argument"),
            },
            Add => arith("+", args, i64::checked_add, |a, b| a + b),
            Sub => arith("-", args, i64::checked_sub, |a, b| a - b),
            Mul => arith("*", args, i64::checked_mul, |a, b| a * b),
            Div => match args {
                [a, b] => Ok(Value::Float(a.as_float()? / b.as_float()?)),
                _ => type_error("/ expects 2 arguments"),
            },
            Neg => match args {
                [Value::Int(i)] => match i.checked_neg() {
                    Some(n) => Ok(Value::Int(n)),
                    None => type_error("integer overflow in neg"),
                },
                _ => unary("neg", args, |a| -a),
            },
            Pow => match args {
                [a, b] => Ok(Value::Float(a.as_float()?.powf(b.as_float()?))),
                _ => type_error("pow expects 2 arguments"),
            },
            Sqrt => unary("sqrt", args, f64::sqrt),
            Exp => unary("exp", args, f64::exp),
            Log => unary("log", args, f64::ln),
            GetIndex => match args.split_first() {
                Some((arr, ixs)) if !ixs.is_empty() => arr.get_path(&indices(ixs)?),
                _ => type_error("getindex expects an array and at least one index"),
            },
            SetIndex => match args {
                [arr, v, ixs @ ..] if !ixs.is_empty() => arr.set_path(&indices(ixs)?, v.clone()),
                _ => type_error("setindex expects an array, a value and at least one index"),
            },
            Vector => Ok(Value::Array(args.to_vec())),
            Fill => match args {
                [v, n] => Ok(Value::Array(vec![v.clone(); n.as_index()?])),
                _ => type_error("fill expects a value and a length"),
            },
            Length => match args {
                [arr] => Ok(Value::Int(arr.as_array()?.len() as i64)),
                _ => type_error("length expects 1 argument"),
            },
            Sum => match args {
                [arr] => {
                    let vs = arr.as_array()?;
                    if vs.iter().all(|v| matches!(v, Value::Int(_))) {
                        Ok(Value::Int(vs.iter().map(Value::as_int).sum::<Result<i64>>()?))
                    } else {
                        Ok(Value::Float(vs.iter().map(Value::as_float).sum::<Result<f64>>()?))
                    }
                }
                _ => type_error("sum expects 1 argument"),
            },
            Counts => match args {
                [zs] => {
                    let zs = zs.as_array()?.iter().map(Value::as_index).collect::<Result<Vec<_>>>()?;
                    let k = zs.iter().max().map_or(0, |m| m + 1);
                    let mut counts = vec![0_i64; k];
                    for z in zs {
                        counts[z] += 1;
                    }
                    Ok(Value::ints(&counts))
                }
                _ => type_error("counts expects 1 argument"),
            },
            Dist(kind) => Ok(Value::Dist(kind.construct(args)?)),
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Op::*;
        let s = match self {
            Identity => "identity",
            Add => "+",
            Sub => "-",
            Mul => "*",
            Div => "/",
            Neg => "neg",
            Pow => "^",
            Sqrt => "sqrt",
            Exp => "exp",
            Log => "log",
            GetIndex => "getindex",
            SetIndex => "setindex!",
            Vector => "vector",
            Fill => "fill",
            Length => "length",
            Sum => "sum",
            Counts => "counts",
            Dist(k) => return write!(f, "{}", k),
        };
        write!(f, "{}", s)
    }
}

/// An opaque host function. Two natives are equal only if they share the
/// same closure.
#[derive(Clone)]
pub struct NativeFn {
    pub name: String,
    pub f: Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>,
}

impl NativeFn {
    pub fn new(name: &str, f: impl Fn(&[Value]) -> Result<Value> + Send + Sync + 'static) -> Self {
        NativeFn {
            name: name.to_string(),
            f: Arc::new(f),
        }
    }
}

impl PartialEq for NativeFn {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.f, &other.f)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFn({})", self.name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Function {
    Op(Op),
    Native(NativeFn),
}

impl Function {
    pub fn apply(&self, args: &[Value]) -> Result<Value> {
        match self {
            Function::Op(op) => op.apply(args),
            Function::Native(n) => (n.f)(args),
        }
    }
    pub fn is_getindex(&self) -> bool {
        matches!(self, Function::Op(Op::GetIndex))
    }
    pub fn is_setindex(&self) -> bool {
        matches!(self, Function::Op(Op::SetIndex))
    }
    pub fn dist_kind(&self) -> Option<DistKind> {
        match self {
            Function::Op(Op::Dist(k)) => Some(*k),
            _ => None,
        }
    }
}

impl From<Op> for Function {
    fn from(op: Op) -> Self {
        Function::Op(op)
    }
}
impl From<DistKind> for Function {
    fn from(k: DistKind) -> Self {
        Function::Op(Op::Dist(k))
    }
}
impl From<NativeFn> for Function {
    fn from(n: NativeFn) -> Self {
        Function::Native(n)
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Function::Op(op) => write!(f, "{}", op),
            Function::Native(n) => write!(f, "{}", n.name),
        }
    }
}

pub fn render_call(f: &impl fmt::Display, args: &[impl fmt::Display]) -> String {
    format!("{}({})", f, args.iter().join(", "))
}
