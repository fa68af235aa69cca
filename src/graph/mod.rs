//! Sliced dependency graphs in SSA form.
use crate::data::*;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

pub mod extract;
pub use extract::*;

/// Node identifier within a [`Graph`]. References increase in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reference(pub usize);

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "⟨{}⟩", self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Ref(Reference),
    Literal(Value),
}

impl Operand {
    pub fn reference(&self) -> Option<Reference> {
        match self {
            Operand::Ref(r) => Some(*r),
            Operand::Literal(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Ref(r) => write!(f, "{}", r),
            Operand::Literal(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Callee {
    Static(Function),
    /// a function value computed by another statement
    Dynamic(Reference),
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callee::Static(fun) => write!(f, "{}", fun),
            Callee::Dynamic(r) => write!(f, "{}", r),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Constant {
        value: Value,
    },
    Call {
        /// set on element reads whose slot holds the value of a tilde statement
        definition: Option<(VarName, Reference)>,
        value: Value,
        f: Callee,
        args: Vec<Operand>,
    },
    Assumption {
        name: VarName,
        dist: Reference,
        value: Value,
    },
    Observation {
        name: VarName,
        dist: Reference,
        value: Value,
    },
}

impl Statement {
    pub fn value(&self) -> &Value {
        match self {
            Statement::Constant { value }
            | Statement::Call { value, .. }
            | Statement::Assumption { value, .. }
            | Statement::Observation { value, .. } => value,
        }
    }

    /// Name and distribution reference of a tilde statement.
    pub fn tilde(&self) -> Option<(&VarName, Reference)> {
        match self {
            Statement::Assumption { name, dist, .. } | Statement::Observation { name, dist, .. } => {
                Some((name, *dist))
            }
            _ => None,
        }
    }

    pub fn is_tilde(&self) -> bool {
        self.tilde().is_some()
    }

    pub fn is_getindex(&self) -> bool {
        matches!(self, Statement::Call { f: Callee::Static(f), .. } if f.is_getindex())
    }

    /// Every reference this statement reads.
    pub fn dependencies(&self) -> Vec<Reference> {
        match self {
            Statement::Constant { .. } => vec![],
            Statement::Call {
                definition, f, args, ..
            } => {
                let callee = match f {
                    Callee::Dynamic(r) => Some(*r),
                    Callee::Static(_) => None,
                };
                callee
                    .into_iter()
                    .chain(args.iter().filter_map(Operand::reference))
                    .chain(definition.iter().map(|(_, src)| *src))
                    .collect()
            }
            Statement::Assumption { dist, .. } | Statement::Observation { dist, .. } => vec![*dist],
        }
    }

    pub fn try_map_refs<F>(&self, mut f: F) -> Result<Statement>
    where
        F: FnMut(Reference) -> Result<Reference>,
    {
        let s = match self {
            Statement::Constant { value } => Statement::Constant {
                value: value.clone(),
            },
            Statement::Call {
                definition,
                value,
                f: callee,
                args,
            } => Statement::Call {
                definition: match definition {
                    Some((n, src)) => Some((n.clone(), f(*src)?)),
                    None => None,
                },
                value: value.clone(),
                f: match callee {
                    Callee::Dynamic(r) => Callee::Dynamic(f(*r)?),
                    Callee::Static(fun) => Callee::Static(fun.clone()),
                },
                args: args
                    .iter()
                    .map(|a| match a {
                        Operand::Ref(r) => f(*r).map(Operand::Ref),
                        Operand::Literal(v) => Ok(Operand::Literal(v.clone())),
                    })
                    .collect::<Result<_>>()?,
            },
            Statement::Assumption { name, dist, value } => Statement::Assumption {
                name: name.clone(),
                dist: f(*dist)?,
                value: value.clone(),
            },
            Statement::Observation { name, dist, value } => Statement::Observation {
                name: name.clone(),
                dist: f(*dist)?,
                value: value.clone(),
            },
        };
        Ok(s)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graph {
    statements: IndexMap<Reference, Statement>,
}

impl Graph {
    pub fn new() -> Self {
        Default::default()
    }
    pub(crate) fn push(&mut self, r: Reference, s: Statement) {
        self.statements.insert(r, s);
    }
    pub fn len(&self) -> usize {
        self.statements.len()
    }
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
    pub fn get(&self, r: Reference) -> Option<&Statement> {
        self.statements.get(&r)
    }
    pub fn position(&self, r: Reference) -> Option<usize> {
        self.statements.get_index_of(&r)
    }
    pub fn iter(&self) -> impl Iterator<Item = (Reference, &Statement)> {
        self.statements.iter().map(|(r, s)| (*r, s))
    }
    pub fn references(&self) -> impl Iterator<Item = Reference> + '_ {
        self.statements.keys().copied()
    }
    pub fn tildes(&self) -> impl Iterator<Item = (Reference, &VarName, &Statement)> {
        self.iter()
            .filter_map(|(r, s)| s.tilde().map(|(name, _)| (r, name, s)))
    }
    pub fn assumptions(&self) -> impl Iterator<Item = (&VarName, &Value)> {
        self.statements.values().filter_map(|s| match s {
            Statement::Assumption { name, value, .. } => Some((name, value)),
            _ => None,
        })
    }
    pub fn observations(&self) -> impl Iterator<Item = (&VarName, &Value)> {
        self.statements.values().filter_map(|s| match s {
            Statement::Observation { name, value, .. } => Some((name, value)),
            _ => None,
        })
    }

    /// References read by some statement but absent from the graph.
    pub fn dangling(&self) -> Vec<Reference> {
        self.statements
            .values()
            .flat_map(Statement::dependencies)
            .filter(|r| !self.statements.contains_key(r))
            .unique()
            .collect()
    }

    /// Check that references increase and every dependency precedes its use.
    pub fn validate(&self) -> Result<()> {
        if let Some(r) = self.dangling().first() {
            return structural(&format!("dangling reference {}", r));
        }
        for ((a, _), (b, _)) in self.statements.iter().tuple_windows() {
            if a >= b {
                return structural(&format!("reference {} does not precede {}", a, b));
            }
        }
        for (r, s) in self.iter() {
            if let Some(d) = s.dependencies().into_iter().find(|d| *d >= r) {
                return structural(&format!("{} depends on later statement {}", r, d));
            }
        }
        Ok(())
    }

    /// Distribution-constructor calls read only by tilde statements; these are
    /// printed inline with the tildes that consume them.
    fn fused(&self) -> HashSet<Reference> {
        let mut readers: HashMap<Reference, Vec<bool>> = HashMap::default();
        for (_, s) in self.iter() {
            for d in s.dependencies() {
                readers.entry(d).or_default().push(s.is_tilde());
            }
        }
        self.iter()
            .filter(|(r, s)| {
                matches!(s, Statement::Call { f: Callee::Static(f), .. } if f.dist_kind().is_some())
                    && readers.get(r).map_or(false, |rs| rs.iter().all(|t| *t))
            })
            .map(|(r, _)| r)
            .collect()
    }

    fn render_dist(&self, dist: Reference, fused: &HashSet<Reference>) -> String {
        match self.get(dist) {
            Some(Statement::Call { f, args, .. }) if fused.contains(&dist) => render_call(f, args),
            _ => format!("{}", dist),
        }
    }
}

impl std::ops::Index<usize> for Graph {
    type Output = Statement;
    fn index(&self, i: usize) -> &Statement {
        &self.statements[i]
    }
}

impl std::ops::Index<Reference> for Graph {
    type Output = Statement;
    fn index(&self, r: Reference) -> &Statement {
        &self.statements[&r]
    }
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fused = self.fused();
        for (r, s) in self.iter() {
            match s {
                _ if fused.contains(&r) => continue,
                Statement::Constant { value } => writeln!(f, "{} = {}", r, value)?,
                Statement::Call {
                    definition,
                    value,
                    f: callee,
                    args,
                } => {
                    write!(f, "{} = {} => {}", r, render_call(callee, args), value)?;
                    if let Some((name, src)) = definition {
                        write!(f, "  [{} from {}]", name, src)?;
                    }
                    writeln!(f)?;
                }
                Statement::Assumption { name, dist, value } => {
                    writeln!(f, "{} {} ~ {} => {}", r, name, self.render_dist(*dist, &fused), value)?
                }
                Statement::Observation { name, dist, value } => {
                    writeln!(f, "{} {} ≃ {} <= {}", r, name, self.render_dist(*dist, &fused), value)?
                }
            }
        }
        Ok(())
    }
}

impl Env {
    /// The trace-time value of every tilde statement.
    pub fn from_graph(g: &Graph) -> Env {
        g.tildes()
            .map(|(_, name, s)| (name.clone(), s.value().clone()))
            .collect()
    }
}
