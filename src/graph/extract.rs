//! Slicing an execution trace into a minimal dependency graph.
use crate::data::*;
use crate::graph::*;
use crate::trace::*;
use indexmap::IndexMap;
use itertools::Itertools;
use tracing::{debug, span, trace, Level};

/// Decides whether the slicer unwinds a nested call or keeps it as an atomic
/// leaf. Arguments are the trace-time argument values.
pub trait Descend {
    fn descend(&self, target: &Target, args: &[Value]) -> bool;
}

impl<F> Descend for F
where
    F: Fn(&Target, &[Value]) -> bool,
{
    fn descend(&self, target: &Target, args: &[Value]) -> bool {
        self(target, args)
    }
}

/// Unwind sub-model invocations only.
#[derive(Clone, Copy, Debug, Default)]
pub struct ModelsOnly;

impl Descend for ModelsOnly {
    fn descend(&self, target: &Target, _args: &[Value]) -> bool {
        matches!(target, Target::Model(_))
    }
}

pub fn extract(trace: &Trace) -> Result<Graph> {
    extract_with(trace, &ModelsOnly)
}

pub fn extract_with(trace: &Trace, policy: &dyn Descend) -> Result<Graph> {
    let span = span!(Level::DEBUG, "extract");
    let _enter = span.enter();
    let top = toplevel(&trace.root)?;
    let mut s = Slicer::new(policy);
    let ret = s.unwind_toplevel(top)?;
    debug!("unwound {} trace nodes into {} statements", trace.size(), s.stmts.len());
    let g = s.slice(ret)?;
    debug!("{} statements survive slicing", g.len());
    Ok(g)
}

/// The root if it is a model call, otherwise the unique outermost model call
/// beneath it.
fn toplevel(root: &TraceNode) -> Result<&TraceNode> {
    fn outermost<'a>(n: &'a TraceNode, found: &mut Vec<&'a TraceNode>) {
        if n.is_model_call() {
            found.push(n);
        } else {
            for c in n.children() {
                outermost(c, found);
            }
        }
    }
    let mut found = vec![];
    outermost(root, &mut found);
    match found[..] {
        [top] => Ok(top),
        [] => structural("no model invocation in trace"),
        _ => structural(&format!(
            "{} top-level model invocations in trace",
            found.len()
        )),
    }
}

/// Bookkeeping for an in-place array update.
#[derive(Clone, Debug)]
struct Update {
    base: Operand,
    index: Vec<usize>,
    stored: Operand,
}

struct Slicer<'a> {
    policy: &'a dyn Descend,
    next: usize,
    stmts: IndexMap<Reference, Statement>,
    /// graph operand currently standing for each trace node
    origins: HashMap<NodeId, Operand>,
    /// trace-time value of each trace node, following in-place updates
    values: HashMap<NodeId, Value>,
    updates: HashMap<Reference, Update>,
}

impl<'a> Slicer<'a> {
    fn new(policy: &'a dyn Descend) -> Self {
        Slicer {
            policy,
            next: 0,
            stmts: Default::default(),
            origins: Default::default(),
            values: Default::default(),
            updates: Default::default(),
        }
    }

    fn emit(&mut self, s: Statement) -> Reference {
        self.next += 1;
        let r = Reference(self.next);
        trace!("{} := {:?}", r, s);
        self.stmts.insert(r, s);
        r
    }

    fn bind(&mut self, node: &TraceNode, op: Operand) {
        self.origins.insert(node.id, op);
        self.values.insert(node.id, node.value.clone());
    }

    fn resolve(&self, arg: &Arg) -> Result<Operand> {
        match arg {
            Arg::Literal(v) => Ok(Operand::Literal(v.clone())),
            Arg::Node(id) => match self.origins.get(id) {
                Some(op) => Ok(op.clone()),
                None => missing_dependency(&format!("trace node #{}", id)),
            },
        }
    }

    fn value_of(&self, arg: &Arg) -> Result<Value> {
        match arg {
            Arg::Literal(v) => Ok(v.clone()),
            Arg::Node(id) => match self.values.get(id) {
                Some(v) => Ok(v.clone()),
                None => missing_dependency(&format!("value of trace node #{}", id)),
            },
        }
    }

    /// Statement reference for an operand, materializing literals as constants.
    fn materialize(&mut self, op: Operand) -> Reference {
        match op {
            Operand::Ref(r) => r,
            Operand::Literal(value) => self.emit(Statement::Constant { value }),
        }
    }

    fn unwind_toplevel(&mut self, top: &TraceNode) -> Result<Option<Operand>> {
        let span = span!(Level::DEBUG, "toplevel", target = %describe(top));
        let _enter = span.enter();
        let mut ret = None;
        for child in top.children() {
            match &child.kind {
                NodeKind::Argument(_) => {
                    let r = self.emit(Statement::Constant {
                        value: child.value.clone(),
                    });
                    self.bind(child, Operand::Ref(r));
                }
                NodeKind::Return(arg) => ret = Some(self.resolve(arg)?),
                _ => self.visit(child)?,
            }
        }
        Ok(ret)
    }

    fn visit(&mut self, node: &TraceNode) -> Result<()> {
        match &node.kind {
            NodeKind::Constant => {
                let r = self.emit(Statement::Constant {
                    value: node.value.clone(),
                });
                self.bind(node, Operand::Ref(r));
                Ok(())
            }
            NodeKind::Argument(i) => structural(&format!(
                "parameter {} of trace node #{} outside of its call",
                i, node.id
            )),
            NodeKind::Return(_) => structural(&format!(
                "return node #{} outside of its call",
                node.id
            )),
            NodeKind::Call {
                target,
                args,
                children,
            } => self.visit_call(node, target, args, children),
        }
    }

    fn visit_call(
        &mut self,
        node: &TraceNode,
        target: &Target,
        args: &[Arg],
        children: &[TraceNode],
    ) -> Result<()> {
        let operands = args.iter().map(|a| self.resolve(a)).collect::<Result<Vec<_>>>()?;
        match target {
            Target::Assume(name) | Target::Observe(name) => {
                let dist = match operands.into_iter().next() {
                    Some(op) => self.materialize(op),
                    None => return structural(&format!("{} has no distribution", target)),
                };
                let (name, value) = (name.clone(), node.value.clone());
                let s = match target {
                    Target::Assume(_) => Statement::Assumption { name, dist, value },
                    _ => Statement::Observation { name, dist, value },
                };
                let r = self.emit(s);
                self.bind(node, Operand::Ref(r));
                Ok(())
            }
            _ => {
                let argvals = args.iter().map(|a| self.value_of(a)).collect::<Result<Vec<_>>>()?;
                if !children.is_empty() && self.policy.descend(target, &argvals) {
                    return self.descend(node, target, operands, children);
                }
                let f = match target {
                    Target::Function(f) => Callee::Static(f.clone()),
                    Target::Dynamic(id) => match self.resolve(&Arg::Node(*id))? {
                        Operand::Ref(r) => Callee::Dynamic(r),
                        Operand::Literal(v) => Callee::Static(v.as_func()?.clone()),
                    },
                    _ => {
                        return structural(&format!(
                            "{} at trace node #{} must be unwound",
                            target, node.id
                        ))
                    }
                };
                self.leaf(node, f, args, operands, &argvals)
            }
        }
    }

    fn descend(
        &mut self,
        node: &TraceNode,
        target: &Target,
        operands: Vec<Operand>,
        children: &[TraceNode],
    ) -> Result<()> {
        let span = span!(Level::DEBUG, "descend", target = %target);
        let _enter = span.enter();
        let mut ret = None;
        for child in children {
            match &child.kind {
                NodeKind::Argument(i) => match operands.get(*i) {
                    Some(op) => self.bind(child, op.clone()),
                    None => {
                        return structural(&format!(
                            "{} has no argument {} for parameter #{}",
                            target, i, child.id
                        ))
                    }
                },
                NodeKind::Return(arg) => ret = Some(self.resolve(arg)?),
                _ => self.visit(child)?,
            }
        }
        match ret {
            Some(op) => {
                self.bind(node, op);
                Ok(())
            }
            None => structural(&format!("{} at trace node #{} never returned", target, node.id)),
        }
    }

    fn leaf(
        &mut self,
        node: &TraceNode,
        f: Callee,
        args: &[Arg],
        operands: Vec<Operand>,
        argvals: &[Value],
    ) -> Result<()> {
        let setindex = matches!(&f, Callee::Static(fun) if fun.is_setindex());
        let getindex = matches!(&f, Callee::Static(fun) if fun.is_getindex());
        let trace_index = || {
            argvals
                .iter()
                .skip(if setindex { 2 } else { 1 })
                .map(Value::as_index)
                .collect::<Result<Vec<_>>>()
        };
        let definition = if getindex {
            let dynamic = operands.iter().skip(1).any(|o| o.reference().is_some());
            match operands.first() {
                Some(base) => self.definition_of(base, &trace_index()?, dynamic),
                None => None,
            }
        } else {
            None
        };
        let update = if setindex {
            match (args.first(), operands.first(), operands.get(1)) {
                (Some(Arg::Node(base_id)), Some(base), Some(stored)) => Some((
                    *base_id,
                    Update {
                        base: base.clone(),
                        index: trace_index()?,
                        stored: stored.clone(),
                    },
                )),
                _ => return structural(&format!("setindex at #{} has no array to update", node.id)),
            }
        } else {
            None
        };
        let r = self.emit(Statement::Call {
            definition,
            value: node.value.clone(),
            f,
            args: operands,
        });
        self.bind(node, Operand::Ref(r));
        if let Some((base_id, u)) = update {
            // later reads of the array see this statement
            self.origins.insert(base_id, Operand::Ref(r));
            self.values.insert(base_id, node.value.clone());
            self.updates.insert(r, u);
        }
        Ok(())
    }

    /// The tilde statement whose draw occupies `base[index...]` at trace time.
    /// An update that replaced the enclosing slice is followed into the
    /// stored value; one that replaced only part of the read leaves it
    /// untagged. With `dynamic` indices the read must hit an update at exactly
    /// the same position.
    fn definition_of(
        &self,
        base: &Operand,
        index: &[usize],
        dynamic: bool,
    ) -> Option<(VarName, Reference)> {
        let mut cur = base.reference()?;
        loop {
            if let Some(u) = self.updates.get(&cur) {
                let common = u.index.iter().zip(index).take_while(|(a, b)| a == b).count();
                if common < u.index.len() && common < index.len() {
                    // disjoint positions
                    cur = u.base.reference()?;
                    continue;
                }
                if index.len() < u.index.len() {
                    return None;
                }
                if index.len() == u.index.len() {
                    let src = u.stored.reference()?;
                    let (name, _) = self.stmts.get(&src)?.tilde()?;
                    let suffix = index.iter().map(|i| Index::At(*i)).collect_vec();
                    return if name.path().ends_with(&suffix) {
                        Some((name.clone(), src))
                    } else {
                        None
                    };
                }
                if dynamic {
                    return None;
                }
                return self.definition_of(&u.stored, &index[u.index.len()..], false);
            }
            let (name, _) = self.stmts.get(&cur)?.tilde()?;
            return Some((name.at_all(index), cur));
        }
    }

    /// Backward liveness from the tilde statements and the returned value,
    /// then dense renumbering.
    fn slice(self, ret: Option<Operand>) -> Result<Graph> {
        let mut live: HashSet<Reference> = self
            .stmts
            .iter()
            .filter(|(_, s)| s.is_tilde())
            .map(|(r, _)| *r)
            .collect();
        live.extend(ret.as_ref().and_then(Operand::reference));
        for (r, s) in self.stmts.iter().rev() {
            if live.contains(r) {
                live.extend(s.dependencies());
            }
        }
        let kept = self
            .stmts
            .into_iter()
            .filter(|(r, _)| live.contains(r))
            .collect_vec();
        let renumber: HashMap<Reference, Reference> = kept
            .iter()
            .enumerate()
            .map(|(i, (r, _))| (*r, Reference(i + 1)))
            .collect();
        let mut g = Graph::new();
        for (r, s) in kept.iter() {
            let s = s.try_map_refs(|d| match renumber.get(&d) {
                Some(n) => Ok(*n),
                None => missing_dependency(&format!("statement {}", d)),
            })?;
            g.push(renumber[r], s);
        }
        Ok(g)
    }
}

fn describe(n: &TraceNode) -> String {
    match &n.kind {
        NodeKind::Call { target, .. } => target.to_string(),
        _ => format!("#{}", n.id),
    }
}
