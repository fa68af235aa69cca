//! Execution traces: the tree of operations performed during one run of a
//! probabilistic program.
use crate::data::*;
use std::fmt;

pub mod record;
pub use record::*;

pub type NodeId = usize;

/// An argument of a recorded call: the output of an earlier node, or a literal.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Node(NodeId),
    Literal(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    Function(Function),
    /// a function value produced by an earlier node
    Dynamic(NodeId),
    /// invocation of a (sub-)model
    Model(String),
    /// draw a value for the named variable from the distribution argument
    Assume(VarName),
    /// score the recorded value of the named variable against the distribution argument
    Observe(VarName),
}

impl Target {
    pub fn is_tilde(&self) -> bool {
        matches!(self, Target::Assume(_) | Target::Observe(_))
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Function(fun) => write!(f, "{}", fun),
            Target::Dynamic(id) => write!(f, "#{}", id),
            Target::Model(m) => write!(f, "model {}", m),
            Target::Assume(n) => write!(f, "assume {}", n),
            Target::Observe(n) => write!(f, "observe {}", n),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Constant,
    /// the i-th parameter of the enclosing call
    Argument(usize),
    Call {
        target: Target,
        args: Vec<Arg>,
        children: Vec<TraceNode>,
    },
    /// the value handed back by the enclosing call
    Return(Arg),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TraceNode {
    pub id: NodeId,
    pub kind: NodeKind,
    pub value: Value,
}

impl TraceNode {
    pub fn children(&self) -> &[TraceNode] {
        match &self.kind {
            NodeKind::Call { children, .. } => children,
            _ => &[],
        }
    }
    pub fn is_model_call(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Call {
                target: Target::Model(_),
                ..
            }
        )
    }
    pub fn find(&self, id: NodeId) -> Option<&TraceNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|c| c.find(id))
    }
    pub fn size(&self) -> usize {
        1 + self.children().iter().map(TraceNode::size).sum::<usize>()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Trace {
    pub root: TraceNode,
}

impl Trace {
    pub fn find(&self, id: NodeId) -> Option<&TraceNode> {
        self.root.find(id)
    }
    pub fn size(&self) -> usize {
        self.root.size()
    }
}
