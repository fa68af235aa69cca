//! A small tracer. Models are written as ordinary Rust closures against the
//! [`Recorder`] API, which evaluates every operation eagerly and records it.
use crate::data::*;
use crate::trace::*;
use itertools::Itertools;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, span, trace, Level};

/// The output of a recorded node together with its current value.
#[derive(Clone, Debug, PartialEq)]
pub struct Handle {
    pub id: NodeId,
    pub value: Value,
}

impl From<&Handle> for Arg {
    fn from(h: &Handle) -> Self {
        Arg::Node(h.id)
    }
}
impl From<Value> for Arg {
    fn from(v: Value) -> Self {
        Arg::Literal(v)
    }
}
impl From<f64> for Arg {
    fn from(x: f64) -> Self {
        Arg::Literal(Value::Float(x))
    }
}
impl From<i64> for Arg {
    fn from(x: i64) -> Self {
        Arg::Literal(Value::Int(x))
    }
}
impl From<usize> for Arg {
    fn from(x: usize) -> Self {
        Arg::Literal(Value::from(x))
    }
}
impl From<bool> for Arg {
    fn from(x: bool) -> Self {
        Arg::Literal(Value::Bool(x))
    }
}

/// `args![&h, 1.0, 3_usize]`
#[macro_export]
macro_rules! args {
    ($($x:expr),* $(,)?) => {
        vec![$($crate::trace::Arg::from($x)),*]
    };
}

pub struct Recorder {
    next: NodeId,
    rng: StdRng,
    values: HashMap<NodeId, Value>,
    current: Vec<TraceNode>,
    parents: Vec<Vec<TraceNode>>,
}

impl Recorder {
    pub fn new(seed: u64) -> Self {
        Recorder {
            next: 0,
            rng: StdRng::seed_from_u64(seed),
            values: Default::default(),
            current: vec![],
            parents: vec![],
        }
    }

    /// Run `body` as the model `name` applied to `data` and return its trace.
    pub fn record<F>(name: &str, data: Vec<Value>, seed: u64, body: F) -> Result<Trace>
    where
        F: FnOnce(&mut Recorder, &[Handle]) -> Result<Arg>,
    {
        let mut rec = Recorder::new(seed);
        rec.model(name, data.into_iter().map(Arg::Literal).collect(), body)?;
        rec.finish()
    }

    /// Close the recording. Exactly one top-level node must have been recorded.
    pub fn finish(mut self) -> Result<Trace> {
        if !self.parents.is_empty() {
            return structural("recording finished inside an open call");
        }
        match (self.current.pop(), self.current.is_empty()) {
            (Some(root), true) => Ok(Trace { root }),
            (None, _) => structural("nothing was recorded"),
            (Some(_), false) => structural("more than one top-level node was recorded"),
        }
    }

    fn fresh(&mut self) -> NodeId {
        self.next += 1;
        self.next
    }

    fn push(&mut self, kind: NodeKind, value: Value) -> Handle {
        let id = self.fresh();
        self.values.insert(id, value.clone());
        self.current.push(TraceNode {
            id,
            kind,
            value: value.clone(),
        });
        Handle { id, value }
    }

    fn value_of(&self, arg: &Arg) -> Result<Value> {
        match arg {
            Arg::Literal(v) => Ok(v.clone()),
            Arg::Node(id) => match self.values.get(id) {
                Some(v) => Ok(v.clone()),
                None => missing_dependency(&format!("trace node #{}", id)),
            },
        }
    }

    fn values_of(&self, args: &[Arg]) -> Result<Vec<Value>> {
        args.iter().map(|a| self.value_of(a)).collect()
    }

    pub fn constant(&mut self, v: impl Into<Value>) -> Handle {
        self.push(NodeKind::Constant, v.into())
    }

    /// Apply a function atomically.
    pub fn call(&mut self, f: impl Into<Function>, args: Vec<Arg>) -> Result<Handle> {
        let f = f.into();
        let value = f.apply(&self.values_of(&args)?)?;
        trace!("{} => {}", render_call(&f, &args.iter().map(|a| format!("{:?}", a)).collect_vec()), value);
        let target = Target::Function(f);
        Ok(self.push(
            NodeKind::Call {
                target,
                args,
                children: vec![],
            },
            value,
        ))
    }

    /// Apply a function value computed earlier in the program.
    pub fn call_dynamic(&mut self, f: &Handle, args: Vec<Arg>) -> Result<Handle> {
        let value = f.value.as_func()?.apply(&self.values_of(&args)?)?;
        Ok(self.push(
            NodeKind::Call {
                target: Target::Dynamic(f.id),
                args,
                children: vec![],
            },
            value,
        ))
    }

    pub fn dist(&mut self, kind: DistKind, args: Vec<Arg>) -> Result<Handle> {
        self.call(kind, args)
    }

    /// `name ~ dist`, drawing a fresh value.
    pub fn assume(&mut self, name: VarName, dist: &Handle) -> Result<Handle> {
        let value = dist.value.as_dist()?.sample(&mut self.rng)?;
        self.assume_with(name, dist, value)
    }

    /// `name ~ dist` with a predetermined draw.
    pub fn assume_with(&mut self, name: VarName, dist: &Handle, value: Value) -> Result<Handle> {
        self.tilde(Target::Assume(name), dist, value)
    }

    /// `name ~ dist` where `name` was supplied as data.
    pub fn observe(&mut self, name: VarName, dist: &Handle, value: Value) -> Result<Handle> {
        self.tilde(Target::Observe(name), dist, value)
    }

    fn tilde(&mut self, target: Target, dist: &Handle, value: Value) -> Result<Handle> {
        dist.value.as_dist()?;
        debug!("{} = {}", target, value);
        Ok(self.push(
            NodeKind::Call {
                target,
                args: vec![Arg::from(dist)],
                children: vec![],
            },
            value,
        ))
    }

    /// `arr[idx...] = v` in place: `arr` keeps its identity and later reads of
    /// it observe the update.
    pub fn setindex(&mut self, arr: &mut Handle, v: impl Into<Arg>, idx: Vec<Arg>) -> Result<()> {
        let args = [vec![Arg::from(&*arr), v.into()], idx].concat();
        let updated = self.call(Op::SetIndex, args)?;
        self.values.insert(arr.id, updated.value.clone());
        arr.value = updated.value;
        Ok(())
    }

    /// Invoke a sub-model; its body is recorded beneath the call.
    pub fn model<F>(&mut self, name: &str, args: Vec<Arg>, body: F) -> Result<Handle>
    where
        F: FnOnce(&mut Recorder, &[Handle]) -> Result<Arg>,
    {
        self.traced(Target::Model(name.to_string()), args, body)
    }

    /// Invoke a host function whose internals are also recorded. `body` must
    /// compute what `f` computes.
    pub fn native<F>(&mut self, f: NativeFn, args: Vec<Arg>, body: F) -> Result<Handle>
    where
        F: FnOnce(&mut Recorder, &[Handle]) -> Result<Arg>,
    {
        self.traced(Target::Function(Function::Native(f)), args, body)
    }

    fn traced<F>(&mut self, target: Target, args: Vec<Arg>, body: F) -> Result<Handle>
    where
        F: FnOnce(&mut Recorder, &[Handle]) -> Result<Arg>,
    {
        let span = span!(Level::TRACE, "call", target = %target);
        let _enter = span.enter();
        let id = self.fresh();
        let vals = self.values_of(&args)?;

        self.parents.push(std::mem::take(&mut self.current));
        let params = vals
            .into_iter()
            .enumerate()
            .map(|(i, v)| self.push(NodeKind::Argument(i), v))
            .collect_vec();
        let ret = body(self, &params).and_then(|ret| {
            let v = self.value_of(&ret)?;
            self.push(NodeKind::Return(ret), v.clone());
            Ok(v)
        });
        let outer = self.parents.pop().unwrap_or_default();
        let children = std::mem::replace(&mut self.current, outer);
        let value = ret?;

        self.values.insert(id, value.clone());
        self.current.push(TraceNode {
            id,
            kind: NodeKind::Call {
                target,
                args,
                children,
            },
            value: value.clone(),
        });
        Ok(Handle { id, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_shape() {
        let trace = Recorder::record("m", vec![Value::Float(1.4)], 0, |r, data| {
            let d = r.dist(DistKind::Normal, args![0.0, 1.0])?;
            let m = r.assume(VarName::new("m"), &d)?;
            let d2 = r.dist(DistKind::Normal, args![&m, 1.0])?;
            r.observe(VarName::new("x"), &d2, data[0].value.clone())?;
            Ok(Arg::from(&m))
        })
        .unwrap();
        assert!(trace.root.is_model_call());
        let kids = trace.root.children();
        // argument, 4 operations, return
        assert_eq!(kids.len(), 6);
        assert_eq!(kids[0].kind, NodeKind::Argument(0));
        assert!(matches!(kids[5].kind, NodeKind::Return(Arg::Node(_))));
        assert_eq!(trace.root.value, kids[2].value);
        assert_eq!(trace.find(kids[4].id).map(|n| &n.value), Some(&Value::Float(1.4)));
    }

    #[test]
    fn test_setindex_in_place() {
        let trace = Recorder::record("m", vec![], 0, |r, _| {
            let mut xs = r.call(Op::Fill, args![0_i64, 2_usize])?;
            r.setindex(&mut xs, 5_i64, args![1_usize])?;
            let y = r.call(Op::GetIndex, args![&xs, 1_usize])?;
            assert_eq!(y.value, Value::Int(5));
            Ok(Arg::from(&xs))
        })
        .unwrap();
        assert_eq!(trace.root.value, Value::ints(&[0, 5]));
    }

    #[test]
    fn test_errors_restore_frames() {
        let mut rec = Recorder::new(0);
        let res = rec.model("bad", vec![], |r, _| {
            r.call(Op::Sqrt, args![true, 1.0])?;
            Ok(Arg::from(1.0))
        });
        assert!(res.is_err());
        assert!(matches!(rec.finish(), Err(GibbsError::StructuralTrace(_))));
    }
}
