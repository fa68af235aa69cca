use crate::compile::*;
use crate::data::*;
use crate::graph::*;
use crate::inference::*;
use crate::trace::Trace;
use rand::rngs::StdRng;

#[derive(Debug, Clone)]
pub struct Options {
    pub seed: Option<u64>,
    /// score a new cluster with one draw from its base measure instead of
    /// refusing clustering-process targets
    pub approximate_new_cluster: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            seed: None,
            approximate_new_cluster: true,
        }
    }
}

impl Options {
    pub fn rng(&self) -> StdRng {
        match self.seed {
            None => rand::SeedableRng::from_entropy(),
            Some(s) => rand::SeedableRng::seed_from_u64(s),
        }
    }
    pub fn seed(s: u64) -> Self {
        Self {
            seed: Some(s),
            ..Default::default()
        }
    }
    /// exact discrete conditionals only
    pub fn strict() -> Self {
        Self {
            approximate_new_cluster: false,
            ..Default::default()
        }
    }
    pub fn new(seed: Option<u64>, approximate_new_cluster: bool) -> Self {
        Self {
            seed,
            approximate_new_cluster,
        }
    }
}

pub fn extract_graph(trace: &Trace) -> Result<Graph> {
    extract(trace)
}

pub fn build_continuations(graph: &Graph) -> Result<Continuations> {
    continuations(graph)
}

pub fn conditionals_for(graph: &Graph, pattern: &VarName) -> Result<Conditionals> {
    conditionals(graph, pattern)
}

pub fn evaluate(conditional: &GibbsConditional, env: &Env) -> Result<Conditional> {
    conditional.evaluate(env)
}

/// Trace to conditionals in one go, evaluated at the trace-time assignment.
pub fn conditionals_at_trace(
    trace: &Trace,
    pattern: &VarName,
    opts: &Options,
) -> Result<(Graph, Vec<(VarName, Conditional)>)> {
    let graph = extract_graph(trace)?;
    let env = Env::from_graph(&graph);
    let conds = conditionals_for(&graph, pattern)?
        .into_iter()
        .map(|(name, c)| Ok((name, c.evaluate_with(&env, opts)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok((graph, conds))
}
