//! Systematic-scan Gibbs sampling over discrete conditionals.
use crate::compile::GibbsConditional;
use crate::data::*;
use crate::pipeline::Options;
use rand::rngs::StdRng;
use tracing::{debug, info, span, Level};

pub struct GibbsSampler {
    conditionals: Vec<GibbsConditional>,
    opts: Options,
    rng: StdRng,
}

impl GibbsSampler {
    pub fn new(conditionals: impl IntoIterator<Item = GibbsConditional>, opts: Options) -> Self {
        let rng = opts.rng();
        GibbsSampler {
            conditionals: conditionals.into_iter().collect(),
            opts,
            rng,
        }
    }

    pub fn targets(&self) -> impl Iterator<Item = &VarName> {
        self.conditionals.iter().map(|c| &c.name)
    }

    /// Resample every target once, in order, each conditioned on the latest
    /// values of the others. A newly opened cluster brings its parameter along.
    pub fn step(&mut self, env: &Env) -> Result<Env> {
        let mut env = env.clone();
        for cond in &self.conditionals {
            let c = cond.evaluate_rng(&env, self.opts.approximate_new_cluster, &mut self.rng)?;
            let v = c.sample(&mut self.rng)?;
            if c.opens_cluster(&v) {
                if let crate::inference::Conditional::Clustering { fresh: (name, p), .. } = &c {
                    env = env.fixvalue(name, p)?;
                }
            }
            debug!("{} := {}", cond.name, v);
            env = env.fixvalue(&cond.name, &v)?;
        }
        Ok(env)
    }

    /// `steps` sweeps starting from `init`; returns the state after each sweep.
    pub fn run(&mut self, init: Env, steps: usize) -> Result<Vec<Env>> {
        let span = span!(Level::INFO, "gibbs", steps);
        let _enter = span.enter();
        let mut out = Vec::with_capacity(steps);
        let mut env = init;
        for i in 0..steps {
            env = self.step(&env)?;
            info!("sweep {}: {}", i, env);
            out.push(env.clone());
        }
        Ok(out)
    }
}
