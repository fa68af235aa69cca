//! Evaluation of Gibbs conditionals by support enumeration.
use crate::compile::*;
use crate::data::*;
use crate::inference::discrete::*;
use crate::pipeline::Options;
use crate::utils::render::renderfloats;
use itertools::Itertools;
use rand::Rng;
use tracing::{debug, span, trace, Level};

/// `log p_own(ω) + Σ log p_blanket(θ[name := ω])`, skipping the blanket when
/// the own term already rules `ω` out.
fn score<'a>(
    env: &Env,
    name: &VarName,
    candidate: &Value,
    own: impl FnOnce(&Env) -> Result<f64>,
    blanket: impl IntoIterator<Item = &'a LogLikelihood>,
) -> Result<f64> {
    let hypothesis = env.fixvalue(name, candidate)?;
    let mut total = own(&hypothesis)?;
    if total == f64::NEG_INFINITY {
        return Ok(total);
    }
    for ll in blanket {
        total += ll.eval(&hypothesis)?;
    }
    trace!("score({} = {}) = {}", name, candidate, total);
    Ok(total)
}

impl GibbsConditional {
    pub fn evaluate(&self, env: &Env) -> Result<Conditional> {
        self.evaluate_with(env, &Options::default())
    }

    pub fn evaluate_with(&self, env: &Env, opts: &Options) -> Result<Conditional> {
        self.evaluate_rng(env, opts.approximate_new_cluster, &mut opts.rng())
    }

    pub fn evaluate_rng<R: Rng + ?Sized>(
        &self,
        env: &Env,
        approximate_new_cluster: bool,
        rng: &mut R,
    ) -> Result<Conditional> {
        let span = span!(Level::DEBUG, "evaluate", target = %self.name);
        let _enter = span.enter();
        let c = match self.own.distribution(env)? {
            Dist::Crp { counts, .. } => {
                if !approximate_new_cluster {
                    return unsupported_distribution(&format!(
                        "{} follows a clustering process; enable the new-cluster approximation",
                        self.name
                    ));
                }
                self.clustering(env, counts.len(), rng)?
            }
            Dist::Product(ds) => self.product(env, &ds)?,
            d => {
                let support = d.support()?;
                let scores = support
                    .iter()
                    .map(|v| {
                        score(
                            env,
                            &self.name,
                            v,
                            |e| self.own.eval(e),
                            self.blanket.iter().map(|(_, ll)| ll),
                        )
                    })
                    .collect::<Result<Vec<_>>>()?;
                debug!("scores {}", renderfloats(&scores, false));
                Conditional::Discrete(Discrete::from_scores(support, &scores)?)
            }
        };
        debug!("{} | rest ~ {}", self.name, c);
        Ok(c)
    }

    /// One conditional per component `name[i]`, each scored against the
    /// blanket entries depending on that component.
    fn product(&self, env: &Env, ds: &[Dist]) -> Result<Conditional> {
        let parents = self
            .blanket
            .iter()
            .map(|(_, ll)| (ll, ll.parents()))
            .collect_vec();
        let components = ds
            .iter()
            .enumerate()
            .map(|(i, d)| {
                let name = self.name.at(i);
                let relevant = parents
                    .iter()
                    .filter(|(_, ps)| ps.iter().any(|p| p.relation(&name).overlaps()))
                    .map(|(ll, _)| *ll)
                    .collect_vec();
                let support = d.support()?;
                let scores = support
                    .iter()
                    .map(|v| score(env, &name, v, |_| d.logpdf(v), relevant.iter().copied()))
                    .collect::<Result<Vec<_>>>()?;
                Discrete::from_scores(support, &scores)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Conditional::Product(components))
    }

    /// Existing clusters `0..k` are scored as they are. The new cluster `k` is
    /// scored with a single draw from the base measure standing in for its
    /// parameter, a point approximation of the integral over it.
    fn clustering<R: Rng + ?Sized>(&self, env: &Env, k: usize, rng: &mut R) -> Result<Conditional> {
        let base = match &self.base {
            Some(b) => b,
            None => {
                return unsupported_composition(&format!(
                    "cannot identify the base measure of clustering variable {}",
                    self.name
                ))
            }
        };
        let fresh_name = base.family.at(k);
        let fresh = base.prior.distribution(env)?.sample(rng)?;
        debug!("new cluster {} with {} = {}", k, fresh_name, fresh);
        let extended = env.fixvalue(&fresh_name, &fresh)?;
        let blanket = || self.blanket.iter().map(|(_, ll)| ll);
        let support = (0..=k).map(Value::from).collect_vec();
        let scores = support
            .iter()
            .enumerate()
            .map(|(c, v)| {
                let env = if c == k { &extended } else { env };
                score(env, &self.name, v, |e| self.own.eval(e), blanket())
            })
            .collect::<Result<Vec<_>>>()?;
        debug!("scores {}", renderfloats(&scores, false));
        Ok(Conditional::Clustering {
            dist: Discrete::from_scores(support, &scores)?,
            fresh: (fresh_name, fresh),
        })
    }
}
