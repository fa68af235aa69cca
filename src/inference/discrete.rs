//! Normalized discrete distributions built from unnormalized log scores.
use crate::data::*;
use crate::utils::render::renderfloats;
use itertools::Itertools;
use rand::distributions::Distribution;
use rand::Rng;
use std::fmt;

pub fn log_sum_exp(xs: &[f64]) -> f64 {
    let max = xs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    max + xs.iter().map(|x| (x - max).exp()).sum::<f64>().ln()
}

/// Normalizes in log space. Fails when no score is finite or any score is
/// `+inf` or NaN.
pub fn softmax(scores: &[f64]) -> Result<Vec<f64>> {
    if let Some(bad) = scores.iter().find(|s| s.is_nan() || **s == f64::INFINITY) {
        return degenerate(&format!("score {} in {}", bad, renderfloats(scores, false)));
    }
    let z = log_sum_exp(scores);
    if z == f64::NEG_INFINITY {
        return degenerate(&format!(
            "every candidate has zero probability: {}",
            renderfloats(scores, false)
        ));
    }
    Ok(scores.iter().map(|s| (s - z).exp()).collect())
}

#[derive(Clone, Debug, PartialEq)]
pub struct Discrete {
    pub support: Vec<Value>,
    pub probs: Vec<f64>,
}

impl Discrete {
    pub fn from_scores(support: Vec<Value>, scores: &[f64]) -> Result<Discrete> {
        if support.len() != scores.len() {
            return generic(&format!(
                "{} scores for a support of size {}",
                scores.len(),
                support.len()
            ));
        }
        Ok(Discrete {
            support,
            probs: softmax(scores)?,
        })
    }

    pub fn prob(&self, v: &Value) -> f64 {
        self.support
            .iter()
            .position(|s| s == v)
            .map_or(0.0, |i| self.probs[i])
    }

    pub fn mode(&self) -> Option<&Value> {
        self.probs
            .iter()
            .position_max_by(|a, b| a.total_cmp(b))
            .map(|i| &self.support[i])
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        let d = statrs::distribution::Categorical::new(&self.probs)?;
        let i = d.sample(rng) as usize;
        match self.support.get(i) {
            Some(v) => Ok(v.clone()),
            None => generic(&format!("sampled index {} outside the support", i)),
        }
    }
}

impl fmt::Display for Discrete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.support
                .iter()
                .zip(&self.probs)
                .map(|(v, p)| format!("{}: {:.4}", v, p))
                .join(", ")
        )
    }
}

/// The result of evaluating a Gibbs conditional.
#[derive(Clone, Debug, PartialEq)]
pub enum Conditional {
    Discrete(Discrete),
    /// independent per-element conditionals of an array-valued variable
    Product(Vec<Discrete>),
    /// cluster assignment; the last support point opens a new cluster whose
    /// parameter is `fresh`
    Clustering {
        dist: Discrete,
        fresh: (VarName, Value),
    },
}

impl Conditional {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        match self {
            Conditional::Discrete(d) | Conditional::Clustering { dist: d, .. } => d.sample(rng),
            Conditional::Product(ds) => Ok(Value::Array(
                ds.iter().map(|d| d.sample(rng)).collect::<Result<_>>()?,
            )),
        }
    }

    /// Whether `v` is the new-cluster outcome of a clustering conditional.
    pub fn opens_cluster(&self, v: &Value) -> bool {
        match self {
            Conditional::Clustering { dist, .. } => dist.support.last() == Some(v),
            _ => false,
        }
    }

    pub fn components(&self) -> Vec<&Discrete> {
        match self {
            Conditional::Discrete(d) | Conditional::Clustering { dist: d, .. } => vec![d],
            Conditional::Product(ds) => ds.iter().collect(),
        }
    }
}

impl fmt::Display for Conditional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conditional::Discrete(d) => write!(f, "{}", d),
            Conditional::Product(ds) => write!(f, "[{}]", ds.iter().join(", ")),
            Conditional::Clustering { dist, fresh } => {
                write!(f, "{} with {} = {}", dist, fresh.0, fresh.1)
            }
        }
    }
}
