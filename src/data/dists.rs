//! Distribution values: densities via `statrs`, discrete support enumeration
//! and sampling.
use crate::data::errors::*;
use crate::data::value::Value;
use itertools::Itertools;
use nalgebra::DVector;
use rand::distributions::Distribution;
use rand::Rng;
use statrs::distribution::{Continuous, Discrete};
use std::fmt;

#[derive(Clone, Debug, PartialEq)]
pub enum Dist {
    /// support `{false, true}`
    Bernoulli(f64),
    /// trials, success probability
    Binomial(u64, f64),
    /// support `0..k`
    Categorical(Vec<f64>),
    /// inclusive bounds
    DiscreteUniform(i64, i64),
    Poisson(f64),
    /// mean, standard deviation
    Normal(f64, f64),
    /// shape, scale
    Gamma(f64, f64),
    Beta(f64, f64),
    Dirichlet(Vec<f64>),
    /// Chinese restaurant process over cluster labels. Labels `0..counts.len()`
    /// are existing clusters and `counts.len()` opens a new one.
    Crp { alpha: f64, counts: Vec<u64> },
    /// independent components, one per array position
    Product(Vec<Dist>),
}

const NEG_INF: f64 = f64::NEG_INFINITY;

impl Dist {
    pub fn name(&self) -> &'static str {
        use Dist::*;
        match self {
            Bernoulli(_) => "Bernoulli",
            Binomial(_, _) => "Binomial",
            Categorical(_) => "Categorical",
            DiscreteUniform(_, _) => "DiscreteUniform",
            Poisson(_) => "Poisson",
            Normal(_, _) => "Normal",
            Gamma(_, _) => "Gamma",
            Beta(_, _) => "Beta",
            Dirichlet(_) => "Dirichlet",
            Crp { .. } => "CRP",
            Product(_) => "product",
        }
    }

    /// Check parameters eagerly so that construction, not evaluation, fails.
    pub fn validate(&self) -> Result<()> {
        use Dist::*;
        match self {
            Bernoulli(p) => {
                statrs::distribution::Bernoulli::new(*p)?;
            }
            Binomial(n, p) => {
                statrs::distribution::Binomial::new(*p, *n)?;
            }
            Categorical(ps) => {
                statrs::distribution::Categorical::new(ps)?;
            }
            DiscreteUniform(a, b) => {
                statrs::distribution::DiscreteUniform::new(*a, *b)?;
            }
            Poisson(l) => {
                statrs::distribution::Poisson::new(*l)?;
            }
            Normal(m, s) => {
                statrs::distribution::Normal::new(*m, *s)?;
            }
            Gamma(shape, scale) => {
                statrs::distribution::Gamma::new(*shape, 1.0 / scale)?;
            }
            Beta(a, b) => {
                statrs::distribution::Beta::new(*a, *b)?;
            }
            Dirichlet(alpha) => {
                statrs::distribution::Dirichlet::new(alpha.clone())?;
            }
            Crp { alpha, .. } => {
                if !(alpha.is_finite() && *alpha > 0.0) {
                    return type_error(&format!("CRP concentration must be positive, got {}", alpha));
                }
            }
            Product(ds) => {
                for d in ds {
                    d.validate()?;
                }
            }
        }
        Ok(())
    }

    /// Enumerate the support of a finite discrete distribution.
    pub fn support(&self) -> Result<Vec<Value>> {
        use Dist::*;
        match self {
            Bernoulli(_) => Ok(vec![Value::Bool(false), Value::Bool(true)]),
            Binomial(n, _) => Ok((0..=*n as i64).map(Value::Int).collect()),
            Categorical(ps) => Ok((0..ps.len() as i64).map(Value::Int).collect()),
            DiscreteUniform(a, b) => Ok((*a..=*b).map(Value::Int).collect()),
            Poisson(_) => unsupported_distribution("Poisson has unbounded support"),
            Normal(_, _) | Gamma(_, _) | Beta(_, _) | Dirichlet(_) => {
                unsupported_distribution(&format!("{} is continuous", self))
            }
            Crp { .. } => unsupported_distribution("CRP support is unbounded"),
            Product(_) => unsupported_distribution("product supports are enumerated per component"),
        }
    }

    pub fn is_crp(&self) -> bool {
        matches!(self, Dist::Crp { .. })
    }

    /// Log density (or log mass) of `v`. Values outside the support score `-inf`,
    /// ill-typed values are an error.
    pub fn logpdf(&self, v: &Value) -> Result<f64> {
        use Dist::*;
        let lp = match self {
            Bernoulli(p) => {
                let d = statrs::distribution::Bernoulli::new(*p)?;
                Discrete::ln_pmf(&d, v.as_bool()? as u64)
            }
            Binomial(n, p) => {
                let d = statrs::distribution::Binomial::new(*p, *n)?;
                match u64::try_from(v.as_int()?) {
                    Ok(k) if k <= *n => Discrete::ln_pmf(&d, k),
                    _ => NEG_INF,
                }
            }
            Categorical(ps) => {
                let d = statrs::distribution::Categorical::new(ps)?;
                match u64::try_from(v.as_int()?) {
                    Ok(k) if (k as usize) < ps.len() => Discrete::ln_pmf(&d, k),
                    _ => NEG_INF,
                }
            }
            DiscreteUniform(a, b) => {
                let d = statrs::distribution::DiscreteUniform::new(*a, *b)?;
                Discrete::ln_pmf(&d, v.as_int()?)
            }
            Poisson(l) => {
                let d = statrs::distribution::Poisson::new(*l)?;
                match u64::try_from(v.as_int()?) {
                    Ok(k) => Discrete::ln_pmf(&d, k),
                    Err(_) => NEG_INF,
                }
            }
            Normal(m, s) => {
                let d = statrs::distribution::Normal::new(*m, *s)?;
                Continuous::ln_pdf(&d, v.as_float()?)
            }
            Gamma(shape, scale) => {
                let d = statrs::distribution::Gamma::new(*shape, 1.0 / scale)?;
                let x = v.as_float()?;
                if x <= 0.0 {
                    NEG_INF
                } else {
                    Continuous::ln_pdf(&d, x)
                }
            }
            Beta(a, b) => {
                let d = statrs::distribution::Beta::new(*a, *b)?;
                let x = v.as_float()?;
                if !(0.0..=1.0).contains(&x) {
                    NEG_INF
                } else {
                    Continuous::ln_pdf(&d, x)
                }
            }
            Dirichlet(alpha) => {
                let d = statrs::distribution::Dirichlet::new(alpha.clone())?;
                let xs = v.as_floats()?;
                // statrs panics off the simplex
                let on_simplex = xs.len() == alpha.len()
                    && xs.iter().all(|x| *x > 0.0 && *x < 1.0)
                    && (xs.iter().sum::<f64>() - 1.0).abs() < 1e-4;
                if !on_simplex {
                    NEG_INF
                } else {
                    Continuous::ln_pdf(&d, &DVector::from_vec(xs))
                }
            }
            Crp { alpha, counts } => {
                let k = v.as_index()?;
                let total = counts.iter().sum::<u64>() as f64 + alpha;
                match counts.get(k) {
                    Some(c) if *c > 0 => (*c as f64 / total).ln(),
                    Some(_) => NEG_INF,
                    None if k == counts.len() => (alpha / total).ln(),
                    None => NEG_INF,
                }
            }
            Product(ds) => {
                let vs = v.as_array()?;
                if vs.len() != ds.len() {
                    return type_error(&format!(
                        "{} components cannot score an array of length {}",
                        ds.len(),
                        vs.len()
                    ));
                }
                let mut lp = 0.0;
                for (d, v) in ds.iter().zip(vs) {
                    lp += d.logpdf(v)?;
                }
                lp
            }
        };
        Ok(lp)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Value> {
        use Dist::*;
        let v = match self {
            Bernoulli(p) => {
                let d = statrs::distribution::Bernoulli::new(*p)?;
                Value::Bool(d.sample(rng) > 0.5)
            }
            Binomial(n, p) => {
                let d = statrs::distribution::Binomial::new(*p, *n)?;
                Value::Int(d.sample(rng) as i64)
            }
            Categorical(ps) => {
                let d = statrs::distribution::Categorical::new(ps)?;
                Value::Int(d.sample(rng) as i64)
            }
            DiscreteUniform(a, b) => {
                let d = statrs::distribution::DiscreteUniform::new(*a, *b)?;
                Value::Int(d.sample(rng) as i64)
            }
            Poisson(l) => {
                let d = statrs::distribution::Poisson::new(*l)?;
                Value::Int(d.sample(rng) as i64)
            }
            Normal(m, s) => Value::Float(statrs::distribution::Normal::new(*m, *s)?.sample(rng)),
            Gamma(shape, scale) => {
                Value::Float(statrs::distribution::Gamma::new(*shape, 1.0 / scale)?.sample(rng))
            }
            Beta(a, b) => Value::Float(statrs::distribution::Beta::new(*a, *b)?.sample(rng)),
            Dirichlet(alpha) => {
                let d = statrs::distribution::Dirichlet::new(alpha.clone())?;
                let xs: DVector<f64> = d.sample(rng);
                Value::floats(xs.as_slice())
            }
            Crp { alpha, counts } => {
                let weights = counts.iter().map(|c| *c as f64).chain([*alpha]).collect_vec();
                let d = statrs::distribution::Categorical::new(&weights)?;
                Value::Int(d.sample(rng) as i64)
            }
            Product(ds) => Value::Array(ds.iter().map(|d| d.sample(rng)).collect::<Result<_>>()?),
        };
        Ok(v)
    }
}

impl fmt::Display for Dist {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Dist::*;
        let floats = |xs: &[f64]| xs.iter().map(|x| format!("{:?}", x)).join(", ");
        match self {
            Bernoulli(p) | Poisson(p) => write!(f, "{}({:?})", self.name(), p),
            Binomial(n, p) => write!(f, "Binomial({}, {:?})", n, p),
            Categorical(ps) | Dirichlet(ps) => write!(f, "{}([{}])", self.name(), floats(ps)),
            DiscreteUniform(a, b) => write!(f, "DiscreteUniform({}, {})", a, b),
            Normal(a, b) | Gamma(a, b) | Beta(a, b) => write!(f, "{}({:?}, {:?})", self.name(), a, b),
            Crp { alpha, counts } => write!(f, "CRP({:?}, [{}])", alpha, counts.iter().join(", ")),
            Product(ds) => write!(f, "product([{}])", ds.iter().join(", ")),
        }
    }
}
