//! Example models, written against the recorder.
use crate::args;
use crate::data::*;
use crate::trace::*;
use crate::vn;

/// `λ ~ Gamma(2, 1/3); m ~ Normal(0, sqrt(1/λ)); x ~ Normal(m, sqrt(1/λ))` with `x` observed.
pub fn chain(x: f64, seed: u64) -> Result<Trace> {
    Recorder::record("chain", vec![Value::Float(x)], seed, |r, data| {
        let dl = r.dist(DistKind::Gamma, args![2.0, 1.0 / 3.0])?;
        let l = r.assume(VarName::new("λ"), &dl)?;
        let inv = r.call(Op::Div, args![1.0, &l])?;
        let s = r.call(Op::Sqrt, args![&inv])?;
        let dm = r.dist(DistKind::Normal, args![0.0, &s])?;
        let m = r.assume(vn!(m), &dm)?;
        let dx = r.dist(DistKind::Normal, args![&m, &s])?;
        r.observe(vn!(x), &dx, data[0].value.clone())?;
        Ok(Arg::from(&m))
    })
}

fn coins(r: &mut Recorder, p: &Handle, flips: &[bool]) -> Result<()> {
    let d = r.dist(DistKind::Bernoulli, args![p])?;
    for (name, flip) in ["x", "y", "z"].iter().zip(flips) {
        r.observe(VarName::new(name), &d, Value::Bool(*flip))?;
    }
    Ok(())
}

/// `p ~ Beta(1, 1)` and three coin flips observed under `Bernoulli(p)`.
pub fn bernoulli_chain(flips: [bool; 3], seed: u64) -> Result<Trace> {
    Recorder::record("bernoulli_chain", vec![], seed, |r, _| {
        let dp = r.dist(DistKind::Beta, args![1.0, 1.0])?;
        let p = r.assume(vn!(p), &dp)?;
        coins(r, &p, &flips)?;
        Ok(Arg::from(&p))
    })
}

/// The coin model with a uniform prior on the grid `p ∈ {0.2, 0.4, 0.6, 0.8}`,
/// `p = (idx + 1) / 5`.
pub fn bernoulli_grid(flips: [bool; 3], seed: u64) -> Result<Trace> {
    Recorder::record("bernoulli_grid", vec![], seed, |r, _| {
        let di = r.dist(DistKind::Categorical, args![Value::floats(&[0.25; 4])])?;
        let idx = r.assume(vn!(idx), &di)?;
        let k = r.call(Op::Add, args![&idx, 1_i64])?;
        let p = r.call(Op::Div, args![&k, 5.0])?;
        coins(r, &p, &flips)?;
        Ok(Arg::from(&idx))
    })
}

/// Gaussian mixture with `k` unit-variance components. Means and assignments
/// are drawn whole: `mu ~ filldist(Normal(0, 3), k)`, `z ~ filldist(Categorical(w), n)`.
pub fn gmm(xs: &[f64], k: usize, seed: u64) -> Result<Trace> {
    let data = xs.iter().map(|x| Value::Float(*x)).collect();
    Recorder::record("gmm", data, seed, |r, data| {
        let w = Value::floats(&vec![1.0 / k as f64; k]);
        let dmu0 = r.dist(DistKind::Normal, args![0.0, 3.0])?;
        let dmu = r.dist(DistKind::Filldist, args![&dmu0, k])?;
        let mu = r.assume(vn!(mu), &dmu)?;
        let dz0 = r.dist(DistKind::Categorical, args![w])?;
        let dz = r.dist(DistKind::Filldist, args![&dz0, data.len()])?;
        let z = r.assume(vn!(z), &dz)?;
        for (i, x) in data.iter().enumerate() {
            let zi = r.call(Op::GetIndex, args![&z, i])?;
            let mui = r.call(Op::GetIndex, args![&mu, &zi])?;
            let dx = r.dist(DistKind::Normal, args![&mui, 1.0])?;
            r.observe(vn!(x[i]), &dx, x.value.clone())?;
        }
        Ok(Arg::from(&z))
    })
}

/// [`gmm`] with every mean and assignment drawn separately into preallocated
/// arrays.
pub fn gmm_loop(xs: &[f64], k: usize, seed: u64) -> Result<Trace> {
    let data = xs.iter().map(|x| Value::Float(*x)).collect();
    Recorder::record("gmm_loop", data, seed, |r, data| {
        let w = Value::floats(&vec![1.0 / k as f64; k]);
        let mut mu = r.call(Op::Fill, args![0.0, k])?;
        let dmu = r.dist(DistKind::Normal, args![0.0, 3.0])?;
        for j in 0..k {
            let muj = r.assume(vn!(mu[j]), &dmu)?;
            r.setindex(&mut mu, &muj, args![j])?;
        }
        let mut z = r.call(Op::Fill, args![0_i64, data.len()])?;
        let dz = r.dist(DistKind::Categorical, args![w])?;
        for i in 0..data.len() {
            let zi = r.assume(vn!(z[i]), &dz)?;
            r.setindex(&mut z, &zi, args![i])?;
        }
        for (i, x) in data.iter().enumerate() {
            let zi = r.call(Op::GetIndex, args![&z, i])?;
            let mui = r.call(Op::GetIndex, args![&mu, &zi])?;
            let dx = r.dist(DistKind::Normal, args![&mui, 1.0])?;
            r.observe(vn!(x[i]), &dx, x.value.clone())?;
        }
        Ok(Arg::from(&z))
    })
}

/// Infinite mixture: `z[i] ~ CRP(alpha, counts(z[1:i-1]))`, a new mean
/// `mu[K] ~ Normal(0, 3)` whenever a new cluster opens, `x[i] ~ Normal(mu[z[i]], 1)`.
pub fn imm(xs: &[f64], alpha: f64, seed: u64) -> Result<Trace> {
    let data = xs.iter().map(|x| Value::Float(*x)).collect();
    Recorder::record("imm", data, seed, |r, data| {
        let mut z = r.call(Op::Vector, vec![])?;
        let mut mu = r.call(Op::Vector, vec![])?;
        let dmu = r.dist(DistKind::Normal, args![0.0, 3.0])?;
        for (i, x) in data.iter().enumerate() {
            let counts = r.call(Op::Counts, args![&z])?;
            let dz = r.dist(DistKind::Crp, args![alpha, &counts])?;
            let zi = r.assume(vn!(z[i]), &dz)?;
            let k = zi.value.as_index()?;
            if k == mu.value.as_array()?.len() {
                let muk = r.assume(vn!(mu[k]), &dmu)?;
                r.setindex(&mut mu, &muk, args![k])?;
            }
            r.setindex(&mut z, &zi, args![i])?;
            let mui = r.call(Op::GetIndex, args![&mu, &zi])?;
            let dx = r.dist(DistKind::Normal, args![&mui, 1.0])?;
            r.observe(vn!(x[i]), &dx, x.value.clone())?;
        }
        Ok(Arg::from(&z))
    })
}
