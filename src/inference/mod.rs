pub mod discrete;
pub mod gibbs;
pub mod sampler;

pub use crate::inference::discrete::*;
pub use crate::inference::sampler::*;
