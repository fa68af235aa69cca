pub mod conditionals;
pub mod cont;
pub mod continuations;

pub use crate::compile::conditionals::*;
pub use crate::compile::cont::*;
pub use crate::compile::continuations::*;
