#![allow(dead_code)]
#![allow(clippy::type_complexity)]
#![allow(clippy::too_many_arguments)]
#![allow(mixed_script_confusables)]

// core types
pub mod data;
pub use data::*;

// traces and their slices
pub mod trace;
pub mod graph;

// interface
pub mod compile;

pub mod pipeline;
pub use pipeline::*;

pub mod inference;

// extras
pub mod models;
pub mod utils;

#[cfg(test)]
mod tests;

#[cfg(test)]
extern crate quickcheck;
#[cfg(test)]
#[macro_use(quickcheck)]
extern crate quickcheck_macros;
