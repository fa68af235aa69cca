pub mod dists;
pub mod env;
pub mod errors;
pub mod name;
pub mod ops;
pub mod value;
pub use crate::data::dists::*;
pub use crate::data::env::*;
pub use crate::data::errors::*;
pub use crate::data::name::*;
pub use crate::data::ops::*;
pub use crate::data::value::*;

// aliases
pub use rustc_hash::{FxHashMap, FxHashSet};
pub type HashMap<K, V> = FxHashMap<K, V>;
pub type HashSet<V> = FxHashSet<V>;
