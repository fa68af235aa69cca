//! Variable assignments and substitution of hypothetical values into them.
use crate::data::errors::*;
use crate::data::name::{Index, PathRelation, VarName};
use crate::data::value::Value;
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Env(IndexMap<VarName, Value>);

impl Env {
    pub fn new() -> Self {
        Default::default()
    }
    pub fn insert(&mut self, name: VarName, v: Value) -> Option<Value> {
        self.0.insert(name, v)
    }
    pub fn get(&self, name: &VarName) -> Option<&Value> {
        self.0.get(name)
    }
    pub fn contains(&self, name: &VarName) -> bool {
        self.0.contains_key(name)
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = (&VarName, &Value)> {
        self.0.iter()
    }
    pub fn names(&self) -> impl Iterator<Item = &VarName> {
        self.0.keys()
    }

    /// Resolve `name` by exact key, falling back to indexing into the first
    /// stored value whose name subsumes it.
    pub fn lookup(&self, name: &VarName) -> Result<Value> {
        if let Some(v) = self.0.get(name) {
            return Ok(v.clone());
        }
        for (key, v) in self.0.iter() {
            if let Some(rel) = key.relative_path(name) {
                return v.get_path(&rel);
            }
        }
        missing_variable(&name.to_string())
    }

    /// A copy of this environment in which `name` holds `v`. Every stored key
    /// overlapping `name` is brought in line with `v`; the name is inserted
    /// when nothing overlaps.
    pub fn fixvalue(&self, name: &VarName, v: &Value) -> Result<Env> {
        let mut out = self.clone();
        let mut touched = false;
        for (key, stored) in self.0.iter() {
            let updated = match name.relation(key) {
                PathRelation::Disjoint => continue,
                PathRelation::Equal => v.clone(),
                PathRelation::Contains => match name.relative_path(key) {
                    Some(rel) => v.get_path(&rel)?,
                    None => return generic(&format!("{} does not subsume {}", name, key)),
                },
                PathRelation::ContainedIn => match key.relative_path(name) {
                    Some(rel) => stored.set_path(&rel, v.clone())?,
                    None => return generic(&format!("{} does not subsume {}", key, name)),
                },
                PathRelation::Overlapping => copy_overlap(key, stored, name, v)?,
            };
            out.0.insert(key.clone(), updated);
            touched = true;
        }
        if !touched {
            out.0.insert(name.clone(), v.clone());
        }
        Ok(out)
    }

    pub fn fixvalues<'a>(&self, assignments: impl IntoIterator<Item = (&'a VarName, &'a Value)>) -> Result<Env> {
        let mut out = self.clone();
        for (name, v) in assignments {
            out = out.fixvalue(name, v)?;
        }
        Ok(out)
    }
}

/// Two names sharing a concrete prefix whose final spans intersect: copy the
/// shared positions of `v` into the stored value.
fn copy_overlap(key: &VarName, stored: &Value, name: &VarName, v: &Value) -> Result<Value> {
    let unsupported = || {
        generic(&format!(
            "cannot reconcile partially overlapping names {} and {}",
            key, name
        ))
    };
    let ((kparent, klast), (nparent, nlast)) = match (key.split_last(), name.split_last()) {
        (Some(k), Some(n)) => (k, n),
        _ => return unsupported(),
    };
    if kparent != nparent || kparent.path().iter().any(|ix| !matches!(ix, Index::At(_))) {
        return unsupported();
    }
    let ((klo, khi), (nlo, nhi)) = match (klast, nlast) {
        (Index::Span(a, b), Index::Span(c, d)) => ((a, b), (c, d)),
        _ => return unsupported(),
    };
    let mut out = stored.clone();
    for p in klo.max(nlo)..khi.min(nhi) {
        let x = v.get_path(&[Index::At(p - nlo)])?;
        out = out.set_path(&[Index::At(p - klo)], x)?;
    }
    Ok(out)
}

impl fmt::Display for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.0.iter().map(|(k, v)| format!("{} => {}", k, v)).join(", ")
        )
    }
}

impl FromIterator<(VarName, Value)> for Env {
    fn from_iter<T: IntoIterator<Item = (VarName, Value)>>(iter: T) -> Self {
        Env(iter.into_iter().collect())
    }
}
