use crate::data::dists::Dist;
use crate::data::errors::*;
use crate::data::name::Index;
use crate::data::ops::Function;
use itertools::Itertools;
use std::fmt;

/// Runtime values flowing through traces, graphs and environments. Values are
/// never mutated in place: every update produces a new value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Array(Vec<Value>),
    Dist(Dist),
    Func(Function),
}

impl Value {
    pub fn floats(fs: &[f64]) -> Value {
        Value::Array(fs.iter().cloned().map(Value::Float).collect())
    }
    pub fn ints(is: &[i64]) -> Value {
        Value::Array(is.iter().cloned().map(Value::Int).collect())
    }

    pub fn as_float(&self) -> Result<f64> {
        match self {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            v => type_error(&format!("expected a number, got {}", v)),
        }
    }
    pub fn as_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(*b as i64),
            Value::Float(f) if f.fract() == 0.0 => Ok(*f as i64),
            v => type_error(&format!("expected an integer, got {}", v)),
        }
    }
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            v => type_error(&format!("expected a boolean, got {}", v)),
        }
    }
    pub fn as_index(&self) -> Result<usize> {
        let i = self.as_int()?;
        usize::try_from(i).or_else(|_| type_error(&format!("negative index {}", i)))
    }
    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(vs) => Ok(vs),
            v => type_error(&format!("expected an array, got {}", v)),
        }
    }
    pub fn as_floats(&self) -> Result<Vec<f64>> {
        self.as_array()?.iter().map(Value::as_float).collect()
    }
    pub fn as_dist(&self) -> Result<&Dist> {
        match self {
            Value::Dist(d) => Ok(d),
            v => type_error(&format!("expected a distribution, got {}", v)),
        }
    }
    pub fn as_func(&self) -> Result<&Function> {
        match self {
            Value::Func(f) => Ok(f),
            v => type_error(&format!("expected a function, got {}", v)),
        }
    }

    /// Select a sub-value by applying each indexing step in turn.
    pub fn get_path(&self, path: &[Index]) -> Result<Value> {
        let mut cur = self.clone();
        for ix in path {
            cur = match ix {
                Index::All => {
                    cur.as_array()?;
                    cur
                }
                Index::At(i) => match cur.as_array()?.get(*i) {
                    Some(v) => v.clone(),
                    None => return type_error(&format!("index {} out of bounds in {}", i, cur)),
                },
                Index::Span(lo, hi) => match cur.as_array()?.get(*lo..*hi) {
                    Some(vs) => Value::Array(vs.to_vec()),
                    None => {
                        return type_error(&format!("span {}:{} out of bounds in {}", lo, hi, cur))
                    }
                },
            };
        }
        Ok(cur)
    }

    /// Copy of `self` with the sub-value at `path` replaced by `v`. Setting the
    /// position one past the end of an array appends.
    pub fn set_path(&self, path: &[Index], v: Value) -> Result<Value> {
        let (ix, rest) = match path.split_first() {
            None => return Ok(v),
            Some(split) => split,
        };
        let mut vs = self.as_array()?.to_vec();
        match ix {
            Index::At(i) if *i < vs.len() => {
                vs[*i] = vs[*i].set_path(rest, v)?;
            }
            Index::At(i) if *i == vs.len() && rest.is_empty() => vs.push(v),
            Index::Span(lo, hi) if rest.is_empty() && *hi <= vs.len() => {
                let replacement = v.as_array()?;
                if replacement.len() != hi - lo {
                    return type_error(&format!(
                        "cannot assign {} values to span {}:{}",
                        replacement.len(),
                        lo,
                        hi
                    ));
                }
                vs.splice(*lo..*hi, replacement.iter().cloned());
            }
            Index::All if rest.is_empty() => {
                v.as_array()?;
                return Ok(v);
            }
            _ => {
                return type_error(&format!(
                    "cannot assign through [{}] in {}",
                    path.iter().join("]["),
                    self
                ))
            }
        }
        Ok(Value::Array(vs))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{:?}", x),
            Value::Array(vs) => write!(f, "[{}]", vs.iter().join(", ")),
            Value::Dist(d) => write!(f, "{}", d),
            Value::Func(fun) => write!(f, "{}", fun),
        }
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}
impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Int(x)
    }
}
impl From<usize> for Value {
    fn from(x: usize) -> Self {
        Value::Int(x as i64)
    }
}
impl From<bool> for Value {
    fn from(x: bool) -> Self {
        Value::Bool(x)
    }
}
impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self {
        Value::Array(xs)
    }
}
impl From<Dist> for Value {
    fn from(d: Dist) -> Self {
        Value::Dist(d)
    }
}
impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Func(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Index::*;

    #[test]
    fn test_paths() {
        let m = Value::Array(vec![Value::floats(&[1.0, 2.0]), Value::floats(&[3.0, 4.0])]);
        assert_eq!(m.get_path(&[At(1), At(0)]), Ok(Value::Float(3.0)));
        assert_eq!(m.get_path(&[Span(0, 1)]), Ok(Value::Array(vec![Value::floats(&[1.0, 2.0])])));
        assert!(m.get_path(&[At(2)]).is_err());

        let updated = m.set_path(&[At(0), At(1)], Value::Float(9.0)).unwrap();
        assert_eq!(updated.get_path(&[At(0), At(1)]), Ok(Value::Float(9.0)));
        // the original is untouched
        assert_eq!(m.get_path(&[At(0), At(1)]), Ok(Value::Float(2.0)));

        let xs = Value::ints(&[1, 2]);
        assert_eq!(xs.set_path(&[At(2)], Value::Int(3)), Ok(Value::ints(&[1, 2, 3])));
        assert!(xs.set_path(&[At(4)], Value::Int(3)).is_err());
        assert_eq!(
            xs.set_path(&[Span(0, 2)], Value::ints(&[7, 8])),
            Ok(Value::ints(&[7, 8]))
        );
    }

    #[test]
    fn test_coercions() {
        assert_eq!(Value::Bool(true).as_float(), Ok(1.0));
        assert_eq!(Value::Float(2.0).as_index(), Ok(2));
        assert!(Value::Int(-1).as_index().is_err());
        assert!(Value::Float(0.5).as_int().is_err());
    }
}
