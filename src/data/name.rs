//! Structured variable names: a symbol followed by a path of indexing steps.
//!
//! `x` names a whole variable, `x[2]` one of its elements, `x[0:3]` a slice and
//! `x[:]` every element. Indices are zero-based and spans are half-open.
use crate::data::errors::*;
use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Index {
    At(usize),
    Span(usize, usize),
    All,
}

impl Index {
    pub fn subsumes(&self, other: &Index) -> bool {
        use Index::*;
        match (self, other) {
            (All, _) => true,
            (_, All) => false,
            (At(i), At(j)) => i == j,
            (At(_), Span(_, _)) => false,
            (Span(lo, hi), At(j)) => lo <= j && j < hi,
            (Span(a, b), Span(c, d)) => a <= c && d <= b,
        }
    }
    pub fn overlaps(&self, other: &Index) -> bool {
        use Index::*;
        match (self, other) {
            (All, _) | (_, All) => true,
            (At(i), At(j)) => i == j,
            (At(i), Span(lo, hi)) | (Span(lo, hi), At(i)) => lo <= i && i < hi,
            (Span(a, b), Span(c, d)) => a < d && c < b,
        }
    }
    /// The step taking the value selected by `self` to the value selected by
    /// `other`, where `self` subsumes `other`. `None` when no step is needed.
    fn step_to(&self, other: &Index) -> Option<Index> {
        use Index::*;
        match (self, other) {
            (All, o) => Some(o.clone()),
            (Span(lo, _), At(j)) => Some(At(j - lo)),
            (Span(lo, _), Span(c, d)) => Some(Span(c - lo, d - lo)),
            _ => None,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Index::At(i) => write!(f, "{}", i),
            Index::Span(lo, hi) => write!(f, "{}:{}", lo, hi),
            Index::All => write!(f, ":"),
        }
    }
}

impl FromStr for Index {
    type Err = GibbsError;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let num = |t: &str| {
            t.trim()
                .parse::<usize>()
                .map_err(|_| GibbsError::Generic(format!("bad index {:?}", s)))
        };
        if s == ":" {
            Ok(Index::All)
        } else if let Some((lo, hi)) = s.split_once(':') {
            Ok(Index::Span(num(lo)?, num(hi)?))
        } else {
            Ok(Index::At(num(s)?))
        }
    }
}

/// How two names relate to one another.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PathRelation {
    Equal,
    /// the left name strictly contains the right one
    Contains,
    /// the left name is strictly contained in the right one
    ContainedIn,
    /// the names share elements but neither contains the other
    Overlapping,
    Disjoint,
}

impl PathRelation {
    pub fn flip(self) -> Self {
        match self {
            PathRelation::Contains => PathRelation::ContainedIn,
            PathRelation::ContainedIn => PathRelation::Contains,
            r => r,
        }
    }
    pub fn overlaps(self) -> bool {
        self != PathRelation::Disjoint
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarName {
    sym: String,
    path: Vec<Index>,
}

impl VarName {
    pub fn new(sym: &str) -> Self {
        VarName {
            sym: sym.to_string(),
            path: vec![],
        }
    }
    pub fn with_path(sym: &str, path: Vec<Index>) -> Self {
        VarName {
            sym: sym.to_string(),
            path,
        }
    }
    pub fn sym(&self) -> &str {
        &self.sym
    }
    pub fn path(&self) -> &[Index] {
        &self.path
    }
    pub fn is_indexed(&self) -> bool {
        !self.path.is_empty()
    }
    pub fn index(&self, ix: Index) -> Self {
        let mut n = self.clone();
        n.path.push(ix);
        n
    }
    pub fn at(&self, i: usize) -> Self {
        self.index(Index::At(i))
    }
    pub fn span(&self, lo: usize, hi: usize) -> Self {
        self.index(Index::Span(lo, hi))
    }
    pub fn all(&self) -> Self {
        self.index(Index::All)
    }
    pub fn at_all(&self, ixs: &[usize]) -> Self {
        ixs.iter().fold(self.clone(), |n, i| n.at(*i))
    }
    /// strip the last indexing step, returning it alongside the enclosing name.
    pub fn split_last(&self) -> Option<(VarName, Index)> {
        let mut parent = self.clone();
        let last = parent.path.pop()?;
        Some((parent, last))
    }

    pub fn subsumes(&self, other: &VarName) -> bool {
        self.sym == other.sym
            && self.path.len() <= other.path.len()
            && self
                .path
                .iter()
                .zip(other.path.iter())
                .all(|(a, b)| a.subsumes(b))
    }

    pub fn relation(&self, other: &VarName) -> PathRelation {
        if self.sym != other.sym
            || self
                .path
                .iter()
                .zip(other.path.iter())
                .any(|(a, b)| !a.overlaps(b))
        {
            return PathRelation::Disjoint;
        }
        match (self.subsumes(other), other.subsumes(self)) {
            (true, true) => PathRelation::Equal,
            (true, false) => PathRelation::Contains,
            (false, true) => PathRelation::ContainedIn,
            (false, false) => PathRelation::Overlapping,
        }
    }

    /// Steps that select `other` out of the value stored under `self`.
    /// Only defined when `self` subsumes `other`.
    pub fn relative_path(&self, other: &VarName) -> Option<Vec<Index>> {
        if !self.subsumes(other) {
            return None;
        }
        let mut steps = self
            .path
            .iter()
            .zip(other.path.iter())
            .filter_map(|(a, b)| a.step_to(b))
            .collect_vec();
        steps.extend(other.path[self.path.len()..].iter().cloned());
        Some(steps)
    }
}

impl fmt::Display for VarName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sym)?;
        for ix in &self.path {
            write!(f, "[{}]", ix)?;
        }
        Ok(())
    }
}

impl FromStr for VarName {
    type Err = GibbsError;
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (sym, mut rest) = match s.find('[') {
            Some(i) => (&s[..i], &s[i..]),
            None => (s, ""),
        };
        if sym.is_empty() {
            return generic(&format!("variable name {:?} has no symbol", s));
        }
        let mut name = VarName::new(sym);
        while !rest.is_empty() {
            let close = match (rest.starts_with('['), rest.find(']')) {
                (true, Some(c)) => c,
                _ => return generic(&format!("unbalanced brackets in {:?}", s)),
            };
            for ix in rest[1..close].split(',') {
                name.path.push(ix.parse()?);
            }
            rest = &rest[close + 1..];
        }
        Ok(name)
    }
}

impl From<&str> for VarName {
    fn from(s: &str) -> Self {
        VarName::new(s)
    }
}

/// `vn!(x)`, `vn!(x[1])`, `vn!(z[n][0])`
#[macro_export]
macro_rules! vn {
    ($sym:ident $([$i:expr])*) => {
        $crate::data::name::VarName::new(stringify!($sym))$(.at($i))*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use Index::*;

    #[test]
    fn test_subsumption() {
        let x = VarName::new("x");
        assert!(x.subsumes(&x));
        assert!(x.subsumes(&x.at(1)));
        assert!(x.at(1).subsumes(&x.at(1)));
        assert!(!x.at(1).subsumes(&x.at(2)));
        assert!(!x.at(1).subsumes(&x));
        assert!(!x.subsumes(&VarName::new("y").at(1)));
        assert!(x.all().subsumes(&x.at(7)));
        assert!(x.span(0, 3).subsumes(&x.at(2)));
        assert!(!x.span(0, 3).subsumes(&x.at(3)));
        assert!(x.at(1).subsumes(&x.at(1).at(0)));
    }

    #[test]
    fn test_relation() {
        let x = VarName::new("x");
        assert_eq!(x.relation(&x), PathRelation::Equal);
        assert_eq!(x.relation(&x.at(0)), PathRelation::Contains);
        assert_eq!(x.at(0).relation(&x), PathRelation::ContainedIn);
        assert_eq!(x.at(0).relation(&x.at(1)), PathRelation::Disjoint);
        assert_eq!(
            x.span(0, 3).relation(&x.span(2, 5)),
            PathRelation::Overlapping
        );
        assert_eq!(x.relation(&VarName::new("xs")), PathRelation::Disjoint);
    }

    #[test]
    fn test_relative_path() {
        let x = VarName::new("x");
        assert_eq!(x.relative_path(&x.at(2).at(1)), Some(vec![At(2), At(1)]));
        assert_eq!(x.at(2).relative_path(&x.at(2).at(1)), Some(vec![At(1)]));
        assert_eq!(x.span(2, 6).relative_path(&x.at(3)), Some(vec![At(1)]));
        assert_eq!(x.all().relative_path(&x.at(3)), Some(vec![At(3)]));
        assert_eq!(x.at(2).relative_path(&x.at(3)), None);
    }

    #[test]
    fn test_parse_and_display() {
        let n: VarName = "z[3][0:2]".parse().unwrap();
        assert_eq!(n, VarName::new("z").at(3).span(0, 2));
        assert_eq!(n.to_string(), "z[3][0:2]");
        let m: VarName = "w[1, :]".parse().unwrap();
        assert_eq!(m, VarName::new("w").at(1).all());
        assert!("[1]".parse::<VarName>().is_err());
        assert!("x[1".parse::<VarName>().is_err());
        assert_eq!(crate::vn!(x[1][2]), VarName::new("x").at(1).at(2));
    }

    impl Arbitrary for Index {
        fn arbitrary(g: &mut Gen) -> Self {
            let lo = *g.choose(&[0_usize, 1, 2, 3]).unwrap();
            match g.choose(&[0, 0, 1, 2]) {
                Some(0) => At(lo),
                Some(1) => Span(lo, lo + *g.choose(&[1_usize, 2, 3]).unwrap()),
                _ => All,
            }
        }
    }
    impl Arbitrary for VarName {
        fn arbitrary(g: &mut Gen) -> Self {
            let sym = *g.choose(&["x", "y"]).unwrap();
            let depth = *g.choose(&[0_usize, 1, 1, 2]).unwrap();
            VarName::with_path(sym, (0..depth).map(|_| Index::arbitrary(g)).collect())
        }
    }

    #[quickcheck]
    fn prop_relation_is_consistent(a: VarName, b: VarName) -> bool {
        let r = a.relation(&b);
        r.flip() == b.relation(&a)
            && (a.subsumes(&b) == matches!(r, PathRelation::Equal | PathRelation::Contains))
    }

    #[quickcheck]
    fn prop_subsumption_is_reflexive(a: VarName) -> bool {
        a.subsumes(&a) && a.relation(&a) == PathRelation::Equal
    }
}
