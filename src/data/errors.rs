use std::fmt;

#[derive(Clone, Eq, Hash, PartialEq, Debug)]
pub enum GibbsError {
    /// the trace is not a single coherent program invocation
    StructuralTrace(String),
    /// a value was used before any recorded statement produced it
    MissingDependency(String),
    UnsupportedDistribution(String),
    UnsupportedComposition(String),
    MissingVariable(String),
    TypeError(String),
    DegenerateConditional(String),
    Generic(String),
}

impl GibbsError {
    /// structural errors are internal invariant violations, never user errors.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GibbsError::StructuralTrace(_) | GibbsError::MissingDependency(_)
        )
    }
}

impl fmt::Display for GibbsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use GibbsError::*;
        match self {
            StructuralTrace(s) => write!(f, "malformed trace: {}", s),
            MissingDependency(s) => write!(f, "no recorded origin for {}", s),
            UnsupportedDistribution(s) => write!(f, "cannot enumerate support: {}", s),
            UnsupportedComposition(s) => write!(f, "unsupported composition: {}", s),
            MissingVariable(s) => write!(f, "variable {} not found in environment", s),
            TypeError(s) => write!(f, "{}", s),
            DegenerateConditional(s) => write!(f, "degenerate conditional: {}", s),
            Generic(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for GibbsError {}

impl From<statrs::StatsError> for GibbsError {
    fn from(e: statrs::StatsError) -> Self {
        GibbsError::TypeError(format!("invalid distribution parameters: {e}"))
    }
}

pub type Result<T> = core::result::Result<T, GibbsError>;

pub fn structural<T>(s: &str) -> Result<T> {
    Err(GibbsError::StructuralTrace(s.to_string()))
}
pub fn missing_dependency<T>(s: &str) -> Result<T> {
    Err(GibbsError::MissingDependency(s.to_string()))
}
pub fn unsupported_distribution<T>(s: &str) -> Result<T> {
    Err(GibbsError::UnsupportedDistribution(s.to_string()))
}
pub fn unsupported_composition<T>(s: &str) -> Result<T> {
    Err(GibbsError::UnsupportedComposition(s.to_string()))
}
pub fn missing_variable<T>(s: &str) -> Result<T> {
    Err(GibbsError::MissingVariable(s.to_string()))
}
pub fn type_error<T>(s: &str) -> Result<T> {
    Err(GibbsError::TypeError(s.to_string()))
}
pub fn degenerate<T>(s: &str) -> Result<T> {
    Err(GibbsError::DegenerateConditional(s.to_string()))
}
pub fn generic<T>(s: &str) -> Result<T> {
    Err(GibbsError::Generic(s.to_string()))
}
