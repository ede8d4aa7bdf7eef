use thiserror::Error;

/// Errors raised by the numeric core (indicators, covariance, portfolio math).
///
/// Every variant is local to one computation over one symbol or one asset set;
/// callers in `analysis` catch them per symbol and keep going.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("insufficient data: need at least {required} observations, got {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    #[error("invalid period {0}")]
    InvalidPeriod(usize),

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

impl AnalyticsError {
    pub(crate) fn insufficient(required: usize, available: usize) -> Self {
        Self::InsufficientData { required, available }
    }

    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        Self::DegenerateInput(reason.into())
    }
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
