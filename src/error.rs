//! Error taxonomy for merge and estimation operations.
//!
//! Three failure classes cover the whole crate:
//!
//! - [`MergeError::InvalidArgument`]: a parameter is outside its documented
//!   domain (confidence level, background counts, force flags, band names).
//! - [`MergeError::Consistency`]: the row selection does not belong to the
//!   table it was applied to.
//! - [`MergeError::Numerical`]: the interval root-finder failed to converge.
//!   This is a bug-level failure; results are never silently approximated.
//!
//! Every message carries enough context (parameter name and value, offending
//! index, band) to be diagnosable without re-running with instrumentation.
//! There is no retry logic anywhere: the computation is deterministic, so a
//! retry cannot change the outcome.

/// Result type for merge and estimation operations.
pub type MergeResult<T> = Result<T, MergeError>;

/// Error type for merge and estimation operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MergeError {
    /// A parameter is outside its documented domain.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A row selection refers to rows the table does not have.
    #[error("inconsistent selection: {0}")]
    Consistency(String),

    /// A numerical routine failed to converge within tolerance.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl MergeError {
    /// Build an `InvalidArgument` error from a displayable message.
    pub fn invalid(msg: impl Into<String>) -> Self {
        MergeError::InvalidArgument(msg.into())
    }

    /// Build a `Consistency` error from a displayable message.
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        MergeError::Consistency(msg.into())
    }

    /// Build a `Numerical` error from a displayable message.
    pub fn numerical(msg: impl Into<String>) -> Self {
        MergeError::Numerical(msg.into())
    }
}
