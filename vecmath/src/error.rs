use thiserror::Error;

/// Errors returned by vector operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VecMathError {
    #[error("vecmath: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("vecmath: degenerate vector (zero norm)")]
    DegenerateVector,

    #[error("vecmath: empty input")]
    EmptyInput,
}
