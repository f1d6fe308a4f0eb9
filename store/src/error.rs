use thiserror::Error;

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("store: degenerate embedding")]
    DegenerateVector,

    #[error("store: invalid record: {0}")]
    InvalidRecord(String),

    #[error("store: corrupt: {0}")]
    Corrupt(String),

    #[error("store: identity {0} not found")]
    NotFound(u64),

    #[error("store: full (capacity {capacity})")]
    Full { capacity: usize },

    #[error("store: storage error: {0}")]
    Storage(String),
}
