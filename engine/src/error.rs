use thiserror::Error;

use faceid_store::StoreError;
use faceid_vecmath::VecMathError;

/// Errors returned by recognition and enrollment.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FaceError {
    #[error("faceid: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("faceid: degenerate embedding")]
    DegenerateVector,

    #[error("faceid: empty input")]
    EmptyInput,

    #[error("faceid: store corrupt: {0}")]
    StoreCorrupt(String),

    #[error("faceid: invalid name {0:?}")]
    InvalidName(String),

    #[error("faceid: invalid record: {0}")]
    InvalidRecord(String),

    #[error(
        "faceid: insufficient valid samples: need {required}, got {valid} ({dropped} dropped)"
    )]
    InsufficientValidSamples {
        required: usize,
        valid: usize,
        dropped: usize,
    },

    #[error("faceid: identity {0} not found")]
    NotFound(u64),

    #[error("faceid: external collaborator failure: {0}")]
    External(String),

    #[error("faceid: no face detected")]
    NoFaceDetected,

    #[error("faceid: face {width}x{height} below minimum size {min}px")]
    FaceTooSmall { width: u32, height: u32, min: u32 },

    #[error("faceid: invalid image: {0}")]
    InvalidImage(String),

    #[error("faceid: store full (capacity {capacity})")]
    StoreFull { capacity: usize },

    #[error("faceid: storage error: {0}")]
    Storage(String),

    #[error("faceid: invalid config: {0}")]
    Config(String),
}

impl From<VecMathError> for FaceError {
    fn from(e: VecMathError) -> Self {
        match e {
            VecMathError::DimensionMismatch { expected, got } => {
                FaceError::DimensionMismatch { expected, got }
            }
            VecMathError::DegenerateVector => FaceError::DegenerateVector,
            VecMathError::EmptyInput => FaceError::EmptyInput,
        }
    }
}

impl From<StoreError> for FaceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DimensionMismatch { expected, got } => {
                FaceError::DimensionMismatch { expected, got }
            }
            StoreError::DegenerateVector => FaceError::DegenerateVector,
            StoreError::InvalidRecord(msg) => FaceError::InvalidRecord(msg),
            StoreError::Corrupt(msg) => FaceError::StoreCorrupt(msg),
            StoreError::NotFound(id) => FaceError::NotFound(id),
            StoreError::Full { capacity } => FaceError::StoreFull { capacity },
            StoreError::Storage(msg) => FaceError::Storage(msg),
        }
    }
}
