//! Face recognition and enrollment over an [`EmbeddingStore`].
//!
//! # Pipeline
//!
//! ```text
//! image -> Preprocessor -> Detector -> crop -> Embedder -> embedding
//!                                                   |
//!                        MatchEngine::find  <-------+-------> RegistrationPipeline::register
//!                             (recognize)                          (enroll)
//! ```
//!
//! Detection, embedding and enhancement models are external; plug them in
//! through [`Detector`], [`Embedder`] and [`Enhancer`]. Everything else here
//! is deterministic, synchronous computation over store snapshots.
//!
//! # Matching
//!
//! [`MatchEngine`] does a linear scan and keeps the best-scoring record,
//! breaking ties toward the earliest enrolled id. One [`Metric`] is used per
//! engine; cosine similarity is the default.
//!
//! [`EmbeddingStore`]: faceid_store::EmbeddingStore

mod config;
mod error;
mod external;
mod image;
mod matcher;
mod preprocess;
mod register;
mod service;

pub use config::EngineConfig;
pub use error::FaceError;
pub use external::{Detector, Embedder, Enhancer};
pub use image::{BoundingBox, Image};
pub use matcher::{MatchEngine, MatchResult, Metric, UNKNOWN_LABEL};
pub use preprocess::Preprocessor;
pub use register::{Candidate, Enrollment, RegistrationPipeline};
pub use service::{FaceMatch, FaceService, IdentitySummary};

pub use faceid_store::{EmbeddingStore, IdentityRecord, Snapshot, StoreOptions};
